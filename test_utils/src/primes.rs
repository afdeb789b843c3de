//! Pre-generated 1024 bit safe primes. Generating safe primes of this size takes minutes, so
//! tests build credential definitions from these instead.

use num::BigUint;

const P_1: [&str; 4] = [
    "124947216916463066318649585509871725940234654845229466234972264269281070751861587408444513475978",
    "822706177547333904277098315627816954134843423089051300855508636393841422982314867675371709332946",
    "907116452773548139486849889121309503320798547444475200304291516056874702612943831301146310031761",
    "006978690423369396903",
];
const Q_1: [&str; 4] = [
    "112999222406798721931833333849268147102950147022505802460992091535268075816966075936025019040393",
    "072433622656802082332622017453223652152214407213664131523248768791241424323195695511370649171095",
    "113633627629936307847640285306090631113634417741800808235795531707908047840001483377345590617223",
    "758834712434567239787",
];
const P_2: [&str; 4] = [
    "932711941920500689798987129261964850452055475245257367449830468319997824082378998207292117079867",
    "048982988431751948269709814290451609709437585436689051427546077808854253326633710439952873685809",
    "866021685935139596059574215982801837475008595162183849021569125579058133238282543263010720346046",
    "49942246692022588359",
];
const Q_2: [&str; 4] = [
    "123145322507865067441764317613813453415107444938593771938504295336306582921459209819165079920243",
    "554461498788942789585162660780353335140326656404890996270598225572077702459330683747343220343561",
    "324101684500787934899239929262253324737826415372735395237651055386282249599946089003065979976044",
    "722770257588349357063",
];

fn join(parts: &[&str]) -> BigUint {
    parts
        .concat()
        .parse()
        .expect("fixture primes are valid decimal integers")
}

/// Safe primes `(p, q)` for a credential definition
pub fn safe_primes() -> (BigUint, BigUint) {
    (join(&P_1), join(&Q_1))
}

/// A second pair, used where two independent keys are needed such as key rotation
pub fn other_safe_primes() -> (BigUint, BigUint) {
    (join(&P_2), join(&Q_2))
}
