//! Primary part of a sub-proof: the equality proof over a randomized CL signature and the range
//! proofs for `>=` predicates.
//!
//! Equality proof: with `A' = A * S^r`, `e' = e - 2^596` and `v' = v - e * r` the prover shows
//! knowledge of `e', v'`, the hidden attributes and `m2` such that
//! `Z / (A'^(2^596) * prod_revealed R_i^m_i) = A'^e' * prod_hidden R_i^m_i * R_ctxt^m2 * S^v'`.
//!
//! Predicate `m >= k`: `m - k = u_1^2 + u_2^2 + u_3^2 + u_4^2` and the prover commits to every
//! `u_i` as `T_i = Z^u_i * S^r_i` and to the difference as `T_delta = Z^(m - k) * S^r_delta`. It
//! shows knowledge of the openings, that `T_delta * Z^k` opens to the same `m` as the equality
//! proof (shared blinding of `m`) and that `T_delta = prod T_i^u_i * S^alpha`, so the committed
//! difference is a sum of squares.

use crate::{
    constants::{
        ITERATION, LARGE_ALPHATILDE, LARGE_E_START, LARGE_ETILDE, LARGE_MVECT, LARGE_RTILDE,
        LARGE_UTILDE, LARGE_VPRIME, LARGE_VTILDE, MASTER_SECRET,
    },
    credential::PrimaryCredentialSignature,
    cred_def::CredentialPrimaryPublicKey,
    error::ProofError,
    helpers::{multi_pow, random_signed, signed},
    proof::{PrimaryEqualProof, PrimaryPredicateGEProof, PrimaryProof},
    proof_request::{Predicate, SubProofRequest},
};
use ark_std::{collections::BTreeMap, rand::RngCore, vec::Vec};
use bignum_arith::four_squares::four_squares;
use group_ops::rsa_group::RsaGroup;
use num::{BigInt, BigUint, One, Signed, Zero};
use ssi_crypto_utils::challenge::{ChallengeBuilder, ChallengeContributor};

fn e_start() -> BigInt {
    BigInt::one() << LARGE_E_START
}

/// Prover's state for the equality proof
#[derive(Clone, Debug)]
pub struct PrimaryEqualInitProof {
    a_prime: BigUint,
    t: BigUint,
    e_prime: BigInt,
    e_tilde: BigInt,
    v_prime: BigInt,
    v_tilde: BigInt,
    hidden: BTreeMap<String, BigInt>,
    m_tilde: BTreeMap<String, BigInt>,
    m2: BigInt,
    m2_tilde: BigInt,
    revealed: BTreeMap<String, BigInt>,
}

impl PrimaryEqualInitProof {
    /// `messages` holds every schema attribute. `ms_tilde` is the blinding of the master secret
    /// shared by all sub-proofs of a presentation and `m2_tilde` the blinding of the credential
    /// context, shared with the non-revocation proof if there is one.
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: RngCore>(
        rng: &mut R,
        public: &CredentialPrimaryPublicKey,
        signature: &PrimaryCredentialSignature,
        master_secret: &BigUint,
        messages: &BTreeMap<String, BigInt>,
        sub_proof_request: &SubProofRequest,
        ms_tilde: &BigInt,
        m2_tilde: BigInt,
    ) -> Result<Self, ProofError> {
        let group = public.group()?;
        let mut revealed = BTreeMap::new();
        let mut hidden = BTreeMap::new();
        for (attr, m) in messages {
            if sub_proof_request.revealed_attrs.contains(attr) {
                revealed.insert(attr.clone(), m.clone());
            } else {
                hidden.insert(attr.clone(), m.clone());
            }
        }
        if revealed.len() != sub_proof_request.revealed_attrs.len() {
            return Err(ProofError::MalformedRequest(
                "revealed attribute not in credential".to_string(),
            ));
        }
        hidden.insert(MASTER_SECRET.to_string(), signed(master_secret));

        let r = random_signed(rng, LARGE_VPRIME);
        let a_prime = multi_pow(
            &group,
            &[(&signature.a, BigInt::one()), (&public.s, r.clone())],
        )?;
        let e = signed(&signature.e);
        let v_prime = signed(&signature.v) - &e * &r;
        let e_prime = e - e_start();

        let e_tilde = random_signed(rng, LARGE_ETILDE);
        let v_tilde = random_signed(rng, LARGE_VTILDE);
        let mut m_tilde = BTreeMap::new();
        for attr in hidden.keys() {
            let blinding = if attr == MASTER_SECRET {
                ms_tilde.clone()
            } else {
                random_signed(rng, LARGE_MVECT)
            };
            m_tilde.insert(attr.clone(), blinding);
        }

        let mut pairs = vec![
            (&a_prime, e_tilde.clone()),
            (&public.rctxt, m2_tilde.clone()),
            (&public.s, v_tilde.clone()),
        ];
        for (attr, blinding) in &m_tilde {
            pairs.push((public.r_for(attr)?, blinding.clone()));
        }
        let t = multi_pow(&group, &pairs)?;

        Ok(Self {
            a_prime,
            t,
            e_prime,
            e_tilde,
            v_prime,
            v_tilde,
            hidden,
            m_tilde,
            m2: signed(&signature.m_2),
            m2_tilde,
            revealed,
        })
    }

    /// Blinding of a hidden attribute, to be shared with predicate proofs over it
    pub fn m_tilde(&self, attr: &str) -> Option<&BigInt> {
        self.m_tilde.get(attr)
    }

    pub fn hidden_value(&self, attr: &str) -> Option<&BigInt> {
        self.hidden.get(attr)
    }

    pub fn finalize(&self, challenge: &BigUint) -> PrimaryEqualProof {
        let c = signed(challenge);
        PrimaryEqualProof {
            revealed_attrs: self.revealed.clone(),
            a_prime: self.a_prime.clone(),
            e: &self.e_tilde + &c * &self.e_prime,
            v: &self.v_tilde + &c * &self.v_prime,
            m: self
                .m_tilde
                .iter()
                .map(|(attr, blinding)| (attr.clone(), blinding + &c * &self.hidden[attr]))
                .collect(),
            m2: &self.m2_tilde + &c * &self.m2,
        }
    }
}

impl ChallengeContributor for PrimaryEqualInitProof {
    type Error = ProofError;

    fn tau_contribution(&self, builder: &mut ChallengeBuilder) -> Result<(), Self::Error> {
        builder.add_tau_int(&self.t);
        Ok(())
    }

    fn c_contribution(&self, builder: &mut ChallengeBuilder) -> Result<(), Self::Error> {
        builder.add_c_int(&self.a_prime);
        Ok(())
    }
}

/// Prover's state for one `>=` predicate
#[derive(Clone, Debug)]
pub struct PrimaryPredicateGEInitProof {
    predicate: Predicate,
    u: Vec<BigInt>,
    r: Vec<BigInt>,
    r_delta: BigInt,
    u_tilde: Vec<BigInt>,
    r_tilde: Vec<BigInt>,
    r_delta_tilde: BigInt,
    alpha_tilde: BigInt,
    t: Vec<BigUint>,
    t_delta: BigUint,
    tau_list: Vec<BigUint>,
}

impl PrimaryPredicateGEInitProof {
    /// `m` is the attribute's value and `m_tilde` its blinding in the equality proof
    pub fn new<R: RngCore>(
        rng: &mut R,
        public: &CredentialPrimaryPublicKey,
        predicate: &Predicate,
        m: &BigInt,
        m_tilde: &BigInt,
    ) -> Result<Self, ProofError> {
        let group = public.group()?;
        let delta = m - BigInt::from(predicate.value);
        if delta.is_negative() {
            return Err(ProofError::PredicateNotSatisfied(predicate.attr_name.clone()));
        }
        let u = four_squares(rng, delta.magnitude())?
            .iter()
            .map(signed)
            .collect::<Vec<_>>();

        let mut r = Vec::with_capacity(ITERATION);
        let mut t = Vec::with_capacity(ITERATION);
        for u_i in &u {
            let r_i = random_signed(rng, LARGE_VPRIME);
            t.push(group.pedersen_commitment(&public.z, u_i, &public.s, &r_i)?);
            r.push(r_i);
        }
        let r_delta = random_signed(rng, LARGE_VPRIME);
        let t_delta = group.pedersen_commitment(&public.z, &delta, &public.s, &r_delta)?;

        let u_tilde = (0..ITERATION)
            .map(|_| random_signed(rng, LARGE_UTILDE))
            .collect::<Vec<_>>();
        let r_tilde = (0..ITERATION)
            .map(|_| random_signed(rng, LARGE_RTILDE))
            .collect::<Vec<_>>();
        let r_delta_tilde = random_signed(rng, LARGE_RTILDE);
        let alpha_tilde = random_signed(rng, LARGE_ALPHATILDE);

        let mut tau_list = Vec::with_capacity(ITERATION + 2);
        for (u_tilde_i, r_tilde_i) in u_tilde.iter().zip(r_tilde.iter()) {
            tau_list.push(group.pedersen_commitment(&public.z, u_tilde_i, &public.s, r_tilde_i)?);
        }
        tau_list.push(group.pedersen_commitment(&public.z, m_tilde, &public.s, &r_delta_tilde)?);
        let mut pairs = t
            .iter()
            .zip(u_tilde.iter())
            .map(|(t_i, u_tilde_i)| (t_i, u_tilde_i.clone()))
            .collect::<Vec<_>>();
        pairs.push((&public.s, alpha_tilde.clone()));
        tau_list.push(multi_pow(&group, &pairs)?);

        Ok(Self {
            predicate: predicate.clone(),
            u,
            r,
            r_delta,
            u_tilde,
            r_tilde,
            r_delta_tilde,
            alpha_tilde,
            t,
            t_delta,
            tau_list,
        })
    }

    /// `mj` is the equality proof's response for the predicate's attribute
    pub fn finalize(&self, challenge: &BigUint, mj: &BigInt) -> PrimaryPredicateGEProof {
        let c = signed(challenge);
        let respond = |tilde: &[BigInt], value: &[BigInt]| -> Vec<BigInt> {
            tilde
                .iter()
                .zip(value.iter())
                .map(|(t, v)| t + &c * v)
                .collect()
        };
        let urproduct = self
            .u
            .iter()
            .zip(self.r.iter())
            .fold(BigInt::zero(), |acc, (u, r)| acc + u * r);
        PrimaryPredicateGEProof {
            attr_name: self.predicate.attr_name.clone(),
            u: respond(&self.u_tilde, &self.u),
            r: respond(&self.r_tilde, &self.r),
            r_delta: &self.r_delta_tilde + &c * &self.r_delta,
            mj: mj.clone(),
            alpha: &self.alpha_tilde + &c * (&self.r_delta - urproduct),
            t: self.t.clone(),
            t_delta: self.t_delta.clone(),
        }
    }
}

impl ChallengeContributor for PrimaryPredicateGEInitProof {
    type Error = ProofError;

    fn tau_contribution(&self, builder: &mut ChallengeBuilder) -> Result<(), Self::Error> {
        for tau in &self.tau_list {
            builder.add_tau_int(tau);
        }
        Ok(())
    }

    fn c_contribution(&self, builder: &mut ChallengeBuilder) -> Result<(), Self::Error> {
        for t in self.t.iter().chain(ark_std::iter::once(&self.t_delta)) {
            builder.add_c_int(t);
        }
        Ok(())
    }
}

/// Equality proof followed by the predicate proofs in predicate order
#[derive(Clone, Debug)]
pub struct PrimaryInitProof {
    pub eq_proof: PrimaryEqualInitProof,
    pub ge_proofs: Vec<PrimaryPredicateGEInitProof>,
}

impl PrimaryInitProof {
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: RngCore>(
        rng: &mut R,
        public: &CredentialPrimaryPublicKey,
        signature: &PrimaryCredentialSignature,
        master_secret: &BigUint,
        messages: &BTreeMap<String, BigInt>,
        sub_proof_request: &SubProofRequest,
        ms_tilde: &BigInt,
        m2_tilde: BigInt,
    ) -> Result<Self, ProofError> {
        let eq_proof = PrimaryEqualInitProof::new(
            rng,
            public,
            signature,
            master_secret,
            messages,
            sub_proof_request,
            ms_tilde,
            m2_tilde,
        )?;
        let mut ge_proofs = Vec::with_capacity(sub_proof_request.predicates.len());
        for predicate in &sub_proof_request.predicates {
            let not_hidden = || {
                ProofError::MalformedRequest(format!(
                    "predicate attribute {} must be a hidden attribute of the credential",
                    predicate.attr_name
                ))
            };
            let m = eq_proof
                .hidden_value(&predicate.attr_name)
                .ok_or_else(not_hidden)?;
            let m_tilde = eq_proof
                .m_tilde(&predicate.attr_name)
                .ok_or_else(not_hidden)?;
            ge_proofs.push(PrimaryPredicateGEInitProof::new(
                rng, public, predicate, m, m_tilde,
            )?);
        }
        Ok(Self {
            eq_proof,
            ge_proofs,
        })
    }

    pub fn finalize(&self, challenge: &BigUint) -> Result<PrimaryProof, ProofError> {
        let eq_proof = self.eq_proof.finalize(challenge);
        let ge_proofs = self
            .ge_proofs
            .iter()
            .map(|ge| {
                let mj = eq_proof.m.get(&ge.predicate.attr_name).ok_or_else(|| {
                    ProofError::MalformedRequest(ge.predicate.attr_name.clone())
                })?;
                Ok(ge.finalize(challenge, mj))
            })
            .collect::<Result<Vec<_>, ProofError>>()?;
        Ok(PrimaryProof {
            eq_proof,
            ge_proofs,
        })
    }
}

impl ChallengeContributor for PrimaryInitProof {
    type Error = ProofError;

    fn tau_contribution(&self, builder: &mut ChallengeBuilder) -> Result<(), Self::Error> {
        self.eq_proof.tau_contribution(builder)?;
        for ge in &self.ge_proofs {
            ge.tau_contribution(builder)?;
        }
        Ok(())
    }

    fn c_contribution(&self, builder: &mut ChallengeBuilder) -> Result<(), Self::Error> {
        self.eq_proof.c_contribution(builder)?;
        for ge in &self.ge_proofs {
            ge.c_contribution(builder)?;
        }
        Ok(())
    }
}

/// Whether every group element in the proof is a unit modulo `n`
pub fn primary_proof_elements_valid(group: &RsaGroup, proof: &PrimaryProof) -> bool {
    group.is_element(&proof.eq_proof.a_prime)
        && proof.ge_proofs.iter().all(|ge| {
            ge.t.iter()
                .chain(ark_std::iter::once(&ge.t_delta))
                .all(|t| group.is_element(t))
        })
}

/// First message of the equality proof recomputed from the responses
pub fn eq_verification_tau(
    public: &CredentialPrimaryPublicKey,
    proof: &PrimaryEqualProof,
    challenge: &BigUint,
) -> Result<BigUint, ProofError> {
    let group = public.group()?;
    let c = signed(challenge);

    let mut denominator = vec![(&proof.a_prime, e_start())];
    for (attr, m) in &proof.revealed_attrs {
        denominator.push((public.r_for(attr)?, m.clone()));
    }
    let rhs = group.div(&public.z, &multi_pow(&group, &denominator)?)?;

    let mut pairs = vec![
        (&rhs, -c),
        (&proof.a_prime, proof.e.clone()),
        (&public.rctxt, proof.m2.clone()),
        (&public.s, proof.v.clone()),
    ];
    for (attr, m) in &proof.m {
        pairs.push((public.r_for(attr)?, m.clone()));
    }
    Ok(multi_pow(&group, &pairs)?)
}

/// First messages of a predicate proof recomputed from the responses. `predicate` comes from the
/// proof request, not from the proof.
pub fn ge_verification_taus(
    public: &CredentialPrimaryPublicKey,
    proof: &PrimaryPredicateGEProof,
    predicate: &Predicate,
    challenge: &BigUint,
) -> Result<Vec<BigUint>, ProofError> {
    let group = public.group()?;
    let c = signed(challenge);
    let minus_c = -&c;

    let mut taus = Vec::with_capacity(ITERATION + 2);
    for ((t_i, u_i), r_i) in proof.t.iter().zip(proof.u.iter()).zip(proof.r.iter()) {
        taus.push(multi_pow(
            &group,
            &[
                (t_i, minus_c.clone()),
                (&public.z, u_i.clone()),
                (&public.s, r_i.clone()),
            ],
        )?);
    }

    let t_delta_z_k = multi_pow(
        &group,
        &[
            (&proof.t_delta, BigInt::one()),
            (&public.z, BigInt::from(predicate.value)),
        ],
    )?;
    taus.push(multi_pow(
        &group,
        &[
            (&t_delta_z_k, minus_c.clone()),
            (&public.z, proof.mj.clone()),
            (&public.s, proof.r_delta.clone()),
        ],
    )?);

    let mut pairs = vec![(&proof.t_delta, minus_c)];
    for (t_i, u_i) in proof.t.iter().zip(proof.u.iter()) {
        pairs.push((t_i, u_i.clone()));
    }
    pairs.push((&public.s, proof.alpha.clone()));
    taus.push(multi_pow(&group, &pairs)?);
    Ok(taus)
}

/// Add the recomputed first messages and the commitments of a primary proof in the order
/// [`PrimaryInitProof`] contributes them
pub fn primary_verification_contribution(
    builder: &mut ChallengeBuilder,
    public: &CredentialPrimaryPublicKey,
    proof: &PrimaryProof,
    predicates: &[&Predicate],
    challenge: &BigUint,
) -> Result<(), ProofError> {
    builder.add_tau_int(&eq_verification_tau(public, &proof.eq_proof, challenge)?);
    for (ge, predicate) in proof.ge_proofs.iter().zip(predicates.iter()) {
        for tau in ge_verification_taus(public, ge, predicate, challenge)? {
            builder.add_tau_int(&tau);
        }
    }
    builder.add_c_int(&proof.eq_proof.a_prime);
    for ge in &proof.ge_proofs {
        for t in ge.t.iter().chain(ark_std::iter::once(&ge.t_delta)) {
            builder.add_c_int(t);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cred_def::{generate_primary_keys, tests::fixture_primes, CredentialPrimaryPrivateKey},
        credential::{credential_values, messages_for, sign_primary},
        proof_request::PredicateType,
    };
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use bignum_arith::random::random_bits;
    use sha2::Sha256;

    struct Signed {
        public: CredentialPrimaryPublicKey,
        signature: PrimaryCredentialSignature,
        master_secret: BigUint,
        messages: BTreeMap<String, BigInt>,
    }

    fn signed_credential(rng: &mut StdRng, age: &str) -> Signed {
        let attrs = ["name", "age", "height"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (public, private, _): (_, CredentialPrimaryPrivateKey, _) =
            generate_primary_keys(rng, &attrs, &fixture_primes()).unwrap();
        let master_secret = random_bits(rng, 256);
        let v_prime = random_bits(rng, LARGE_VPRIME);
        let group = public.group().unwrap();
        let u = multi_pow(
            &group,
            &[
                (&public.s, signed(&v_prime)),
                (public.r_for(MASTER_SECRET).unwrap(), signed(&master_secret)),
            ],
        )
        .unwrap();
        let values = credential_values([("name", "Alex"), ("age", age), ("height", "175")]);
        let messages = messages_for(&public, &values).unwrap();
        let (mut signature, _) = sign_primary(
            rng,
            &public,
            &private,
            &u,
            &messages,
            &BigUint::from(42u32),
            &BigUint::from(1u32),
        )
        .unwrap();
        signature.v += v_prime;
        Signed {
            public,
            signature,
            master_secret,
            messages,
        }
    }

    fn challenge_of(init: &PrimaryInitProof, nonce: &BigUint) -> BigUint {
        let mut builder = ChallengeBuilder::new();
        builder.add(init).unwrap();
        builder.challenge::<Sha256>(nonce)
    }

    fn verifies(
        public: &CredentialPrimaryPublicKey,
        proof: &PrimaryProof,
        predicates: &[&Predicate],
        c: &BigUint,
        nonce: &BigUint,
    ) -> bool {
        let mut builder = ChallengeBuilder::new();
        primary_verification_contribution(&mut builder, public, proof, predicates, c).unwrap();
        &builder.challenge::<Sha256>(nonce) == c
    }

    #[test]
    fn equality_and_predicates() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let cred = signed_credential(&mut rng, "28");
        let nonce = BigUint::from(123456u32);

        let ge = |value| Predicate {
            attr_name: "age".to_string(),
            p_type: PredicateType::GE,
            value,
        };
        let request = SubProofRequest {
            revealed_attrs: ["name".to_string()].into_iter().collect(),
            predicates: [ge(18)].into_iter().collect(),
        };
        let ms_tilde = random_signed(&mut rng, LARGE_MVECT);
        let m2_tilde = random_signed(&mut rng, LARGE_MVECT);
        let init = PrimaryInitProof::new(
            &mut rng,
            &cred.public,
            &cred.signature,
            &cred.master_secret,
            &cred.messages,
            &request,
            &ms_tilde,
            m2_tilde,
        )
        .unwrap();
        let c = challenge_of(&init, &nonce);
        let proof = init.finalize(&c).unwrap();

        assert_eq!(
            proof.eq_proof.revealed_attrs.keys().collect::<Vec<_>>(),
            vec!["name"]
        );
        assert_eq!(
            proof.eq_proof.m.keys().collect::<Vec<_>>(),
            vec!["age", "height", "master_secret"]
        );
        assert_eq!(proof.ge_proofs[0].mj, proof.eq_proof.m["age"]);
        let group = cred.public.group().unwrap();
        assert!(primary_proof_elements_valid(&group, &proof));
        assert!(verifies(&cred.public, &proof, &[&ge(18)], &c, &nonce));

        // Claimed against a larger bound or another nonce
        assert!(!verifies(&cred.public, &proof, &[&ge(19)], &c, &nonce));
        assert!(!verifies(
            &cred.public,
            &proof,
            &[&ge(18)],
            &c,
            &BigUint::from(1u32)
        ));

        let mut tampered = proof.clone();
        tampered.eq_proof.revealed_attrs.insert("name".to_string(), BigInt::from(7));
        assert!(!verifies(&cred.public, &tampered, &[&ge(18)], &c, &nonce));
        let mut tampered = proof;
        tampered.ge_proofs[0].alpha += 1;
        assert!(!verifies(&cred.public, &tampered, &[&ge(18)], &c, &nonce));
    }

    #[test]
    fn predicate_boundaries() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let cred = signed_credential(&mut rng, "30");
        let nonce = BigUint::from(1u32);
        for (bound, holds) in [(29, true), (30, true), (31, false)] {
            let predicate = Predicate {
                attr_name: "age".to_string(),
                p_type: PredicateType::GE,
                value: bound,
            };
            let request = SubProofRequest {
                revealed_attrs: Default::default(),
                predicates: [predicate.clone()].into_iter().collect(),
            };
            let ms_tilde = random_signed(&mut rng, LARGE_MVECT);
            let m2_tilde = random_signed(&mut rng, LARGE_MVECT);
            let result = PrimaryInitProof::new(
                &mut rng,
                &cred.public,
                &cred.signature,
                &cred.master_secret,
                &cred.messages,
                &request,
                &ms_tilde,
                m2_tilde,
            );
            if holds {
                let init = result.unwrap();
                let c = challenge_of(&init, &nonce);
                let proof = init.finalize(&c).unwrap();
                assert!(verifies(&cred.public, &proof, &[&predicate], &c, &nonce));
            } else {
                assert!(matches!(result, Err(ProofError::PredicateNotSatisfied(_))));
            }
        }

        // Predicate over a revealed attribute
        let request = SubProofRequest {
            revealed_attrs: ["age".to_string()].into_iter().collect(),
            predicates: [Predicate {
                attr_name: "age".to_string(),
                p_type: PredicateType::GE,
                value: 18,
            }]
            .into_iter()
            .collect(),
        };
        assert!(matches!(
            PrimaryInitProof::new(
                &mut rng,
                &cred.public,
                &cred.signature,
                &cred.master_secret,
                &cred.messages,
                &request,
                &BigInt::zero(),
                BigInt::zero(),
            ),
            Err(ProofError::MalformedRequest(_))
        ));
    }
}
