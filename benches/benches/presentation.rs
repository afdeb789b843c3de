use anoncreds_cl::{
    master_secret::MasterSecret,
    proof_request::{
        generate_nonce, AttributeInfo, PredicateInfo, PredicateType, ProofRequest,
        ProvingCredentialKey, RequestedAttribute, RequestedCredentials,
    },
    prover::create_proof,
    verifier::verify,
};
use ark_std::{
    collections::BTreeMap,
    rand::{rngs::StdRng, SeedableRng},
};
use benches::{issue_gvt, setup_issuer};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn proof_request(rng: &mut StdRng, predicate_count: usize) -> ProofRequest {
    // Predicates on distinct attributes, "name" is revealed
    let predicates = ["age", "height"];
    ProofRequest {
        name: "bench".to_string(),
        version: "0.1".to_string(),
        nonce: generate_nonce(rng),
        requested_attributes: [(
            "name".to_string(),
            AttributeInfo {
                name: "name".to_string(),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect(),
        requested_predicates: predicates[..predicate_count]
            .iter()
            .map(|attr| {
                (
                    attr.to_string(),
                    PredicateInfo {
                        name: attr.to_string(),
                        p_type: PredicateType::GE,
                        p_value: 1,
                        restrictions: None,
                        non_revoked: None,
                    },
                )
            })
            .collect(),
        non_revoked: None,
    }
}

fn requested(proof_req: &ProofRequest) -> RequestedCredentials {
    let key = ProvingCredentialKey {
        cred_id: "cred".to_string(),
        timestamp: None,
    };
    RequestedCredentials {
        requested_attributes: proof_req
            .requested_attributes
            .keys()
            .map(|r| {
                (
                    r.clone(),
                    RequestedAttribute {
                        cred_id: key.cred_id.clone(),
                        timestamp: None,
                        revealed: true,
                    },
                )
            })
            .collect(),
        requested_predicates: proof_req
            .requested_predicates
            .keys()
            .map(|r| (r.clone(), key.clone()))
            .collect(),
        ..Default::default()
    }
}

fn presentation(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0u64);
    let (issuer, schema, cred_def) = setup_issuer(&mut rng, false);
    let ms = MasterSecret::new(&mut rng);
    let credential = issue_gvt(&mut rng, &issuer, &cred_def, &ms);

    let credentials = [("cred".to_string(), credential)].into_iter().collect();
    let schemas = [(schema.id.clone(), schema)].into_iter().collect();
    let cred_defs = [(cred_def.id.clone(), cred_def)].into_iter().collect();
    let no_states = BTreeMap::new();
    let no_rev_reg_defs = BTreeMap::new();
    let no_rev_regs = BTreeMap::new();

    let mut create_group = c.benchmark_group("Creating proof");
    for predicate_count in 0..=2 {
        let proof_req = proof_request(&mut rng, predicate_count);
        let requested = requested(&proof_req);
        create_group.bench_function(format!("{} predicates", predicate_count), |b| {
            b.iter(|| {
                create_proof(
                    &mut rng,
                    black_box(&proof_req),
                    black_box(&credentials),
                    black_box(&requested),
                    &ms,
                    &schemas,
                    &cred_defs,
                    &no_states,
                )
                .unwrap()
            })
        });
    }
    create_group.finish();

    let mut verify_group = c.benchmark_group("Verifying proof");
    for predicate_count in 0..=2 {
        let proof_req = proof_request(&mut rng, predicate_count);
        let proof = create_proof(
            &mut rng,
            &proof_req,
            &credentials,
            &requested(&proof_req),
            &ms,
            &schemas,
            &cred_defs,
            &no_states,
        )
        .unwrap();
        verify_group.bench_function(format!("{} predicates", predicate_count), |b| {
            b.iter(|| {
                assert!(verify(
                    black_box(&proof_req),
                    black_box(&proof),
                    &schemas,
                    &cred_defs,
                    &no_rev_reg_defs,
                    &no_rev_regs,
                )
                .unwrap())
            })
        });
    }
    verify_group.finish();
}

criterion_group!(benches, presentation);
criterion_main!(benches);
