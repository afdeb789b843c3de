use anoncreds_cl::{
    credential::{credential_values, process_credential},
    master_secret::MasterSecret,
    request::create_credential_request,
};
use ark_bls12_381::Bls12_381;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use benches::{issue_gvt, setup_issuer, GVT_VALUES, PROVER_DID};
use cks_accumulator::tails::InMemoryTails;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn issuance(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0u64);
    let (issuer, _, cred_def) = setup_issuer(&mut rng, false);
    let ms = MasterSecret::new(&mut rng);
    let values = credential_values(GVT_VALUES);

    let offer = issuer.create_credential_offer(&mut rng, &cred_def.id).unwrap();
    c.bench_function("Create credential request", |b| {
        b.iter(|| {
            create_credential_request(
                &mut rng,
                black_box(PROVER_DID),
                black_box(&cred_def),
                black_box(&ms),
                "main",
                black_box(&offer),
            )
            .unwrap()
        })
    });

    let (request, metadata) =
        create_credential_request(&mut rng, PROVER_DID, &cred_def, &ms, "main", &offer).unwrap();
    c.bench_function("Sign credential", |b| {
        b.iter(|| {
            issuer
                .issue_credential::<_, InMemoryTails<Bls12_381>>(
                    &mut rng,
                    black_box(&offer),
                    black_box(&request),
                    black_box(&values),
                    None,
                    None,
                )
                .unwrap()
        })
    });

    let (credential, _, _) = issuer
        .issue_credential::<_, InMemoryTails<Bls12_381>>(
            &mut rng, &offer, &request, &values, None, None,
        )
        .unwrap();
    c.bench_function("Process credential", |b| {
        b.iter(|| {
            let mut credential = credential.clone();
            process_credential(&mut rng, &mut credential, &metadata, &ms, &cred_def, None)
                .unwrap();
            credential
        })
    });

    c.bench_function("Offer to stored credential", |b| {
        b.iter(|| issue_gvt(&mut rng, &issuer, black_box(&cred_def), &ms))
    });
}

criterion_group!(benches, issuance);
criterion_main!(benches);
