use anoncreds_cl::{
    credential::{credential_values, process_credential},
    issuer::merge_revocation_registry_deltas,
    master_secret::MasterSecret,
    request::create_credential_request,
};
use ark_bls12_381::Bls12_381;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use benches::{setup_issuer, GVT_VALUES, ISSUER_DID, PROVER_DID};
use cks_accumulator::{
    registry::{IssuanceType, RevocationRegistryConfig},
    tails::InMemoryTails,
    witness::RevocationState,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const MAX_CRED_NUM: u32 = 1000;

/// Compares moving a holder's witness forward by a delta against rebuilding it from the full
/// registry history, for growing numbers of revocations.
fn witness_update_vs_rebuild(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0u64);
    let (issuer, _, cred_def) = setup_issuer(&mut rng, true);
    let mut tails = InMemoryTails::<Bls12_381>::new();
    let (rev_reg_def, initial) = issuer
        .create_revocation_registry(
            &mut rng,
            ISSUER_DID,
            &cred_def.id,
            "tag",
            &RevocationRegistryConfig {
                max_cred_num: MAX_CRED_NUM,
                issuance_type: IssuanceType::IssuanceByDefault,
            },
            &mut tails,
            None,
        )
        .unwrap();

    let revocation_counts = [1u32, 8, 32];
    let issued_count = revocation_counts.iter().max().unwrap() + 1;

    let ms = MasterSecret::new(&mut rng);
    let values = credential_values(GVT_VALUES);
    let mut holder_idx = None;
    for _ in 0..issued_count {
        let offer = issuer.create_credential_offer(&mut rng, &cred_def.id).unwrap();
        let (request, metadata) =
            create_credential_request(&mut rng, PROVER_DID, &cred_def, &ms, "main", &offer)
                .unwrap();
        let (mut credential, rev_idx, _) = issuer
            .issue_credential(
                &mut rng,
                &offer,
                &request,
                &values,
                Some(&rev_reg_def.id),
                Some(&tails),
            )
            .unwrap();
        if holder_idx.is_none() {
            process_credential(
                &mut rng,
                &mut credential,
                &metadata,
                &ms,
                &cred_def,
                Some(&rev_reg_def),
            )
            .unwrap();
            holder_idx = rev_idx;
        }
    }
    let holder_idx = holder_idx.unwrap();
    let state = RevocationState::create(holder_idx, MAX_CRED_NUM, &initial, 0, &tails, None).unwrap();

    // Revoke the indices after the holder's. For each count keep the revocations merged into one
    // delta chaining onto the holder's state, and the full history from registry creation.
    let mut revocations = None;
    let mut next_to_revoke = holder_idx + 1;
    let mut batches = vec![];
    for count in revocation_counts {
        while next_to_revoke <= holder_idx + count {
            let delta = issuer
                .revoke_credential(&rev_reg_def.id, next_to_revoke, &tails)
                .unwrap();
            revocations = Some(match revocations {
                None => delta,
                Some(merged) => merge_revocation_registry_deltas(&merged, &delta).unwrap(),
            });
            next_to_revoke += 1;
        }
        let since_state = revocations.clone().unwrap();
        let history = merge_revocation_registry_deltas(&initial, &since_state).unwrap();
        batches.push((count, since_state, history));
    }

    let mut update_group = c.benchmark_group("Witness update");
    for (count, since_state, _) in &batches {
        update_group.bench_function(format!("{} revocations since last update", count), |b| {
            b.iter(|| {
                let mut s = state;
                s.update(holder_idx, MAX_CRED_NUM, black_box(since_state), 1, &tails)
                    .unwrap();
                s
            })
        });
    }
    update_group.finish();

    let mut rebuild_group = c.benchmark_group("Witness rebuild");
    for (count, _, history) in &batches {
        rebuild_group.bench_function(format!("{} revocations in history", count), |b| {
            b.iter(|| {
                RevocationState::create(holder_idx, MAX_CRED_NUM, black_box(history), 1, &tails, None)
                    .unwrap()
            })
        });
    }
    rebuild_group.finish();
}

criterion_group!(benches, witness_update_vs_rebuild);
criterion_main!(benches);
