//! Holder side presentation: one sub-proof per credential and timestamp used, all answering a
//! single Fiat-Shamir challenge over the proof request's nonce.
//!
//! Contributions to the challenge are made per sub-proof in [`ProvingCredentialKey`] order, the
//! non-revocation part before the primary part. The verifier rebuilds them in the same order.

use crate::{
    constants::LARGE_MVECT,
    cred_def::CredentialDefinition,
    credential::{messages_for, Credential},
    error::ProofError,
    helpers::{random_signed, signed},
    master_secret::MasterSecret,
    proof::{
        AggregatedProof, CompositeProof, Identifier, Proof, RequestedProof, RevealedAttributeInfo,
        SubProof, SubProofReferent,
    },
    proof_request::{Predicate, ProofRequest, ProvingCredentialKey, RequestedCredentials, SubProofRequest},
    schema::Schema,
    sub_proof::PrimaryInitProof,
};
use ark_ec::pairing::Pairing;
use ark_std::{collections::BTreeMap, rand::RngCore, string::ToString, vec::Vec};
use cks_accumulator::{proof::NonRevocInitProof, witness::RevocationState};
use log::{debug, trace};
use sha2::Sha256;
use ssi_crypto_utils::{challenge::ChallengeBuilder, hashing_utils::biguint_from_field_elem};

/// Revocation states a holder keeps per credential id and registry timestamp
pub type RevocationStates<E> = BTreeMap<String, BTreeMap<u64, RevocationState<E>>>;

struct SubProofInit<'a, E: Pairing> {
    key: &'a ProvingCredentialKey,
    credential: &'a Credential<E>,
    primary: PrimaryInitProof,
    non_revoc: Option<NonRevocInitProof<E>>,
}

fn malformed(msg: impl ToString) -> ProofError {
    ProofError::MalformedRequest(msg.to_string())
}

fn lookup<'a, V>(map: &'a BTreeMap<String, V>, id: &str, what: &str) -> Result<&'a V, ProofError> {
    map.get(id)
        .ok_or_else(|| malformed(format!("{} {} not supplied", what, id)))
}

fn schema_attribute<'a>(schema: &'a Schema, requested: &str) -> Result<&'a str, ProofError> {
    schema.find_attribute(requested).ok_or_else(|| {
        malformed(format!(
            "attribute {} is not in schema {}",
            requested, schema.id
        ))
    })
}

/// Create a proof answering `proof_req` with the holder's `credentials`, keyed by credential id,
/// as chosen in `requested`. A non-revocation proof is made for every credential requested at a
/// timestamp, using the holder's revocation state for that timestamp.
#[allow(clippy::too_many_arguments)]
pub fn create_proof<R: RngCore, E: Pairing>(
    rng: &mut R,
    proof_req: &ProofRequest,
    credentials: &BTreeMap<String, Credential<E>>,
    requested: &RequestedCredentials,
    master_secret: &MasterSecret,
    schemas: &BTreeMap<String, Schema>,
    cred_defs: &BTreeMap<String, CredentialDefinition<E>>,
    rev_states: &RevocationStates<E>,
) -> Result<Proof<E>, ProofError> {
    trace!(
        "create_proof: >>> proof_req: {}, credentials: {}",
        proof_req.name,
        credentials.len()
    );
    let credential_for = |cred_id: &str| {
        credentials
            .get(cred_id)
            .ok_or_else(|| ProofError::MissingCredential(cred_id.to_string()))
    };

    // What each sub-proof has to show
    let mut sub_requests = BTreeMap::<ProvingCredentialKey, SubProofRequest>::new();
    let mut requested_proof = RequestedProof::default();
    // Referent to (key, schema attribute) for revealed and unrevealed attributes
    let mut attr_referents = Vec::new();
    for (referent, info) in &proof_req.requested_attributes {
        if let Some(value) = requested.self_attested_attributes.get(referent) {
            requested_proof
                .self_attested_attrs
                .insert(referent.clone(), value.clone());
            continue;
        }
        let req_attr = requested
            .requested_attributes
            .get(referent)
            .ok_or_else(|| malformed(format!("no credential for referent {}", referent)))?;
        let credential = credential_for(&req_attr.cred_id)?;
        let schema = lookup(schemas, &credential.schema_id, "schema")?;
        let attr = schema_attribute(schema, &info.name)?.to_string();
        let key = req_attr.key();
        let sub_request = sub_requests.entry(key.clone()).or_default();
        if req_attr.revealed {
            sub_request.revealed_attrs.insert(attr.clone());
        }
        attr_referents.push((referent, key, attr, req_attr.revealed));
    }
    let mut predicate_referents = Vec::new();
    for (referent, info) in &proof_req.requested_predicates {
        let key = requested
            .requested_predicates
            .get(referent)
            .ok_or_else(|| malformed(format!("no credential for predicate {}", referent)))?;
        let credential = credential_for(&key.cred_id)?;
        let schema = lookup(schemas, &credential.schema_id, "schema")?;
        let predicate = Predicate {
            attr_name: schema_attribute(schema, &info.name)?.to_string(),
            p_type: info.p_type,
            value: info.p_value,
        };
        sub_requests
            .entry(key.clone())
            .or_default()
            .predicates
            .insert(predicate);
        predicate_referents.push((referent, key.clone()));
    }

    let ms_tilde = random_signed(rng, LARGE_MVECT);
    let mut builder = ChallengeBuilder::new();
    let mut inits = Vec::with_capacity(sub_requests.len());
    for (key, sub_request) in &sub_requests {
        let credential = credential_for(&key.cred_id)?;
        let cred_def = lookup(cred_defs, &credential.cred_def_id, "credential definition")?;
        let primary_key = &cred_def.value.primary;
        let messages = messages_for(primary_key, &credential.values)?;

        let non_revoc = match key.timestamp {
            Some(timestamp) => {
                let r_credential = credential.signature.r_credential.as_ref().ok_or_else(|| {
                    malformed(format!("credential {} is not revocable", key.cred_id))
                })?;
                let pub_key = cred_def.value.revocation_key().ok_or_else(|| {
                    malformed(format!(
                        "credential definition {} does not support revocation",
                        cred_def.id
                    ))
                })?;
                let state = rev_states
                    .get(&key.cred_id)
                    .and_then(|states| states.get(&timestamp))
                    .ok_or_else(|| {
                        ProofError::MissingRevocationState(format!(
                            "{} at {}",
                            key.cred_id, timestamp
                        ))
                    })?;
                Some(NonRevocInitProof::new(
                    rng,
                    r_credential,
                    &state.witness,
                    pub_key,
                    &state.rev_reg,
                ))
            }
            None => None,
        };
        // The non-revocation proof and the equality proof share the blinding of m2
        let m2_tilde = match &non_revoc {
            Some(init) => signed(&biguint_from_field_elem(init.m2_blinding())),
            None => random_signed(rng, LARGE_MVECT),
        };
        let primary = PrimaryInitProof::new(
            rng,
            primary_key,
            &credential.signature.p_credential,
            master_secret.value(),
            &messages,
            sub_request,
            &ms_tilde,
            m2_tilde,
        )?;

        if let Some(init) = &non_revoc {
            builder.add(init)?;
        }
        builder.add(&primary)?;
        inits.push(SubProofInit {
            key,
            credential,
            primary,
            non_revoc,
        });
    }

    let c_hash = builder.challenge::<Sha256>(&proof_req.nonce);

    let mut proofs = Vec::with_capacity(inits.len());
    let mut identifiers = Vec::with_capacity(inits.len());
    let mut index_of = BTreeMap::new();
    for (index, init) in inits.iter().enumerate() {
        proofs.push(SubProof {
            primary_proof: init.primary.finalize(&c_hash)?,
            non_revoc_proof: init.non_revoc.as_ref().map(|n| n.finalize(&c_hash)),
        });
        identifiers.push(Identifier {
            schema_id: init.credential.schema_id.clone(),
            cred_def_id: init.credential.cred_def_id.clone(),
            rev_reg_id: init.credential.rev_reg_id.clone(),
            timestamp: init.key.timestamp,
        });
        index_of.insert(init.key, index);
    }

    for (referent, key, attr, revealed) in attr_referents {
        let sub_proof_index = index_of[&key];
        if revealed {
            let value = credential_for(&key.cred_id)?
                .values
                .get(&attr)
                .ok_or_else(|| malformed(format!("credential {} has no {}", key.cred_id, attr)))?;
            requested_proof.revealed_attrs.insert(
                referent.clone(),
                RevealedAttributeInfo {
                    sub_proof_index,
                    raw: value.raw.clone(),
                    encoded: value.encoded.clone(),
                },
            );
        } else {
            requested_proof
                .unrevealed_attrs
                .insert(referent.clone(), SubProofReferent { sub_proof_index });
        }
    }
    for (referent, key) in predicate_referents {
        requested_proof.predicates.insert(
            referent.clone(),
            SubProofReferent {
                sub_proof_index: index_of[&key],
            },
        );
    }

    debug!(
        "Created proof for {} with {} sub-proofs",
        proof_req.name,
        proofs.len()
    );
    Ok(Proof {
        proof: CompositeProof {
            proofs,
            aggregated_proof: AggregatedProof { c_hash },
        },
        requested_proof,
        identifiers,
    })
}
