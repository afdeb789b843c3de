//! Proof verification. Missing or inconsistent inputs (unknown schemas or definitions, referents
//! without a sub-proof) are errors; a proof that fails any check is `Ok(false)`.

use crate::{
    constants::MASTER_SECRET,
    cred_def::CredentialDefinition,
    credential::credential_context_scalar,
    encoding::{encoded_to_message, is_encoding_of},
    error::ProofError,
    proof::{Identifier, Proof, SubProof},
    proof_request::{
        restrictions_satisfied, NonRevokedInterval, Predicate, ProofRequest, Restriction,
        SubProofRequest,
    },
    schema::Schema,
    sub_proof::{primary_proof_elements_valid, primary_verification_contribution},
};
use ark_ec::pairing::Pairing;
use ark_std::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};
use cks_accumulator::registry::{RevocationRegistry, RevocationRegistryDefinition};
use log::{debug, trace};
use num::Signed;
use sha2::Sha256;
use ssi_crypto_utils::challenge::ChallengeBuilder;

/// Registry states a verifier looked up, per registry id and timestamp
pub type RevocationRegistries<E> = BTreeMap<String, BTreeMap<u64, RevocationRegistry<E>>>;

fn malformed(msg: String) -> ProofError {
    ProofError::MalformedRequest(msg)
}

/// Everything a referent of the request says about the sub-proof serving it
struct ReferentCheck<'a> {
    sub_proof_index: usize,
    restrictions: &'a Option<Vec<Restriction>>,
    interval: Option<&'a NonRevokedInterval>,
}

macro_rules! check {
    ($cond: expr, $($msg: tt)+) => {
        if !$cond {
            debug!($($msg)+);
            return Ok(false);
        }
    };
}

pub fn verify<E: Pairing>(
    proof_req: &ProofRequest,
    proof: &Proof<E>,
    schemas: &BTreeMap<String, Schema>,
    cred_defs: &BTreeMap<String, CredentialDefinition<E>>,
    rev_reg_defs: &BTreeMap<String, RevocationRegistryDefinition<E>>,
    rev_regs: &RevocationRegistries<E>,
) -> Result<bool, ProofError> {
    trace!(
        "verify: >>> proof_req: {}, sub-proofs: {}",
        proof_req.name,
        proof.proof.proofs.len()
    );
    let sub_proofs = &proof.proof.proofs;
    if sub_proofs.len() != proof.identifiers.len() {
        return Err(malformed(format!(
            "{} sub-proofs but {} identifiers",
            sub_proofs.len(),
            proof.identifiers.len()
        )));
    }
    let mut resolved = Vec::with_capacity(sub_proofs.len());
    for identifier in &proof.identifiers {
        let schema = schemas
            .get(&identifier.schema_id)
            .ok_or_else(|| malformed(format!("schema {} not supplied", identifier.schema_id)))?;
        let cred_def = cred_defs.get(&identifier.cred_def_id).ok_or_else(|| {
            malformed(format!(
                "credential definition {} not supplied",
                identifier.cred_def_id
            ))
        })?;
        if cred_def.schema_id != schema.id {
            return Err(malformed(format!(
                "credential definition {} is not for schema {}",
                cred_def.id, schema.id
            )));
        }
        resolved.push((schema, cred_def));
    }

    // Rebuild what every sub-proof must show from the request
    let requested_proof = &proof.requested_proof;
    let mut expected = vec![SubProofRequest::default(); sub_proofs.len()];
    let mut referent_checks = Vec::new();
    let sub_proof_index = |referent: &str, index: usize| {
        if index < sub_proofs.len() {
            Ok(index)
        } else {
            Err(malformed(format!(
                "referent {} points to missing sub-proof {}",
                referent, index
            )))
        }
    };
    for (referent, info) in &proof_req.requested_attributes {
        let (index, revealed) = if let Some(revealed) = requested_proof.revealed_attrs.get(referent)
        {
            (sub_proof_index(referent, revealed.sub_proof_index)?, Some(revealed))
        } else if let Some(unrevealed) = requested_proof.unrevealed_attrs.get(referent) {
            (sub_proof_index(referent, unrevealed.sub_proof_index)?, None)
        } else if requested_proof.self_attested_attrs.contains_key(referent) {
            if info.restrictions.is_some() {
                debug!("Self attested referent {} has restrictions", referent);
                return Ok(false);
            }
            continue;
        } else {
            return Err(malformed(format!("referent {} is not answered", referent)));
        };
        let schema = resolved[index].0;
        let attr = schema
            .find_attribute(&info.name)
            .ok_or_else(|| malformed(format!("attribute {} is not in schema {}", info.name, schema.id)))?;
        if let Some(revealed) = revealed {
            check!(
                is_encoding_of(&revealed.raw, &revealed.encoded),
                "Encoded value of {} does not match its raw value",
                referent
            );
            let m = sub_proofs[index].primary_proof.eq_proof.revealed_attrs.get(attr);
            check!(
                m.is_some() && m.cloned() == encoded_to_message(&revealed.encoded),
                "Revealed value of {} is not the one proven",
                referent
            );
            expected[index].revealed_attrs.insert(attr.to_string());
        } else {
            check!(
                sub_proofs[index].primary_proof.eq_proof.m.contains_key(attr),
                "Unrevealed attribute {} is not hidden in its sub-proof",
                referent
            );
        }
        referent_checks.push(ReferentCheck {
            sub_proof_index: index,
            restrictions: &info.restrictions,
            interval: proof_req.interval_for(&info.non_revoked),
        });
    }
    for (referent, info) in &proof_req.requested_predicates {
        let index = requested_proof
            .predicates
            .get(referent)
            .ok_or_else(|| malformed(format!("predicate {} is not answered", referent)))?
            .sub_proof_index;
        let index = sub_proof_index(referent, index)?;
        let schema = resolved[index].0;
        let attr = schema
            .find_attribute(&info.name)
            .ok_or_else(|| malformed(format!("attribute {} is not in schema {}", info.name, schema.id)))?;
        expected[index].predicates.insert(Predicate {
            attr_name: attr.to_string(),
            p_type: info.p_type,
            value: info.p_value,
        });
        referent_checks.push(ReferentCheck {
            sub_proof_index: index,
            restrictions: &info.restrictions,
            interval: proof_req.interval_for(&info.non_revoked),
        });
    }

    for check in &referent_checks {
        let identifier = &proof.identifiers[check.sub_proof_index];
        check!(
            restrictions_satisfied(
                check.restrictions,
                &identifier.schema_id,
                &identifier.cred_def_id
            ),
            "Sub-proof {} does not satisfy the restrictions",
            check.sub_proof_index
        );
        if let Some(interval) = check.interval {
            let (_, cred_def) = resolved[check.sub_proof_index];
            if cred_def.supports_revocation() {
                check!(
                    identifier.timestamp.map_or(false, |t| interval.contains(t)),
                    "Sub-proof {} is not for a timestamp in {:?}",
                    check.sub_proof_index,
                    interval
                );
            }
        }
    }

    let c_hash = &proof.proof.aggregated_proof.c_hash;
    let mut master_secret_response = None;
    let mut builder = ChallengeBuilder::new();
    for (index, sub_proof) in sub_proofs.iter().enumerate() {
        let (schema, cred_def) = resolved[index];
        let primary_key = &cred_def.value.primary;
        let primary = &sub_proof.primary_proof;
        let eq = &primary.eq_proof;
        check!(
            primary_proof_elements_valid(&primary_key.group()?, primary),
            "Sub-proof {} has elements outside the group",
            index
        );
        let proven_attrs = eq
            .revealed_attrs
            .keys()
            .chain(eq.m.keys().filter(|a| a.as_str() != MASTER_SECRET))
            .map(|a| a.as_str())
            .collect::<BTreeSet<_>>();
        check!(
            proven_attrs.iter().copied().eq(primary_key.attributes())
                && schema.attr_names.iter().map(|a| a.as_str()).eq(proven_attrs.iter().copied()),
            "Sub-proof {} is not over the attributes of {}",
            index,
            cred_def.id
        );
        check!(
            eq.revealed_attrs.keys().eq(expected[index].revealed_attrs.iter()),
            "Sub-proof {} reveals other attributes than requested",
            index
        );

        let predicates = expected[index].predicates.iter().collect::<Vec<_>>();
        check!(
            primary.ge_proofs.len() == predicates.len()
                && primary
                    .ge_proofs
                    .iter()
                    .zip(predicates.iter())
                    .all(|(ge, p)| ge.attr_name == p.attr_name
                        && eq.m.get(&ge.attr_name) == Some(&ge.mj)),
            "Predicate proofs of sub-proof {} do not match the request",
            index
        );

        let ms = eq.m.get(MASTER_SECRET);
        check!(ms.is_some(), "Sub-proof {} does not hide the master secret", index);
        match master_secret_response {
            None => master_secret_response = ms,
            Some(first) => check!(
                ms == Some(first),
                "Sub-proof {} is for another master secret",
                index
            ),
        }

        if !non_revocation_contribution(
            &mut builder,
            index,
            sub_proof,
            &proof.identifiers[index],
            cred_def,
            rev_reg_defs,
            rev_regs,
            c_hash,
        )? {
            return Ok(false);
        }
        primary_verification_contribution(&mut builder, primary_key, primary, &predicates, c_hash)?;
    }

    let valid = &builder.challenge::<Sha256>(&proof_req.nonce) == c_hash;
    debug!("Verified proof for {}: {}", proof_req.name, valid);
    Ok(valid)
}

/// Add the non-revocation part of a sub-proof to the challenge. Returns `false` if the part is
/// inconsistent with the equality proof.
#[allow(clippy::too_many_arguments)]
fn non_revocation_contribution<E: Pairing>(
    builder: &mut ChallengeBuilder,
    index: usize,
    sub_proof: &SubProof<E>,
    identifier: &Identifier,
    cred_def: &CredentialDefinition<E>,
    rev_reg_defs: &BTreeMap<String, RevocationRegistryDefinition<E>>,
    rev_regs: &RevocationRegistries<E>,
    c_hash: &num::BigUint,
) -> Result<bool, ProofError> {
    let non_revoc = match (&sub_proof.non_revoc_proof, identifier.timestamp) {
        (None, None) => return Ok(true),
        (Some(non_revoc), Some(_)) => non_revoc,
        _ => {
            return Err(malformed(format!(
                "sub-proof {} has a timestamp without non-revocation proof or the reverse",
                index
            )))
        }
    };
    let (rev_reg_id, timestamp) = identifier
        .rev_reg_id
        .as_ref()
        .zip(identifier.timestamp)
        .ok_or_else(|| malformed(format!("sub-proof {} has no registry id", index)))?;
    let rev_reg_def = rev_reg_defs.get(rev_reg_id).ok_or_else(|| {
        malformed(format!(
            "revocation registry definition {} not supplied",
            rev_reg_id
        ))
    })?;
    if rev_reg_def.cred_def_id != cred_def.id {
        return Err(malformed(format!(
            "revocation registry {} is not for {}",
            rev_reg_id, cred_def.id
        )));
    }
    let rev_reg = rev_regs
        .get(rev_reg_id)
        .and_then(|states| states.get(&timestamp))
        .ok_or_else(|| {
            malformed(format!(
                "revocation registry {} at {} not supplied",
                rev_reg_id, timestamp
            ))
        })?;
    let pub_key = cred_def.value.revocation_key().ok_or_else(|| {
        malformed(format!(
            "credential definition {} does not support revocation",
            cred_def.id
        ))
    })?;

    let m2 = &sub_proof.primary_proof.eq_proof.m2;
    if m2.is_negative()
        || credential_context_scalar::<E>(m2.magnitude()) != *non_revoc.m2_response()
    {
        debug!("Sub-proof {} proves another credential context", index);
        return Ok(false);
    }
    non_revoc
        .verification_tau_list(pub_key, rev_reg, &rev_reg_def.public_keys, c_hash)
        .challenge_contribution(builder)?;
    non_revoc.c_list.challenge_contribution(builder)?;
    Ok(true)
}
