#![allow(dead_code)]

use anoncreds_cl::{
    cred_def::{CredentialDefinition, CredentialDefinitionConfig, SafePrimes},
    credential::{credential_values, process_credential, Credential},
    issuer::IssuerWallet,
    master_secret::MasterSecret,
    proof_request::{
        generate_nonce, AttributeInfo, NonRevokedInterval, PredicateInfo, PredicateType,
        ProofRequest,
    },
    request::create_credential_request,
    schema::Schema,
};
use ark_bls12_381::Bls12_381;
use ark_std::{collections::BTreeMap, rand::rngs::StdRng};
use cks_accumulator::{
    registry::{RevocationRegistryDefinition, RevocationRegistryDelta},
    tails::InMemoryTails,
};
use did_keys::InMemoryWallet;
use std::sync::Arc;
use test_utils::primes::{other_safe_primes, safe_primes};

pub type Issuer = IssuerWallet<Bls12_381, InMemoryWallet>;

pub const ISSUER_DID: &str = "NcYxiDXkpYi6ov5FcYDi1e";
pub const PROVER_DID: &str = "CnEDk9HrMnmiHXEV1WFgbVCRteYnPqsJwrTdcZaNhFVW";

pub fn primes() -> SafePrimes {
    let (p, q) = safe_primes();
    SafePrimes::new(p, q)
}

pub fn other_primes() -> SafePrimes {
    let (p, q) = other_safe_primes();
    SafePrimes::new(p, q)
}

pub fn gvt_schema() -> Schema {
    Schema::new(ISSUER_DID, "gvt", "1.0", &["name", "age", "sex", "height"]).unwrap()
}

pub fn xyz_schema() -> Schema {
    Schema::new(ISSUER_DID, "xyz", "1.0", &["status", "period"]).unwrap()
}

pub fn new_issuer() -> Issuer {
    IssuerWallet::new(Arc::new(InMemoryWallet::new()))
}

pub fn create_definition(
    rng: &mut StdRng,
    issuer: &Issuer,
    schema: &Schema,
    primes: &SafePrimes,
    support_revocation: bool,
) -> CredentialDefinition<Bls12_381> {
    issuer
        .create_and_store_credential_definition(
            rng,
            ISSUER_DID,
            schema,
            "tag",
            primes,
            &CredentialDefinitionConfig { support_revocation },
        )
        .unwrap()
}

/// Run offer, request, issuance and processing for one credential
pub fn issue(
    rng: &mut StdRng,
    issuer: &Issuer,
    cred_def: &CredentialDefinition<Bls12_381>,
    master_secret: &MasterSecret,
    values: &[(&str, &str)],
    revocation: Option<(&RevocationRegistryDefinition<Bls12_381>, &InMemoryTails<Bls12_381>)>,
) -> Credential<Bls12_381> {
    issue_with_delta(rng, issuer, cred_def, master_secret, values, revocation).0
}

/// Same as [`issue`], also returning the registry delta of the issuance
pub fn issue_with_delta(
    rng: &mut StdRng,
    issuer: &Issuer,
    cred_def: &CredentialDefinition<Bls12_381>,
    master_secret: &MasterSecret,
    values: &[(&str, &str)],
    revocation: Option<(&RevocationRegistryDefinition<Bls12_381>, &InMemoryTails<Bls12_381>)>,
) -> (
    Credential<Bls12_381>,
    Option<RevocationRegistryDelta<Bls12_381>>,
) {
    let offer = issuer.create_credential_offer(rng, &cred_def.id).unwrap();
    let (request, metadata) =
        create_credential_request(rng, PROVER_DID, cred_def, master_secret, "main", &offer)
            .unwrap();
    let (mut credential, _, delta) = issuer
        .issue_credential(
            rng,
            &offer,
            &request,
            &credential_values(values.iter().copied()),
            revocation.map(|(def, _)| def.id.as_str()),
            revocation.map(|(_, tails)| tails),
        )
        .unwrap();
    process_credential(
        rng,
        &mut credential,
        &metadata,
        master_secret,
        cred_def,
        revocation.map(|(def, _)| def),
    )
    .unwrap();
    (credential, delta)
}

pub fn attribute(name: &str) -> AttributeInfo {
    AttributeInfo {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn predicate_ge(name: &str, value: i32) -> PredicateInfo {
    PredicateInfo {
        name: name.to_string(),
        p_type: PredicateType::GE,
        p_value: value,
        restrictions: None,
        non_revoked: None,
    }
}

pub fn proof_request(
    rng: &mut StdRng,
    attributes: &[(&str, AttributeInfo)],
    predicates: &[(&str, PredicateInfo)],
    non_revoked: Option<NonRevokedInterval>,
) -> ProofRequest {
    ProofRequest {
        name: "proof_req_1".to_string(),
        version: "0.1".to_string(),
        nonce: generate_nonce(rng),
        requested_attributes: attributes
            .iter()
            .map(|(r, a)| (r.to_string(), a.clone()))
            .collect(),
        requested_predicates: predicates
            .iter()
            .map(|(r, p)| (r.to_string(), p.clone()))
            .collect(),
        non_revoked,
    }
}

pub fn by_id<T: Clone>(items: &[(&str, &T)]) -> BTreeMap<String, T> {
    items
        .iter()
        .map(|(id, item)| (id.to_string(), (*item).clone()))
        .collect()
}
