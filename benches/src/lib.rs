//! Fixtures shared by the benchmarks

use anoncreds_cl::{
    cred_def::{CredentialDefinition, CredentialDefinitionConfig, SafePrimes},
    credential::{credential_values, process_credential, Credential},
    issuer::IssuerWallet,
    master_secret::MasterSecret,
    request::create_credential_request,
    schema::Schema,
};
use ark_bls12_381::Bls12_381;
use ark_std::rand::rngs::StdRng;
use cks_accumulator::tails::InMemoryTails;
use did_keys::InMemoryWallet;
use std::sync::Arc;
use test_utils::primes::safe_primes;

pub type Issuer = IssuerWallet<Bls12_381, InMemoryWallet>;

pub const ISSUER_DID: &str = "NcYxiDXkpYi6ov5FcYDi1e";
pub const PROVER_DID: &str = "CnEDk9HrMnmiHXEV1WFgbVCRteYnPqsJwrTdcZaNhFVW";

pub const GVT_VALUES: [(&str, &str); 4] =
    [("name", "Alex"), ("age", "28"), ("sex", "male"), ("height", "175")];

pub fn gvt_schema() -> Schema {
    Schema::new(ISSUER_DID, "gvt", "1.0", &["name", "age", "sex", "height"]).unwrap()
}

/// Issuer with a stored definition for [`gvt_schema`]. Uses the fixed primes so setup does not
/// dominate the benchmark run.
pub fn setup_issuer(
    rng: &mut StdRng,
    support_revocation: bool,
) -> (Issuer, Schema, CredentialDefinition<Bls12_381>) {
    let issuer = IssuerWallet::new(Arc::new(InMemoryWallet::new()));
    let schema = gvt_schema();
    let (p, q) = safe_primes();
    let cred_def = issuer
        .create_and_store_credential_definition(
            rng,
            ISSUER_DID,
            &schema,
            "tag",
            &SafePrimes::new(p, q),
            &CredentialDefinitionConfig { support_revocation },
        )
        .unwrap();
    (issuer, schema, cred_def)
}

/// Offer, request, issuance and processing of a credential without revocation
pub fn issue_gvt(
    rng: &mut StdRng,
    issuer: &Issuer,
    cred_def: &CredentialDefinition<Bls12_381>,
    master_secret: &MasterSecret,
) -> Credential<Bls12_381> {
    let offer = issuer.create_credential_offer(rng, &cred_def.id).unwrap();
    let (request, metadata) =
        create_credential_request(rng, PROVER_DID, cred_def, master_secret, "main", &offer)
            .unwrap();
    let (mut credential, _, _) = issuer
        .issue_credential::<_, InMemoryTails<Bls12_381>>(
            rng,
            &offer,
            &request,
            &credential_values(GVT_VALUES),
            None,
            None,
        )
        .unwrap();
    process_credential(rng, &mut credential, &metadata, master_secret, cred_def, None).unwrap();
    credential
}
