//! Anonymous credentials over CL signatures with `>=` predicates and pairing based revocation.
//!
//! The flow between the three parties:
//!
//! 1. The issuer creates a [`cred_def::CredentialDefinition`] for a [`schema::Schema`] through an
//!    [`issuer::IssuerWallet`], which keeps the private key, and optionally a revocation registry.
//! 2. The issuer sends a [`request::CredentialOffer`]. The holder answers with a
//!    [`request::CredentialRequest`] committing to its [`master_secret::MasterSecret`] without
//!    revealing it.
//! 3. The issuer signs the attribute values together with the committed master secret and the
//!    holder completes and checks the signature with [`credential::process_credential`].
//! 4. A verifier sends a [`proof_request::ProofRequest`]. The holder answers with a
//!    [`proof::Proof`] from [`prover::create_proof`], revealing some attributes, proving
//!    predicates over others and, if asked, that the credentials are not revoked at some time.
//! 5. [`verifier::verify`] checks the proof against the public definitions and registries.
//!
//! Attribute values are integers: see [`encoding`] for how raw strings map to them. Bit lengths of
//! the scheme are in [`constants`].

pub mod constants;
pub mod cred_def;
pub mod credential;
pub mod encoding;
pub mod error;
mod helpers;
pub mod issuer;
pub mod master_secret;
pub mod proof;
pub mod proof_request;
pub mod prover;
pub mod request;
pub mod schema;
pub mod sub_proof;
pub mod verifier;

pub use error::{CredentialError, ProofError};
pub use issuer::IssuerWallet;
pub use prover::create_proof;
pub use verifier::verify;
