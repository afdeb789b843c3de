//! Pairing based accumulator for credential revocation.
//!
//! An issuer creates a revocation registry of fixed size `L` per credential definition. Every
//! credential issued against the registry gets an index `i` in `1..=L` and a non-revocation
//! signature binding that index to the credential context. The registry's accumulator is a sum of
//! per-index values (tails), so revoking or re-admitting an index is one group addition, and the
//! change is published as a [`registry::RevocationRegistryDelta`].
//!
//! Holders keep a [`witness::Witness`] for their index and update it from published deltas,
//! reading only the tails the delta touches. At presentation time they prove with
//! [`proof::NonRevocInitProof`] that their index is in the accumulator without revealing it.
//!
//! - [`setup`]: credential definition revocation keys and registry keys
//! - [`tails`]: tails generation, storage and hashing
//! - [`registry`]: registry definition, deltas and the issuer side handle
//! - [`issuance`]: non-revocation signatures
//! - [`witness`]: witnesses and the holder's revocation state
//! - [`proof`]: proof of non-revocation
//! - [`ledger`]: read access to published registries

pub mod error;
pub mod issuance;
pub mod ledger;
pub mod proof;
pub mod registry;
pub mod setup;
pub mod tails;
pub mod witness;
