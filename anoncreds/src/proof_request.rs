//! What a verifier asks for and which credentials the holder uses to answer.

use crate::{constants::LARGE_NONCE, cred_def::issuer_did_of};
use ark_std::{
    collections::{BTreeMap, BTreeSet},
    rand::RngCore,
    vec::Vec,
};
use bignum_arith::random::random_bits;
use num::BigUint;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

/// Fresh 80 bit nonce for offers, requests and proof requests
pub fn generate_nonce<R: RngCore>(rng: &mut R) -> BigUint {
    random_bits(rng, LARGE_NONCE)
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub name: String,
    pub version: String,
    #[serde_as(as = "DisplayFromStr")]
    pub nonce: BigUint,
    #[serde(default)]
    pub requested_attributes: BTreeMap<String, AttributeInfo>,
    #[serde(default)]
    pub requested_predicates: BTreeMap<String, PredicateInfo>,
    #[serde(default)]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl ProofRequest {
    /// Interval for a referent, its own taking precedence over the request's
    pub fn interval_for<'a>(
        &'a self,
        own: &'a Option<NonRevokedInterval>,
    ) -> Option<&'a NonRevokedInterval> {
        own.as_ref().or(self.non_revoked.as_ref())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    #[serde(default)]
    pub restrictions: Option<Vec<Restriction>>,
    #[serde(default)]
    pub non_revoked: Option<NonRevokedInterval>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PredicateType {
    #[serde(rename = ">=")]
    GE,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateInfo {
    pub name: String,
    pub p_type: PredicateType,
    pub p_value: i32,
    #[serde(default)]
    pub restrictions: Option<Vec<Restriction>>,
    #[serde(default)]
    pub non_revoked: Option<NonRevokedInterval>,
}

/// Inclusive bounds on the timestamp of the registry state a non-revocation proof is made
/// against
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonRevokedInterval {
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub to: Option<u64>,
}

impl NonRevokedInterval {
    pub fn contains(&self, timestamp: u64) -> bool {
        self.from.map_or(true, |from| timestamp >= from) && self.to.map_or(true, |to| timestamp <= to)
    }
}

/// Every field that is set must match. A list of restrictions is satisfied if any one is.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    #[serde(default)]
    pub schema_id: Option<String>,
    #[serde(default)]
    pub cred_def_id: Option<String>,
    #[serde(default)]
    pub issuer_did: Option<String>,
}

impl Restriction {
    pub fn is_satisfied_by(&self, schema_id: &str, cred_def_id: &str) -> bool {
        self.schema_id.as_deref().map_or(true, |s| s == schema_id)
            && self.cred_def_id.as_deref().map_or(true, |c| c == cred_def_id)
            && self
                .issuer_did
                .as_deref()
                .map_or(true, |d| d == issuer_did_of(cred_def_id))
    }
}

pub fn restrictions_satisfied(
    restrictions: &Option<Vec<Restriction>>,
    schema_id: &str,
    cred_def_id: &str,
) -> bool {
    match restrictions {
        None => true,
        Some(list) => list.iter().any(|r| r.is_satisfied_by(schema_id, cred_def_id)),
    }
}

/// A credential as used in a proof. A credential used at two timestamps gives two sub-proofs.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProvingCredentialKey {
    pub cred_id: String,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAttribute {
    pub cred_id: String,
    #[serde(default)]
    pub timestamp: Option<u64>,
    pub revealed: bool,
}

impl RequestedAttribute {
    pub fn key(&self) -> ProvingCredentialKey {
        ProvingCredentialKey {
            cred_id: self.cred_id.clone(),
            timestamp: self.timestamp,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedCredentials {
    #[serde(default)]
    pub self_attested_attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub requested_attributes: BTreeMap<String, RequestedAttribute>,
    #[serde(default)]
    pub requested_predicates: BTreeMap<String, ProvingCredentialKey>,
}

/// `attr_name p_type value` over the encoded value of a schema attribute
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Predicate {
    pub attr_name: String,
    pub p_type: PredicateType,
    pub value: i32,
}

/// What one sub-proof shows about its credential. Attribute names are schema names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubProofRequest {
    pub revealed_attrs: BTreeSet<String>,
    pub predicates: BTreeSet<Predicate>,
}
