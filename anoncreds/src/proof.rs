//! Presentation sent to a verifier: one sub-proof per credential used, the shared Fiat-Shamir
//! challenge, and the mapping from the request's referents to sub-proofs.

use ark_ec::pairing::Pairing;
use ark_std::{collections::BTreeMap, vec::Vec};
use cks_accumulator::proof::NonRevocProof;
use num::{BigInt, BigUint};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

/// Knowledge of a randomized CL signature `A' = A * S^r` over the revealed and hidden attributes
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryEqualProof {
    /// Encoded values of the revealed attributes
    #[serde_as(as = "BTreeMap<_, DisplayFromStr>")]
    pub revealed_attrs: BTreeMap<String, BigInt>,
    #[serde_as(as = "DisplayFromStr")]
    pub a_prime: BigUint,
    #[serde_as(as = "DisplayFromStr")]
    pub e: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub v: BigInt,
    /// Responses for the hidden attributes, including the master secret
    #[serde_as(as = "BTreeMap<_, DisplayFromStr>")]
    pub m: BTreeMap<String, BigInt>,
    #[serde_as(as = "DisplayFromStr")]
    pub m2: BigInt,
}

/// Proof that a hidden attribute minus the predicate value is a sum of four squares
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryPredicateGEProof {
    pub attr_name: String,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub u: Vec<BigInt>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub r: Vec<BigInt>,
    #[serde_as(as = "DisplayFromStr")]
    pub r_delta: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub mj: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub alpha: BigInt,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub t: Vec<BigUint>,
    #[serde_as(as = "DisplayFromStr")]
    pub t_delta: BigUint,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryProof {
    pub eq_proof: PrimaryEqualProof,
    pub ge_proofs: Vec<PrimaryPredicateGEProof>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SubProof<E: Pairing> {
    pub primary_proof: PrimaryProof,
    pub non_revoc_proof: Option<NonRevocProof<E>>,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedProof {
    #[serde_as(as = "DisplayFromStr")]
    pub c_hash: BigUint,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CompositeProof<E: Pairing> {
    pub proofs: Vec<SubProof<E>>,
    pub aggregated_proof: AggregatedProof,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedAttributeInfo {
    pub sub_proof_index: usize,
    pub raw: String,
    pub encoded: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProofReferent {
    pub sub_proof_index: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedProof {
    #[serde(default)]
    pub revealed_attrs: BTreeMap<String, RevealedAttributeInfo>,
    #[serde(default)]
    pub unrevealed_attrs: BTreeMap<String, SubProofReferent>,
    #[serde(default)]
    pub self_attested_attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub predicates: BTreeMap<String, SubProofReferent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub schema_id: String,
    pub cred_def_id: String,
    #[serde(default)]
    pub rev_reg_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Proof<E: Pairing> {
    pub proof: CompositeProof<E>,
    pub requested_proof: RequestedProof,
    /// One per sub-proof, in the same order
    pub identifiers: Vec<Identifier>,
}
