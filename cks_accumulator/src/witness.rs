//! Witnesses of accumulator membership and the holder's revocation state.
//!
//! The witness of index `i` is `omega = sum of tail[L + 1 - j + i]` over all other accumulated
//! indices `j`, so that `e(g_i, accum) = z * e(g, omega)` with `g_i = g * gamma^i`. Building it
//! from scratch touches every accumulated index; updating it from a delta only touches the
//! indices in the delta.

use crate::{
    error::RevocationError,
    registry::{check_index, RevocationRegistry, RevocationRegistryDelta},
    setup::{CredentialRevocationPublicKey, RevocationKeyPublic},
    tails::{witness_tail_index, TailsReader},
};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::Zero;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::collections::BTreeSet;
use core::sync::atomic::{AtomicBool, Ordering};
use group_ops::pairing_group::pairing;
use log::trace;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use ssi_crypto_utils::serde_utils::ArkObjectBytes;

#[serde_as]
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct Witness<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub omega: E::G2Affine,
}

impl<E: Pairing> Witness<E> {
    /// Witness for `rev_idx` given all indices currently in the accumulator. Checks `cancel`
    /// between indices.
    pub fn new<T: TailsReader<E>>(
        rev_idx: u32,
        max_cred_num: u32,
        accumulated: &BTreeSet<u32>,
        tails: &T,
        cancel: Option<&AtomicBool>,
    ) -> Result<Self, RevocationError> {
        trace!(
            "Witness::new: >>> rev_idx: {}, accumulated: {}",
            rev_idx,
            accumulated.len()
        );
        check_index(max_cred_num, rev_idx)?;
        let mut omega = E::G2::zero();
        for j in accumulated.iter().filter(|j| **j != rev_idx) {
            if cancel.map_or(false, |c| c.load(Ordering::Relaxed)) {
                return Err(RevocationError::Cancelled);
            }
            check_index(max_cred_num, *j)?;
            omega += tails.read(witness_tail_index(max_cred_num, rev_idx, *j))?;
        }
        Ok(Self {
            omega: omega.into_affine(),
        })
    }

    /// Apply a delta that chains onto the accumulator this witness is for. Only the indices in
    /// the delta are read from tails.
    pub fn update<T: TailsReader<E>>(
        &mut self,
        rev_idx: u32,
        max_cred_num: u32,
        delta: &RevocationRegistryDelta<E>,
        tails: &T,
    ) -> Result<(), RevocationError> {
        trace!(
            "Witness::update: >>> rev_idx: {}, issued: {}, revoked: {}",
            rev_idx,
            delta.issued.len(),
            delta.revoked.len()
        );
        check_index(max_cred_num, rev_idx)?;
        let mut omega = self.omega.into_group();
        for j in delta.issued.iter().filter(|j| **j != rev_idx) {
            check_index(max_cred_num, *j)?;
            omega += tails.read(witness_tail_index(max_cred_num, rev_idx, *j))?;
        }
        for j in delta.revoked.iter().filter(|j| **j != rev_idx) {
            check_index(max_cred_num, *j)?;
            omega -= tails.read(witness_tail_index(max_cred_num, rev_idx, *j))?;
        }
        self.omega = omega.into_affine();
        Ok(())
    }

    /// `e(g_i, accum) == z * e(g, omega)`
    pub fn is_member(
        &self,
        g_i: &E::G1Affine,
        registry: &RevocationRegistry<E>,
        cred_rev_pub_key: &CredentialRevocationPublicKey<E>,
        rev_key_pub: &RevocationKeyPublic<E>,
    ) -> bool {
        pairing::<E>(*g_i, registry.accum)
            == rev_key_pub.z + pairing::<E>(cred_rev_pub_key.g, self.omega)
    }
}

/// What a holder keeps to prove non-revocation against the registry at `timestamp`
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
#[serde(bound = "")]
pub struct RevocationState<E: Pairing> {
    pub witness: Witness<E>,
    pub rev_reg: RevocationRegistry<E>,
    pub timestamp: u64,
}

impl<E: Pairing> RevocationState<E> {
    /// Build the state from a delta starting at registry creation
    pub fn create<T: TailsReader<E>>(
        rev_idx: u32,
        max_cred_num: u32,
        delta: &RevocationRegistryDelta<E>,
        timestamp: u64,
        tails: &T,
        cancel: Option<&AtomicBool>,
    ) -> Result<Self, RevocationError> {
        trace!(
            "RevocationState::create: >>> rev_idx: {}, timestamp: {}",
            rev_idx,
            timestamp
        );
        if delta.prev_accum.is_some() {
            return Err(RevocationError::DeltaChainMismatch);
        }
        let witness = Witness::new(rev_idx, max_cred_num, &delta.issued, tails, cancel)?;
        Ok(Self {
            witness,
            rev_reg: delta.registry(),
            timestamp,
        })
    }

    /// Move the state forward by a delta. A delta starting at registry creation rebuilds the
    /// witness, any other must chain onto the current accumulator.
    pub fn update<T: TailsReader<E>>(
        &mut self,
        rev_idx: u32,
        max_cred_num: u32,
        delta: &RevocationRegistryDelta<E>,
        timestamp: u64,
        tails: &T,
    ) -> Result<(), RevocationError> {
        trace!(
            "RevocationState::update: >>> rev_idx: {}, from: {}, to: {}",
            rev_idx,
            self.timestamp,
            timestamp
        );
        if timestamp < self.timestamp {
            return Err(RevocationError::WitnessUpdateFromFuture {
                state: self.timestamp,
                delta: timestamp,
            });
        }
        match delta.prev_accum {
            None => {
                *self = Self::create(rev_idx, max_cred_num, delta, timestamp, tails, None)?;
            }
            Some(prev) if prev == self.rev_reg.accum => {
                self.witness.update(rev_idx, max_cred_num, delta, tails)?;
                self.rev_reg = delta.registry();
                self.timestamp = timestamp;
            }
            Some(_) => return Err(RevocationError::DeltaChainMismatch),
        }
        Ok(())
    }
}
