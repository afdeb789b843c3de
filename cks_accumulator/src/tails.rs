//! Tails of a registry of size `L` are the `2L + 1` elements `g_dash * gamma^k` for `k` in
//! `0..=2L`, except at `k = L + 1` where the identity is stored since `g_dash * gamma^(L+1)` would
//! let anyone compute `z`. The accumulator is a sum of tails `L + 1 - i` over the accumulated
//! indices `i`, and the witness of index `i` is a sum of tails `L + 1 - j + i`.
//!
//! Tails are produced once when the registry is created and are then read by holders to build
//! witnesses, so storage is abstracted by [`TailsWriter`] and [`TailsReader`].

use crate::{error::RevocationError, setup::RevocationKeyPrivate};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::One;
use ark_std::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use digest::Digest;
use log::{debug, trace};
use sha2::Sha256;
use ssi_crypto_utils::challenge::ark_to_bytes;

/// Number of tails for a registry of size `max_cred_num`
pub fn tails_count(max_cred_num: u32) -> u32 {
    2 * max_cred_num + 1
}

/// Index of the tail accumulated for credential `rev_idx`
pub fn accumulator_tail_index(max_cred_num: u32, rev_idx: u32) -> u32 {
    max_cred_num + 1 - rev_idx
}

/// Index of the tail contributed by credential `j` to the witness of credential `rev_idx`
pub fn witness_tail_index(max_cred_num: u32, rev_idx: u32, j: u32) -> u32 {
    max_cred_num + 1 - j + rev_idx
}

pub trait TailsReader<E: Pairing> {
    fn read(&self, index: u32) -> Result<E::G2Affine, RevocationError>;
}

pub trait TailsWriter<E: Pairing> {
    fn append(&mut self, tail: &E::G2Affine) -> Result<(), RevocationError>;

    /// Called once all tails are written. Returns the location readers should fetch them from.
    fn finalize(&mut self, tails_hash: &str) -> Result<String, RevocationError>;
}

impl<E: Pairing, T: TailsReader<E>> TailsReader<E> for &T {
    fn read(&self, index: u32) -> Result<E::G2Affine, RevocationError> {
        (*self).read(index)
    }
}

/// Tails held in memory. Also the reader and writer used by tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InMemoryTails<E: Pairing> {
    tails: Vec<E::G2Affine>,
    tails_hash: Option<String>,
}

impl<E: Pairing> InMemoryTails<E> {
    pub fn new() -> Self {
        Self {
            tails: Vec::new(),
            tails_hash: None,
        }
    }

    pub fn len(&self) -> usize {
        self.tails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tails.is_empty()
    }

    pub fn tails_hash(&self) -> Option<&str> {
        self.tails_hash.as_deref()
    }
}

impl<E: Pairing> Default for InMemoryTails<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Pairing> TailsReader<E> for InMemoryTails<E> {
    fn read(&self, index: u32) -> Result<E::G2Affine, RevocationError> {
        self.tails
            .get(index as usize)
            .copied()
            .ok_or(RevocationError::TailNotFound(index))
    }
}

impl<E: Pairing> TailsWriter<E> for InMemoryTails<E> {
    fn append(&mut self, tail: &E::G2Affine) -> Result<(), RevocationError> {
        self.tails.push(*tail);
        Ok(())
    }

    fn finalize(&mut self, tails_hash: &str) -> Result<String, RevocationError> {
        self.tails_hash = Some(tails_hash.to_string());
        Ok(format!("memory:{}", tails_hash))
    }
}

/// Incremental SHA-256 over the compressed encoding of each tail, base58 encoded
#[derive(Clone, Default)]
pub struct TailsHasher(Sha256);

impl TailsHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update<G: AffineRepr>(&mut self, tail: &G) -> Result<(), RevocationError> {
        self.0.update(ark_to_bytes(tail)?);
        Ok(())
    }

    pub fn finalize(self) -> String {
        bs58::encode(self.0.finalize()).into_string()
    }
}

/// Write all tails of a registry, returning `(tails_hash, tails_location)`. Checks `cancel`
/// between tails.
pub fn generate_tails<E: Pairing, W: TailsWriter<E>>(
    writer: &mut W,
    g_dash: &E::G2Affine,
    private: &RevocationKeyPrivate<E>,
    max_cred_num: u32,
    cancel: Option<&AtomicBool>,
) -> Result<(String, String), RevocationError> {
    trace!("generate_tails: >>> max_cred_num: {}", max_cred_num);
    let mut hasher = TailsHasher::new();
    let mut gamma_pow = E::ScalarField::one();
    let skipped = max_cred_num + 1;
    for k in 0..tails_count(max_cred_num) {
        if cancel.map_or(false, |c| c.load(Ordering::Relaxed)) {
            return Err(RevocationError::Cancelled);
        }
        let tail = if k == skipped {
            E::G2Affine::zero()
        } else {
            (*g_dash * gamma_pow).into_affine()
        };
        hasher.update(&tail)?;
        writer.append(&tail)?;
        gamma_pow *= private.gamma;
    }
    let tails_hash = hasher.finalize();
    let location = writer.finalize(&tails_hash)?;
    debug!("Generated {} tails at {}", tails_count(max_cred_num), location);
    Ok((tails_hash, location))
}

/// Recompute the hash of tails from a reader, to check tails fetched from an untrusted location
pub fn hash_tails<E: Pairing, T: TailsReader<E>>(
    reader: &T,
    max_cred_num: u32,
) -> Result<String, RevocationError> {
    let mut hasher = TailsHasher::new();
    for k in 0..tails_count(max_cred_num) {
        hasher.update(&reader.read(k)?)?;
    }
    Ok(hasher.finalize())
}
