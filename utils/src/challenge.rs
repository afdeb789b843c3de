//! Fiat-Shamir challenge over mixed integer and elliptic curve commitments.
//!
//! Sub-protocols contribute two kinds of values: their first-message commitments (the tau list)
//! and the public values the commitments are made over (the c list). The challenge is the hash of
//! all taus in insertion order, then all c values in insertion order, then the nonce. Prover and
//! verifier must add values in exactly the same order.

use crate::hashing_utils::hash_to_biguint;
use ark_serialize::{CanonicalSerialize, SerializationError};
use ark_std::vec::Vec;
use digest::Digest;
use num::BigUint;

/// Types whose commitments feed a Fiat-Shamir challenge
pub trait ChallengeContributor {
    type Error;

    /// Append the first-message commitments
    fn tau_contribution(&self, builder: &mut ChallengeBuilder) -> Result<(), Self::Error>;

    /// Append the public values the commitments were made over
    fn c_contribution(&self, builder: &mut ChallengeBuilder) -> Result<(), Self::Error>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChallengeBuilder {
    tau_list: Vec<Vec<u8>>,
    c_list: Vec<Vec<u8>>,
}

impl ChallengeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tau_int(&mut self, value: &BigUint) {
        self.tau_list.push(value.to_bytes_be());
    }

    pub fn add_c_int(&mut self, value: &BigUint) {
        self.c_list.push(value.to_bytes_be());
    }

    pub fn add_tau_elem<T: CanonicalSerialize>(
        &mut self,
        value: &T,
    ) -> Result<(), SerializationError> {
        self.tau_list.push(ark_to_bytes(value)?);
        Ok(())
    }

    pub fn add_c_elem<T: CanonicalSerialize>(&mut self, value: &T) -> Result<(), SerializationError> {
        self.c_list.push(ark_to_bytes(value)?);
        Ok(())
    }

    pub fn add<C: ChallengeContributor>(&mut self, contributor: &C) -> Result<(), C::Error> {
        contributor.tau_contribution(self)?;
        contributor.c_contribution(self)
    }

    pub fn tau_len(&self) -> usize {
        self.tau_list.len()
    }

    pub fn c_len(&self) -> usize {
        self.c_list.len()
    }

    /// Hash everything collected so far together with the nonce
    pub fn challenge<D: Digest>(&self, nonce: &BigUint) -> BigUint {
        let nonce = nonce.to_bytes_be();
        let chunks = self
            .tau_list
            .iter()
            .chain(self.c_list.iter())
            .map(|v| v.as_slice())
            .chain(ark_std::iter::once(nonce.as_slice()))
            .collect::<Vec<_>>();
        hash_to_biguint::<D>(&chunks)
    }
}

/// Compressed canonical bytes of an arkworks object
pub fn ark_to_bytes<T: CanonicalSerialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    value.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::G1Affine;
    use ark_ec::AffineRepr;
    use sha2::Sha256;

    #[test]
    fn order_matters() {
        let nonce = BigUint::from(1234567u64);
        let g = G1Affine::generator();

        let mut b1 = ChallengeBuilder::new();
        b1.add_tau_int(&BigUint::from(1u8));
        b1.add_tau_elem(&g).unwrap();
        b1.add_c_int(&BigUint::from(2u8));

        // c values are always hashed after taus regardless of when they are added
        let mut b2 = ChallengeBuilder::new();
        b2.add_c_int(&BigUint::from(2u8));
        b2.add_tau_int(&BigUint::from(1u8));
        b2.add_tau_elem(&g).unwrap();
        assert_eq!(b1.challenge::<Sha256>(&nonce), b2.challenge::<Sha256>(&nonce));

        let mut b3 = ChallengeBuilder::new();
        b3.add_tau_elem(&g).unwrap();
        b3.add_tau_int(&BigUint::from(1u8));
        b3.add_c_int(&BigUint::from(2u8));
        assert_ne!(b1.challenge::<Sha256>(&nonce), b3.challenge::<Sha256>(&nonce));

        assert_ne!(
            b1.challenge::<Sha256>(&nonce),
            b1.challenge::<Sha256>(&BigUint::from(7654321u64))
        );
        assert_eq!(b1.tau_len(), 2);
        assert_eq!(b1.c_len(), 1);
    }
}
