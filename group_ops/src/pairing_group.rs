//! Pairing group helpers. Group law, doubling and scalar multiplication are the arkworks
//! operators on `E::G1`/`E::G2`; this module adds validated decoding, hashing of public
//! parameters to points, and pairing evaluation.

use crate::error::GroupError;
use ark_ec::{
    pairing::{Pairing, PairingOutput},
    short_weierstrass::{Affine, SWCurveConfig},
    AffineRepr, CurveGroup,
};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{rand::RngCore, vec::Vec, UniformRand};
use digest::Digest;
use ssi_crypto_utils::hashing_utils::affine_group_elem_from_try_and_incr;

pub type Gt<E> = PairingOutput<E>;

/// Decode a compressed point, checking that it is on the curve and in the prime order subgroup.
pub fn decode_point<G: AffineRepr>(bytes: &[u8]) -> Result<G, GroupError> {
    Ok(G::deserialize_compressed(bytes)?)
}

/// Decode a target group element, checking subgroup membership
pub fn decode_gt<E: Pairing>(bytes: &[u8]) -> Result<Gt<E>, GroupError> {
    Ok(Gt::<E>::deserialize_compressed(bytes)?)
}

pub fn encode<T: CanonicalSerialize>(elem: &T) -> Result<Vec<u8>, GroupError> {
    let mut bytes = Vec::with_capacity(elem.compressed_size());
    elem.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

/// Check an already decoded short Weierstrass point. Points built in memory from coordinates
/// bypass the checks decoding does, so anything that did not come from [`decode_point`] should
/// pass through here.
pub fn check_point<P: SWCurveConfig>(p: &Affine<P>) -> Result<(), GroupError> {
    if p.is_on_curve() && p.is_in_correct_subgroup_assuming_on_curve() {
        Ok(())
    } else {
        Err(GroupError::InvalidPoint)
    }
}

pub fn random_point<G: AffineRepr, R: RngCore>(rng: &mut R) -> G {
    G::Group::rand(rng).into_affine()
}

/// Point whose discrete log relative to any other point is unknown, derived from a public label
pub fn point_from_label<G: AffineRepr, D: Digest>(label: &[u8]) -> G {
    affine_group_elem_from_try_and_incr::<G, D>(label)
}

pub fn pairing<E: Pairing>(
    p: impl Into<E::G1Prepared>,
    q: impl Into<E::G2Prepared>,
) -> Gt<E> {
    E::pairing(p, q)
}

/// Product of pairings (sum in additive notation) `e(p_1, q_1) * e(p_2, q_2) * ...`
pub fn multi_pairing<E: Pairing>(
    p: impl IntoIterator<Item = impl Into<E::G1Prepared>>,
    q: impl IntoIterator<Item = impl Into<E::G2Prepared>>,
) -> Gt<E> {
    E::multi_pairing(p, q)
}
