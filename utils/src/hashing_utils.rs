use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::PrimeField;
use digest::Digest;
use num::BigUint;

/// Hash bytes to a point on the curve. Returns as Projective coordinates. This is vulnerable to timing attack and is only used when input
/// is public anyway like when generating setup parameters.
pub fn projective_group_elem_from_try_and_incr<G: AffineRepr, D: Digest>(bytes: &[u8]) -> G::Group {
    let mut hash = D::digest(bytes);
    let mut j = 1u64;
    loop {
        if let Some(g) = G::from_random_bytes(&hash) {
            return g.mul_by_cofactor_to_group();
        }
        hash = D::digest(&concat_slices!(bytes, b"-attempt-", j.to_le_bytes()));
        j += 1;
    }
}

/// Hash bytes to a point on the curve. Returns as Affine coordinates. This is vulnerable to timing attack and is only used when input
/// is public anyway like when generating setup parameters.
pub fn affine_group_elem_from_try_and_incr<G: AffineRepr, D: Digest>(bytes: &[u8]) -> G {
    projective_group_elem_from_try_and_incr::<G, D>(bytes).into_affine()
}

/// Hash a sequence of byte strings to an unsigned integer. Every chunk is prefixed with its
/// length as 4 big-endian bytes so that different splits of the same bytes give different hashes.
/// The digest is read as a big-endian integer.
pub fn hash_to_biguint<D: Digest>(chunks: &[&[u8]]) -> BigUint {
    let mut hasher = D::new();
    for c in chunks {
        hasher.update((c.len() as u32).to_be_bytes());
        hasher.update(c);
    }
    BigUint::from_bytes_be(&hasher.finalize())
}

/// Reduce an unsigned integer into the prime field.
pub fn field_elem_from_biguint<F: PrimeField>(n: &BigUint) -> F {
    F::from_le_bytes_mod_order(&n.to_bytes_le())
}

/// Canonical integer representative of a field element.
pub fn biguint_from_field_elem<F: PrimeField>(f: &F) -> BigUint {
    f.into_bigint().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::{Fr, G1Affine, G2Affine};
    use ark_std::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use blake2::Blake2b512;
    use sha2::Sha256;

    #[test]
    fn hash_to_curve_is_deterministic() {
        let g1 = affine_group_elem_from_try_and_incr::<G1Affine, Blake2b512>(b"test : g");
        let g1_again = affine_group_elem_from_try_and_incr::<G1Affine, Blake2b512>(b"test : g");
        let h1 = affine_group_elem_from_try_and_incr::<G1Affine, Blake2b512>(b"test : h");
        assert_eq!(g1, g1_again);
        assert_ne!(g1, h1);
        assert!(g1.is_on_curve());
        assert!(g1.is_in_correct_subgroup_assuming_on_curve());

        let g2 = affine_group_elem_from_try_and_incr::<G2Affine, Blake2b512>(b"test : g");
        assert!(g2.is_in_correct_subgroup_assuming_on_curve());
    }

    #[test]
    fn integer_hash_separates_chunks() {
        let a = hash_to_biguint::<Sha256>(&[b"ab", b"c"]);
        let b = hash_to_biguint::<Sha256>(&[b"a", b"bc"]);
        assert_ne!(a, b);
        assert_eq!(a, hash_to_biguint::<Sha256>(&[b"ab", b"c"]));
        assert!(a.bits() <= 256);
    }

    #[test]
    fn field_conversions() {
        let mut rng = StdRng::seed_from_u64(0u64);
        for _ in 0..10 {
            let f = Fr::rand(&mut rng);
            let n = biguint_from_field_elem(&f);
            assert_eq!(field_elem_from_biguint::<Fr>(&n), f);
        }
        let modulus: BigUint = Fr::MODULUS.into();
        let n = &modulus + BigUint::from(5u32);
        assert_eq!(field_elem_from_biguint::<Fr>(&n), Fr::from(5u64));
    }
}
