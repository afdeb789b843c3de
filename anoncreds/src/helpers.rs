use ark_std::{rand::RngCore, vec::Vec};
use bignum_arith::random::random_bits;
use group_ops::{error::GroupError, rsa_group::RsaGroup};
use num::{BigInt, BigUint};

pub(crate) fn signed(n: &BigUint) -> BigInt {
    BigInt::from(n.clone())
}

/// Random non-negative integer of at most `bits` bits, as a signed integer
pub(crate) fn random_signed<R: RngCore>(rng: &mut R, bits: u64) -> BigInt {
    BigInt::from(random_bits(rng, bits))
}

/// Product of powers with owned exponents
pub(crate) fn multi_pow(
    group: &RsaGroup,
    pairs: &[(&BigUint, BigInt)],
) -> Result<BigUint, GroupError> {
    group.multi_pow(pairs.iter().map(|(b, e)| (*b, e)))
}

/// Big-endian bytes of each integer, for hashing
pub(crate) fn to_chunks(values: &[&BigUint]) -> Vec<Vec<u8>> {
    values.iter().map(|v| v.to_bytes_be()).collect()
}
