use crate::error::ArithmeticError;
use ark_std::rand::RngCore;
use num::{bigint::RandBigInt, BigUint, One};

/// Uniformly random integer in `[0, 2^bits)`
pub fn random_bits<R: RngCore>(rng: &mut R, bits: u64) -> BigUint {
    rng.gen_biguint(bits)
}

/// Uniformly random integer with exactly `bits` bits, i.e. the top bit is always set
pub fn random_bits_exact<R: RngCore>(rng: &mut R, bits: u64) -> BigUint {
    if bits == 0 {
        return BigUint::default();
    }
    let mut n = rng.gen_biguint(bits);
    n.set_bit(bits - 1, true);
    n
}

/// Uniformly random integer in `[lo, hi)`
pub fn random_in_range<R: RngCore>(
    rng: &mut R,
    lo: &BigUint,
    hi: &BigUint,
) -> Result<BigUint, ArithmeticError> {
    if lo >= hi {
        return Err(ArithmeticError::EmptyRange);
    }
    Ok(rng.gen_biguint_range(lo, hi))
}

/// Uniformly random integer in `[0, n)`
pub fn random_below<R: RngCore>(rng: &mut R, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    random_in_range(rng, &BigUint::default(), n)
}

/// Uniformly random integer in `[1, n)`, i.e. never zero
pub fn random_non_zero_below<R: RngCore>(
    rng: &mut R,
    n: &BigUint,
) -> Result<BigUint, ArithmeticError> {
    random_in_range(rng, &BigUint::one(), n)
}
