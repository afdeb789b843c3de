//! Primality testing and prime generation

use crate::{
    error::ArithmeticError,
    random::{random_bits_exact, random_in_range},
};
use ark_std::rand::RngCore;
use log::trace;
use num::{BigUint, Integer, One, Zero};

/// Number of Miller-Rabin rounds used when the caller does not choose. The probability of a
/// composite passing is at most `4^-rounds`.
pub const DEFAULT_MILLER_RABIN_ROUNDS: usize = 40;

/// Upper bound on candidates tried when searching for a prime
pub const MAX_PRIME_CANDIDATES: usize = 1_000_000;

const SMALL_PRIMES: [u32; 54] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// Returns `Some(result)` if `n` is settled by trial division with small primes
fn trial_division(n: &BigUint) -> Option<bool> {
    if n < &BigUint::from(2u32) {
        return Some(false);
    }
    for p in SMALL_PRIMES {
        let p = BigUint::from(p);
        if n == &p {
            return Some(true);
        }
        if (n % &p).is_zero() {
            return Some(false);
        }
    }
    None
}

/// Miller-Rabin probabilistic primality test with `rounds` random bases, preceded by trial
/// division with small primes.
pub fn is_prime<R: RngCore>(rng: &mut R, n: &BigUint, rounds: usize) -> bool {
    if let Some(r) = trial_division(n) {
        return r;
    }
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let n_minus_1 = n - &one;

    // n - 1 = d * 2^s with d odd
    let s = n_minus_1.trailing_zeros().unwrap_or(0);
    let d = &n_minus_1 >> s;

    'witness: for _ in 0..rounds {
        // n > 251 here so the range is non-empty
        let a = match random_in_range(rng, &two, &n_minus_1) {
            Ok(a) => a,
            Err(_) => return false,
        };
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_1 {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
            if x == one {
                return false;
            }
        }
        return false;
    }
    true
}

/// Random prime with exactly `bits` bits
pub fn generate_prime<R: RngCore>(rng: &mut R, bits: u64) -> Result<BigUint, ArithmeticError> {
    for _ in 0..MAX_PRIME_CANDIDATES {
        let mut candidate = random_bits_exact(rng, bits);
        candidate.set_bit(0, true);
        if is_prime(rng, &candidate, DEFAULT_MILLER_RABIN_ROUNDS) {
            return Ok(candidate);
        }
    }
    Err(ArithmeticError::PrimeSearchExhausted(MAX_PRIME_CANDIDATES))
}

/// Random safe prime `p = 2p' + 1` with exactly `bits` bits where `p'` is also prime.
pub fn generate_safe_prime<R: RngCore>(
    rng: &mut R,
    bits: u64,
) -> Result<BigUint, ArithmeticError> {
    trace!("generate_safe_prime: >>> bits: {}", bits);
    let three = BigUint::from(3u32);
    for _ in 0..MAX_PRIME_CANDIDATES {
        let mut p_prime = random_bits_exact(rng, bits - 1);
        p_prime.set_bit(0, true);
        // p' = 1 mod 3 makes p = 0 mod 3
        if (&p_prime % &three).is_one() {
            continue;
        }
        let p = (&p_prime << 1) + 1u32;
        // Cheap single round on both first, full rounds only for survivors
        if is_prime(rng, &p_prime, 1)
            && is_prime(rng, &p, 1)
            && is_prime(rng, &p_prime, DEFAULT_MILLER_RABIN_ROUNDS)
            && is_prime(rng, &p, DEFAULT_MILLER_RABIN_ROUNDS)
        {
            trace!("generate_safe_prime: <<<");
            return Ok(p);
        }
    }
    Err(ArithmeticError::PrimeSearchExhausted(MAX_PRIME_CANDIDATES))
}

pub fn is_safe_prime<R: RngCore>(rng: &mut R, p: &BigUint) -> bool {
    if p.is_even() {
        return false;
    }
    let p_prime = p >> 1;
    is_prime(rng, &p_prime, DEFAULT_MILLER_RABIN_ROUNDS)
        && is_prime(rng, p, DEFAULT_MILLER_RABIN_ROUNDS)
}

/// Random prime in `[start, start + range_len)`
pub fn generate_prime_in_range<R: RngCore>(
    rng: &mut R,
    start: &BigUint,
    range_len: &BigUint,
) -> Result<BigUint, ArithmeticError> {
    let end = start + range_len;
    for _ in 0..MAX_PRIME_CANDIDATES {
        let mut candidate = random_in_range(rng, start, &end)?;
        candidate.set_bit(0, true);
        if candidate >= end {
            continue;
        }
        if is_prime(rng, &candidate, DEFAULT_MILLER_RABIN_ROUNDS) {
            return Ok(candidate);
        }
    }
    Err(ArithmeticError::PrimeSearchExhausted(MAX_PRIME_CANDIDATES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn small_numbers() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let primes: Vec<u32> = (0..400u32)
            .filter(|n| is_prime(&mut rng, &BigUint::from(*n), 20))
            .collect();
        let expected: Vec<u32> = (0..400u32)
            .filter(|n| *n >= 2 && (2..*n).take_while(|d| d * d <= *n).all(|d| n % d != 0))
            .collect();
        assert_eq!(primes, expected);
    }

    #[test]
    fn known_values() {
        let mut rng = StdRng::seed_from_u64(0u64);
        // Mersenne prime 2^127 - 1
        let m127 = (BigUint::one() << 127) - 1u32;
        assert!(is_prime(&mut rng, &m127, DEFAULT_MILLER_RABIN_ROUNDS));
        // 2^128 + 1 is divisible by 59649589127497217
        let f7 = (BigUint::one() << 128) + 1u32;
        assert!(!is_prime(&mut rng, &f7, DEFAULT_MILLER_RABIN_ROUNDS));
        // Carmichael number
        assert!(!is_prime(&mut rng, &BigUint::from(561u32 * 1_000_003), 20));
        assert!(!is_prime(
            &mut rng,
            &BigUint::from(3_215_031_751u64),
            DEFAULT_MILLER_RABIN_ROUNDS
        ));
    }

    #[test]
    fn prime_generation() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let p = generate_prime(&mut rng, 256).unwrap();
        assert_eq!(p.bits(), 256);
        assert!(is_prime(&mut rng, &p, DEFAULT_MILLER_RABIN_ROUNDS));

        let sp = generate_safe_prime(&mut rng, 128).unwrap();
        assert_eq!(sp.bits(), 128);
        assert!(is_safe_prime(&mut rng, &sp));

        let start = BigUint::one() << 596;
        let len = BigUint::one() << 119;
        let e = generate_prime_in_range(&mut rng, &start, &len).unwrap();
        assert!(e >= start && e < &start + &len);
        assert!(is_prime(&mut rng, &e, DEFAULT_MILLER_RABIN_ROUNDS));
    }
}
