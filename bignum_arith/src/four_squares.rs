//! Lagrange four squares decomposition, used by range predicates: `x >= t` is proven by
//! committing to `u_1..u_4` with `x - t = u_1^2 + u_2^2 + u_3^2 + u_4^2`.
//!
//! Powers of 4 are divided out first and the result scaled back by the corresponding power of 2.
//! Small values are decomposed by exhaustive search. Otherwise random `x, y` are drawn until
//! `p = n - x^2 - y^2` is `0`, `1`, `2` or a prime `p = 1 mod 4`, and the prime is split into two
//! squares with the Hermite-Serret descent: a square root `t` of `-1 mod p` is found from a
//! quadratic non-residue and the Euclidean algorithm on `(p, t)` is run till the remainder drops
//! below `sqrt(p)`.

use crate::{
    error::ArithmeticError,
    primes::{is_prime, DEFAULT_MILLER_RABIN_ROUNDS},
    random::random_in_range,
};
use ark_std::rand::RngCore;
use num::{BigUint, Integer, One, ToPrimitive, Zero};

/// Values below this are decomposed by exhaustive search
const EXHAUSTIVE_SEARCH_LIMIT: u64 = 1 << 12;

const MAX_ATTEMPTS: usize = 1_000_000;

/// Returns `[u1, u2, u3, u4]` with `n = u1^2 + u2^2 + u3^2 + u4^2`
pub fn four_squares<R: RngCore>(rng: &mut R, n: &BigUint) -> Result<[BigUint; 4], ArithmeticError> {
    if n.is_zero() {
        return Ok([BigUint::zero(), BigUint::zero(), BigUint::zero(), BigUint::zero()]);
    }
    let v = n.trailing_zeros().unwrap_or(0) / 2;
    let m = n >> (2 * v);

    let mut squares = match m.to_u64() {
        Some(small) if small < EXHAUSTIVE_SEARCH_LIMIT => exhaustive(small)?,
        _ => randomized(rng, &m)?,
    };
    for s in squares.iter_mut() {
        *s <<= v;
    }
    debug_assert!(is_decomposition_of(&squares, n));
    if !is_decomposition_of(&squares, n) {
        return Err(ArithmeticError::DecompositionFailed(n.to_string()));
    }
    Ok(squares)
}

pub fn is_decomposition_of(squares: &[BigUint; 4], n: &BigUint) -> bool {
    let sum: BigUint = squares.iter().map(|s| s * s).sum();
    &sum == n
}

fn exhaustive(n: u64) -> Result<[BigUint; 4], ArithmeticError> {
    let isqrt = |x: u64| -> u64 {
        let mut r = (x as f64).sqrt() as u64;
        while r * r > x {
            r -= 1;
        }
        while (r + 1) * (r + 1) <= x {
            r += 1;
        }
        r
    };
    let max = isqrt(n);
    for a in (0..=max).rev() {
        let rem_a = n - a * a;
        for b in (0..=isqrt(rem_a).min(a)).rev() {
            let rem_b = rem_a - b * b;
            for c in (0..=isqrt(rem_b).min(b)).rev() {
                let rem_c = rem_b - c * c;
                let d = isqrt(rem_c);
                if d * d == rem_c {
                    return Ok([a.into(), b.into(), c.into(), d.into()]);
                }
            }
        }
    }
    Err(ArithmeticError::DecompositionFailed(n.to_string()))
}

fn randomized<R: RngCore>(rng: &mut R, n: &BigUint) -> Result<[BigUint; 4], ArithmeticError> {
    let four = BigUint::from(4u32);
    let upper_x = n.sqrt() + 1u32;
    for _ in 0..MAX_ATTEMPTS {
        let x = random_in_range(rng, &BigUint::zero(), &upper_x)?;
        let rem = n - &x * &x;
        let upper_y = rem.sqrt() + 1u32;
        let y = random_in_range(rng, &BigUint::zero(), &upper_y)?;
        let p = &rem - &y * &y;

        let split = if p.is_zero() {
            Some((BigUint::zero(), BigUint::zero()))
        } else if p.is_one() {
            Some((BigUint::one(), BigUint::zero()))
        } else if p == BigUint::from(2u32) {
            Some((BigUint::one(), BigUint::one()))
        } else if (&p % &four).is_one() && is_prime(rng, &p, DEFAULT_MILLER_RABIN_ROUNDS) {
            two_squares_of_prime(&p)
        } else {
            None
        };
        if let Some((a, b)) = split {
            return Ok([x, y, a, b]);
        }
    }
    Err(ArithmeticError::DecompositionFailed(n.to_string()))
}

/// Splits a prime `p = 1 mod 4` into `a^2 + b^2`
fn two_squares_of_prime(p: &BigUint) -> Option<(BigUint, BigUint)> {
    let one = BigUint::one();
    let p_minus_1 = p - &one;
    let exp = &p_minus_1 >> 2;
    let half = &p_minus_1 >> 1;

    // Find a quadratic non-residue c, then t = c^((p-1)/4) satisfies t^2 = -1 mod p
    let mut c = BigUint::from(2u32);
    let t = loop {
        if &c >= p {
            return None;
        }
        if c.modpow(&half, p) == p_minus_1 {
            break c.modpow(&exp, p);
        }
        c += 1u32;
    };

    let (mut r0, mut r1) = (p.clone(), t);
    while &r1 * &r1 > *p {
        let r2 = r0.mod_floor(&r1);
        r0 = r1;
        r1 = r2;
    }
    let a = r1;
    let b_sq = p - &a * &a;
    let b = b_sq.sqrt();
    if &b * &b == b_sq {
        Some((a, b))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use proptest::prelude::*;

    #[test]
    fn small_and_edge_values() {
        let mut rng = StdRng::seed_from_u64(0u64);
        for n in 0u64..600 {
            let n = BigUint::from(n);
            let sq = four_squares(&mut rng, &n).unwrap();
            assert!(is_decomposition_of(&sq, &n));
        }
        // Needs all four squares
        let n = BigUint::from(7u32);
        let sq = four_squares(&mut rng, &n).unwrap();
        assert!(sq.iter().all(|s| !s.is_zero()));
    }

    #[test]
    fn two_squares() {
        for p in [5u32, 13, 17, 29, 37, 41, 1_000_000_009] {
            let p = BigUint::from(p);
            let (a, b) = two_squares_of_prime(&p).unwrap();
            assert_eq!(&a * &a + &b * &b, p);
        }
    }

    #[test]
    fn large_values() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let n = (BigUint::one() << 600) + BigUint::from(12345u32);
        let sq = four_squares(&mut rng, &n).unwrap();
        assert!(is_decomposition_of(&sq, &n));

        // Large power of 4 times 7
        let n = BigUint::from(7u32) << 400;
        let sq = four_squares(&mut rng, &n).unwrap();
        assert!(is_decomposition_of(&sq, &n));
    }

    proptest! {
        #[test]
        fn decomposes(n in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(n);
            let n = BigUint::from(n);
            let sq = four_squares(&mut rng, &n).unwrap();
            prop_assert!(is_decomposition_of(&sq, &n));
        }
    }
}
