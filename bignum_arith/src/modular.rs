use crate::error::ArithmeticError;
use core::mem;
use num::{bigint::Sign, BigInt, BigUint, Integer, One, Signed, Zero};

fn check_modulus(n: &BigUint) -> Result<(), ArithmeticError> {
    if n.is_zero() {
        return Err(ArithmeticError::ZeroModulus);
    }
    Ok(())
}

/// Parse a decimal modulus received from outside, rejecting zero and negative values.
pub fn parse_modulus(s: &str) -> Result<BigUint, ArithmeticError> {
    let n = s
        .parse::<BigInt>()
        .map_err(|_| ArithmeticError::InvalidDecimal(s.to_string()))?;
    match n.sign() {
        Sign::Minus => Err(ArithmeticError::NegativeModulus),
        Sign::NoSign => Err(ArithmeticError::ZeroModulus),
        Sign::Plus => Ok(n.magnitude().clone()),
    }
}

pub fn parse_biguint(s: &str) -> Result<BigUint, ArithmeticError> {
    s.parse::<BigUint>()
        .map_err(|_| ArithmeticError::InvalidDecimal(s.to_string()))
}

/// Least non-negative residue of a signed integer.
pub fn reduce(a: &BigInt, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    check_modulus(n)?;
    let n = BigInt::from(n.clone());
    let r = a.mod_floor(&n);
    // mod_floor with a positive modulus is never negative
    Ok(r.magnitude().clone())
}

pub fn mod_add(a: &BigUint, b: &BigUint, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    check_modulus(n)?;
    Ok((a + b) % n)
}

pub fn mod_sub(a: &BigUint, b: &BigUint, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    check_modulus(n)?;
    let a = a % n;
    let b = b % n;
    if a >= b {
        Ok(a - b)
    } else {
        Ok(n - (b - a))
    }
}

pub fn mod_mul(a: &BigUint, b: &BigUint, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    check_modulus(n)?;
    Ok((a * b) % n)
}

pub fn mod_neg(a: &BigUint, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    mod_sub(&BigUint::zero(), a, n)
}

/// Inverse of `a` modulo `n` using the extended Euclidean algorithm.
pub fn mod_inverse(a: &BigUint, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    check_modulus(n)?;
    let (mut old_r, mut r) = (BigInt::from(a % n), BigInt::from(n.clone()));
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    while !r.is_zero() {
        let q = &old_r / &r;
        let new_r = &old_r - &q * &r;
        old_r = mem::replace(&mut r, new_r);
        let new_s = &old_s - &q * &s;
        old_s = mem::replace(&mut s, new_s);
    }
    if !old_r.is_one() || n.is_one() {
        return Err(ArithmeticError::NotInvertible);
    }
    reduce(&old_s, n)
}

/// `a / b mod n`, i.e. `a * b^-1 mod n`
pub fn mod_div(a: &BigUint, b: &BigUint, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    let b_inv = mod_inverse(b, n)?;
    mod_mul(a, &b_inv, n)
}

/// `base^exp mod n` for a signed exponent. A negative exponent raises the inverse of `base`.
pub fn mod_pow(base: &BigUint, exp: &BigInt, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    check_modulus(n)?;
    if exp.is_negative() {
        let inv = mod_inverse(base, n)?;
        Ok(inv.modpow(exp.magnitude(), n))
    } else {
        Ok(base.modpow(exp.magnitude(), n))
    }
}

/// `base^exp mod n` for an unsigned exponent
pub fn mod_pow_u(base: &BigUint, exp: &BigUint, n: &BigUint) -> Result<BigUint, ArithmeticError> {
    check_modulus(n)?;
    Ok(base.modpow(exp, n))
}

/// Product of `bases[i]^exps[i] mod n`
pub fn multi_mod_pow<'a, I>(pairs: I, n: &BigUint) -> Result<BigUint, ArithmeticError>
where
    I: IntoIterator<Item = (&'a BigUint, &'a BigInt)>,
{
    check_modulus(n)?;
    let mut acc = BigUint::one() % n;
    for (base, exp) in pairs {
        acc = (acc * mod_pow(base, exp, n)?) % n;
    }
    Ok(acc)
}

pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    a.gcd(b)
}
