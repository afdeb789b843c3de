//! Arbitrary precision modular arithmetic used by the CL signature scheme.
//!
//! All functions are pure and work on `num` big integers. Moduli are unsigned so negative moduli
//! cannot be expressed; values parsed from untrusted input go through [`modular::parse_modulus`].
//! Exponents can be negative, in which case the base is inverted first.
//!
//! The underlying big integer implementation is not constant time. Callers exponentiating with
//! secret exponents accept that timing leaks the exponent's bit length.

pub mod error;
pub mod four_squares;
pub mod modular;
pub mod primes;
pub mod random;

pub use num::{bigint::Sign, BigInt, BigUint, One, Signed, Zero};
