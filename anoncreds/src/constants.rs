//! Bit lengths of the CL signature scheme. The blinding of a value in a proof is chosen `80`
//! bits longer than the largest product `challenge * value` it has to hide.

/// Master secret
pub const LARGE_MASTER_SECRET: u64 = 256;
/// Each of the two safe primes of the RSA modulus
pub const LARGE_PRIME: u64 = 1024;
/// Signature prime `e` lies in `[2^LARGE_E_START, 2^LARGE_E_START + 2^LARGE_E_END_RANGE)`
pub const LARGE_E_START: u64 = 596;
pub const LARGE_E_END_RANGE: u64 = 119;
/// Holder's blinding `v'` of the master secret commitment
pub const LARGE_VPRIME: u64 = 2128;
/// Issuer's part `v''` of the signature's `v`
pub const LARGE_VPRIME_PRIME: u64 = 2724;
pub const LARGE_MVECT: u64 = 592;
pub const LARGE_ETILDE: u64 = 456;
pub const LARGE_VTILDE: u64 = 3060;
pub const LARGE_UTILDE: u64 = 592;
pub const LARGE_RTILDE: u64 = 672;
pub const LARGE_ALPHATILDE: u64 = 2787;
pub const LARGE_NONCE: u64 = 80;
/// Blinding of `v'` in the blinded secrets correctness proof
pub const LARGE_VPRIME_TILDE: u64 = LARGE_VPRIME + 256 + LARGE_NONCE;

pub const MAX_ATTRIBUTES: usize = 125;

/// Name under which the master secret is a hidden attribute of every credential
pub const MASTER_SECRET: &str = "master_secret";

/// Number of squares in a range proof decomposition
pub const ITERATION: usize = 4;
