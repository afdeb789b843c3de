//! Group operations backing the credential schemes.
//!
//! - [`rsa_group`]: the multiplicative group modulo an RSA modulus `n = pq` built from two safe
//!   primes. CL signatures live in its subgroup of quadratic residues.
//! - [`pairing_group`]: helpers over a pairing friendly curve `E` used by the revocation
//!   accumulator. Decoding from bytes always checks curve and subgroup membership.

pub mod error;
pub mod pairing_group;
pub mod rsa_group;
