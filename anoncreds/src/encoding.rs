//! Deterministic encoding of raw attribute values to the integers that are signed.
//!
//! A raw value that is a 32-bit signed integer in canonical decimal form encodes to itself so that
//! predicates compare the actual number. Anything else encodes to its SHA-256 digest read as a
//! big-endian integer.

use digest::Digest;
use num::{BigInt, BigUint};
use sha2::Sha256;

pub fn encode_attribute(raw: &str) -> String {
    match raw.parse::<i32>() {
        Ok(i) if i.to_string() == raw => raw.to_string(),
        _ => BigUint::from_bytes_be(&Sha256::digest(raw.as_bytes())).to_string(),
    }
}

/// Whether `encoded` is the encoding of `raw`
pub fn is_encoding_of(raw: &str, encoded: &str) -> bool {
    encode_attribute(raw) == encoded
}

/// Parse an encoded value into the signed message it stands for
pub fn encoded_to_message(encoded: &str) -> Option<BigInt> {
    encoded.parse::<BigInt>().ok()
}

/// Normalized attribute name used when matching requested names to schema names
pub fn attr_common_view(name: &str) -> String {
    name.replace(' ', "").to_lowercase()
}
