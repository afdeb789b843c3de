#[macro_use]
pub mod macros;
pub mod challenge;
pub mod ecies;
pub mod hashing_utils;
pub mod serde_utils;
