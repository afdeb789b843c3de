pub mod primes;
pub mod serialization;

pub use serde_json;
pub use rmp_serde;
pub use ark_serialize;
