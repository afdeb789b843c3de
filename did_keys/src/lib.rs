//! Key management for DIDs.
//!
//! - [`keys`]: Ed25519 key pairs, seed handling, DID and verkey encodings, signature verification.
//! - [`key_manager`]: the [`KeyManager`] storing key records per DID with two phase rotation
//!   (`start_rotation` then `apply_rotation`) that is atomic with respect to concurrent signing.
//! - [`pairwise`]: authenticated and anonymous message encryption between DID keys.
//! - [`wallet`]: the storage collaborator trait and an in-memory implementation.

pub mod error;
pub mod key_manager;
pub mod keys;
pub mod pairwise;
pub mod wallet;

pub use error::{KeyError, StateError, WalletError};
pub use key_manager::{KeyManager, KeyRecord};
pub use keys::{KeyInfo, KeyPair, MyDidInfo, TheirDid, TheirDidInfo};
pub use wallet::{InMemoryWallet, Tags, WalletRecord, WalletStore};
