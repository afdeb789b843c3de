use ssi_crypto_utils::ecies::EciesError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet item not found: {0}:{1}")]
    ItemNotFound(String, String),
    #[error("wallet item already exists: {0}:{1}")]
    AlreadyExists(String, String),
    #[error("cannot (de)serialize wallet record: {0}")]
    Serialization(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("no key rotation in progress for {0}")]
    NoRotationInProgress(String),
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("invalid seed: {0}")]
    InvalidSeed(String),
    #[error("invalid DID: {0}")]
    InvalidDid(String),
    #[error("invalid verkey: {0}")]
    InvalidVerkey(String),
    #[error("invalid signature encoding")]
    InvalidSignature,
    #[error("unknown crypto type: {0}")]
    UnknownCryptoType(String),
    #[error("message cannot be decrypted: {0}")]
    DecryptionFailed(String),
    #[error("message cannot be encrypted: {0}")]
    EncryptionFailed(String),
}

impl From<EciesError> for KeyError {
    fn from(e: EciesError) -> Self {
        match e {
            EciesError::Decryption => Self::DecryptionFailed(e.to_string()),
            e => Self::EncryptionFailed(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
