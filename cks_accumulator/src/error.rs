use ark_serialize::SerializationError;
use group_ops::error::GroupError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RevocationError {
    #[error("credential {0} is not currently issued, it cannot be revoked")]
    AlreadyRevoked(u32),
    #[error("credential {0} is not revoked")]
    NotRevoked(u32),
    /// The previous accumulator of a delta is not the accumulator it is being applied to
    #[error("deltas do not chain: previous accumulator mismatch")]
    DeltaChainMismatch,
    #[error("all {0} indices of the registry are used")]
    RegistryFull(u32),
    #[error("index {0} is outside the registry")]
    InvalidIndex(u32),
    #[error("tail {0} is not available")]
    TailNotFound(u32),
    #[error("cancelled")]
    Cancelled,
    #[error("delta at {delta} is older than the revocation state at {state}")]
    WitnessUpdateFromFuture { state: u64, delta: u64 },
    #[error("scalar is not invertible")]
    NotInvertible,
    #[error("non-revocation signature does not verify")]
    InvalidNonRevocationSignature,
    #[error("timestamp {timestamp} is not after the last published one {last}")]
    NonIncreasingTimestamp { last: u64, timestamp: u64 },
    #[error("no ledger entry for {0}")]
    LedgerEntryNotFound(String),
    #[error(transparent)]
    Group(#[from] GroupError),
}

impl From<SerializationError> for RevocationError {
    fn from(e: SerializationError) -> Self {
        Self::Group(e.into())
    }
}
