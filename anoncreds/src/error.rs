use bignum_arith::error::ArithmeticError;
use cks_accumulator::error::RevocationError;
use did_keys::WalletError;
use group_ops::error::GroupError;
use thiserror::Error;

/// Errors of credential definition, issuance and credential processing
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// Credential values or key do not cover exactly the attributes of the schema
    #[error("attributes do not match the schema: {0}")]
    SchemaMismatch(String),
    #[error("encoded value of attribute {0} is not the encoding of its raw value")]
    EncodingMismatch(String),
    #[error("invalid blinded secrets correctness proof")]
    InvalidBlindedSecretProof,
    #[error("invalid key correctness proof")]
    InvalidKeyCorrectnessProof,
    #[error("invalid signature correctness proof")]
    InvalidSignatureCorrectnessProof,
    #[error("credential signature does not verify")]
    InvalidSignature,
    #[error("credential definition {0} does not support revocation")]
    RevocationNotSupported(String),
    #[error("no rotation in progress for credential definition {0}")]
    NoRotationInProgress(String),
    #[error("missing value: {0}")]
    MissingValue(String),
    #[error("offer and request are for different credential definitions")]
    CredentialDefinitionMismatch,
    #[error("unknown credential definition {0}")]
    UnknownCredentialDefinition(String),
    #[error("unknown revocation registry {0}")]
    UnknownRevocationRegistry(String),
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Revocation(#[from] RevocationError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Errors of proof creation and of malformed input to verification. A proof that does not
/// verify is not an error.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("malformed proof or request: {0}")]
    MalformedRequest(String),
    #[error("credential does not satisfy predicate {0}")]
    PredicateNotSatisfied(String),
    #[error("credential {0} not found")]
    MissingCredential(String),
    #[error("no revocation state for {0}")]
    MissingRevocationState(String),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Revocation(#[from] RevocationError),
}

impl From<ark_serialize::SerializationError> for ProofError {
    fn from(e: ark_serialize::SerializationError) -> Self {
        Self::Group(e.into())
    }
}
