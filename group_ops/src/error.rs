use ark_serialize::SerializationError;
use bignum_arith::error::ArithmeticError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupError {
    /// Bytes do not decode to a point on the curve in the prime order subgroup
    #[error("invalid group element")]
    InvalidPoint,
    #[error("modulus must be an odd integer greater than 1")]
    InvalidModulus,
    #[error("integer is not an element of the multiplicative group")]
    ElementOutOfRange,
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),
    #[error("serialization error: {0}")]
    Serialization(SerializationError),
}

impl From<SerializationError> for GroupError {
    fn from(e: SerializationError) -> Self {
        match e {
            SerializationError::InvalidData | SerializationError::UnexpectedFlags => {
                Self::InvalidPoint
            }
            e => Self::Serialization(e),
        }
    }
}
