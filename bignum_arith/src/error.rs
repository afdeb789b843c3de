use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("element is not invertible modulo the given modulus")]
    NotInvertible,
    #[error("modulus must be positive")]
    NegativeModulus,
    #[error("modulus must be non-zero")]
    ZeroModulus,
    #[error("empty range, lower bound must be below upper bound")]
    EmptyRange,
    #[error("no prime found after {0} candidates")]
    PrimeSearchExhausted(usize),
    #[error("invalid decimal integer: {0}")]
    InvalidDecimal(String),
    #[error("four squares decomposition failed for {0}")]
    DecompositionFailed(String),
}
