use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FheError {
    #[error("input proof rejected for handle {0}")]
    InvalidProof(String),

    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(String),

    #[error("decryption not authorized: {0}")]
    Unauthorized(String),

    #[error("{0} is not supported by this service")]
    Unsupported(&'static str),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("ciphertext storage error: {0}")]
    Storage(String),
}
