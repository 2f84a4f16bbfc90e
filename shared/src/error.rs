use thiserror::Error;

/// Low-level errors surfaced by hashing and canonical serialization.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),
}

pub type Result<T> = std::result::Result<T, HashError>;
