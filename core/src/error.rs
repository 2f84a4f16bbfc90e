use shared::HashError;
use thiserror::Error;

/// Error taxonomy at the core boundary (see spec §7).
///
/// `TransientPeerFailure` is produced by the replication layer, which lives
/// in the root binary, not here — it is included in this enum so the
/// transport adapter has one error type to translate into a response, but
/// `ledger_core` itself never constructs that variant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// Missing/malformed input or a violated pre-condition. No state change.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// An inbound block or chain failed validation, or was not strictly
    /// longer than the local chain. No state change.
    #[error("integrity rejection: {0}")]
    IntegrityRejection(String),

    /// Outbound gossip/pull I/O error or non-2xx peer response.
    #[error("transient peer failure: {0}")]
    TransientPeerFailure(String),

    /// A programmer error: serialization failure during append, or similar.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<HashError> for AppError {
    fn from(err: HashError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization failure: {err}"))
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
