use crate::confirm::CommitTimeout;
use thiserror::Error;

/// Fixed diagnostic surfaced when the client/channel pair cannot be built.
/// The underlying cause goes to the log, not to the invocation boundary.
pub const INIT_DIAGNOSTIC: &str =
    "Unable to initialize streaming client, check ingest configuration";

/// Failure taxonomy for one ingestion attempt. Every variant is caught at the
/// orchestration boundary and rendered into the textual status; nothing
/// propagates to the caller as a panic.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Client or channel construction failed; no submission was attempted.
    #[error("{0}")]
    Initialization(String),
    /// The remote system rejected a row; carries the first reported message.
    #[error("{0}")]
    Validation(String),
    /// The expected offset token was not observed within the retry ceiling.
    #[error("{0}")]
    CommitTimeout(CommitTimeout),
    /// Any other failure during submission or confirmation.
    #[error("{0}")]
    Unexpected(String),
}
