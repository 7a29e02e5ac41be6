use crate::config::IngestConfig;
use crate::row::Row;
use crate::sequence::OffsetToken;
use std::fmt;

/// Fixed channel name. Each compute instance builds its own client keyed by a
/// caller-chosen identity, so a constant channel name cannot collide across
/// instances.
pub const CHANNEL_NAME: &str = "ROWPIPE_CHANNEL";

/// Behaviour of the channel after a row is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnErrorPolicy {
    /// A rejected row leaves the channel open for subsequent submissions.
    Continue,
    /// A rejected row closes the channel.
    Abort,
}

/// Parameters for opening a channel against a fixed destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenChannelRequest {
    pub channel_name: String,
    pub database: String,
    pub schema: String,
    pub table: String,
    pub on_error: OnErrorPolicy,
}

impl OpenChannelRequest {
    /// Builds the request for the configured destination with the fixed
    /// channel name and continue-on-error policy.
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            channel_name: CHANNEL_NAME.to_string(),
            database: config.database.clone(),
            schema: config.schema.clone(),
            table: config.table.clone(),
            on_error: OnErrorPolicy::Continue,
        }
    }
}

/// Row-level rejection reported by the remote system for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row_index: usize,
    pub message: String,
}

/// Response to a row submission. A submission may be accepted while carrying
/// row-level errors; callers surface the first reported error's message and
/// discard the rest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppendOutcome {
    pub errors: Vec<RowError>,
}

impl AppendOutcome {
    /// Outcome with no row-level errors.
    pub fn accepted() -> Self {
        Self::default()
    }

    /// Outcome rejecting the row with a single message.
    pub fn rejected(row_index: usize, message: impl Into<String>) -> Self {
        Self {
            errors: vec![RowError {
                row_index,
                message: message.into(),
            }],
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn first_error(&self) -> Option<&RowError> {
        self.errors.first()
    }
}

/// Transport-level error returned when a remote call fails.
#[derive(Debug, Clone)]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// Builds remote clients keyed by a caller-chosen identity string.
pub trait ClientFactory {
    type Client: StreamClient;

    fn create(&self, identity: &str) -> Result<Self::Client, TransportError>;
}

/// A remote client connection. Closed clients cannot be reopened; the session
/// replaces them.
pub trait StreamClient {
    type Channel: StreamChannel;

    fn is_closed(&self) -> bool;

    fn open_channel(
        &mut self,
        request: OpenChannelRequest,
    ) -> Result<Self::Channel, TransportError>;
}

/// A channel bound to one destination table. A channel that turns invalid or
/// closed is replaced, never repaired in place.
pub trait StreamChannel {
    fn is_valid(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Submits one row under the given offset token.
    fn append_row(
        &mut self,
        row: &Row,
        offset: &OffsetToken,
    ) -> Result<AppendOutcome, TransportError>;

    /// Latest offset token the remote side has durably committed, if any.
    fn latest_committed_token(&mut self) -> Result<Option<OffsetToken>, TransportError>;
}
