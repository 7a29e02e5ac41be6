//! Durable event-to-row ingestion into a remote append-only streaming
//! channel. Each invocation assembles rows from one inbound event, submits
//! them under a strictly increasing offset token, and blocks until the remote
//! side confirms the token durable (or the bounded retry poll gives up).

pub mod app;
pub mod client;
pub mod config;
pub mod confirm;
pub mod error;
pub mod handler;
pub mod logging;
pub mod row;
pub mod sequence;
pub mod session;

pub use client::{
    AppendOutcome, ClientFactory, HttpClientFactory, HttpStreamChannel, HttpStreamClient,
    OnErrorPolicy, OpenChannelRequest, RowError, StreamChannel, StreamClient, TransportError,
    CHANNEL_NAME,
};
pub use config::{ClientProfile, ConfigError, IngestConfig, DEFAULT_HOST_SUFFIX};
pub use confirm::{
    CommitConfirmer, CommitTimeout, ConfirmTelemetry, PollClock, SystemPollClock,
    MAX_COMMIT_RETRIES, POLL_INTERVAL,
};
pub use error::{IngestError, INIT_DIAGNOSTIC};
pub use handler::{IngestHandler, IngestMode, IngestOutcome};
pub use logging::{IngestLogger, LogLevel, LogRotationPolicy, LogSegment, LoggingError};
pub use row::{AssembleError, Event, Row, RowAssembler, EVENT_CONTAINER_TAG};
pub use sequence::{OffsetSequencer, OffsetToken};
pub use session::IngestSession;
