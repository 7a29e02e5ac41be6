//! Remote client/channel abstraction and the blocking HTTP transport.

pub mod core;
pub mod transport;

pub use self::core::{
    AppendOutcome, ClientFactory, OnErrorPolicy, OpenChannelRequest, RowError, StreamChannel,
    StreamClient, TransportError, CHANNEL_NAME,
};
pub use transport::{HttpClientFactory, HttpStreamChannel, HttpStreamClient};
