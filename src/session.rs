use crate::client::core::{ClientFactory, OpenChannelRequest, StreamChannel, StreamClient};
use crate::error::IngestError;
use crate::sequence::OffsetSequencer;

/// Per-instance connection state: a lazily-created client/channel pair and the
/// offset sequencer bound to the current channel. One session per compute
/// instance, invoked sequentially; the session is passed by reference into
/// each operation instead of living as process-wide static state.
pub struct IngestSession<F: ClientFactory> {
    factory: F,
    identity: String,
    open_request: OpenChannelRequest,
    client: Option<F::Client>,
    channel: Option<<F::Client as StreamClient>::Channel>,
    sequencer: OffsetSequencer,
}

impl<F: ClientFactory> IngestSession<F> {
    /// Creates an empty session. Nothing is connected until `ensure_ready`.
    pub fn new(factory: F, identity: impl Into<String>, open_request: OpenChannelRequest) -> Self {
        Self {
            factory,
            identity: identity.into(),
            open_request,
            client: None,
            channel: None,
            sequencer: OffsetSequencer::new(),
        }
    }

    /// Identity string the client is keyed by. Caller-chosen so that
    /// concurrently running instances never collide.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn sequencer(&self) -> &OffsetSequencer {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut OffsetSequencer {
        &mut self.sequencer
    }

    /// True when a channel handle exists, without checking remote validity.
    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Runs the validity checks that must pass immediately before every row
    /// submission. A missing or closed client is recreated, which also drops
    /// the channel; a missing, invalid, or closed channel is reopened, which
    /// resets the sequencer to 1. A valid open pair is reused untouched.
    pub fn ensure_ready(&mut self) -> Result<(), IngestError> {
        let client_stale = match &self.client {
            Some(client) => client.is_closed(),
            None => true,
        };
        if client_stale {
            let client = self
                .factory
                .create(&self.identity)
                .map_err(|err| IngestError::Initialization(err.to_string()))?;
            self.client = Some(client);
            self.channel = None;
        }
        let channel_stale = match &self.channel {
            Some(channel) => !channel.is_valid() || channel.is_closed(),
            None => true,
        };
        if channel_stale {
            let client = match self.client.as_mut() {
                Some(client) => client,
                None => {
                    return Err(IngestError::Initialization(
                        "client unavailable after creation".to_string(),
                    ))
                }
            };
            let channel = client
                .open_channel(self.open_request.clone())
                .map_err(|err| IngestError::Initialization(err.to_string()))?;
            self.channel = Some(channel);
            self.sequencer.reset();
        }
        Ok(())
    }

    /// Splits the session into the live channel and its sequencer. Returns
    /// `None` before a successful `ensure_ready`.
    pub fn parts_mut(
        &mut self,
    ) -> Option<(
        &mut <F::Client as StreamClient>::Channel,
        &mut OffsetSequencer,
    )> {
        match self.channel.as_mut() {
            Some(channel) => Some((channel, &mut self.sequencer)),
            None => None,
        }
    }

    /// Drops the channel handle so the next `ensure_ready` reopens it.
    pub fn invalidate_channel(&mut self) {
        self.channel = None;
    }
}
