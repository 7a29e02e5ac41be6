use std::fmt;

/// Offset token submitted alongside a row and echoed back by the remote
/// channel once the row is durably committed. Tokens are the string form of a
/// monotonically increasing integer, strictly increasing per channel lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffsetToken(String);

impl OffsetToken {
    /// Builds the token for a sequence id.
    pub fn from_sequence(id: u64) -> Self {
        Self(id.to_string())
    }

    /// Wraps a token observed on the wire.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OffsetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-channel sequence counter. `current` hands out the token for the next
/// submission; the caller advances the counter only after the commit of that
/// token has been confirmed durable. A failed confirmation therefore leaves
/// the counter unchanged and the next submission reuses the same token, which
/// the remote side may treat as a duplicate of the earlier attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetSequencer {
    current: u64,
}

impl Default for OffsetSequencer {
    fn default() -> Self {
        Self { current: 1 }
    }
}

impl OffsetSequencer {
    /// Creates a sequencer positioned at the first token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for the next submission. Calling this does not advance the
    /// counter.
    pub fn current(&self) -> OffsetToken {
        OffsetToken::from_sequence(self.current)
    }

    /// Numeric sequence id backing the current token.
    pub fn current_id(&self) -> u64 {
        self.current
    }

    /// Moves to the next token. Call only after the current token's commit
    /// was confirmed without error.
    pub fn advance(&mut self) {
        self.current = self.current.saturating_add(1);
    }

    /// Returns the counter to 1. Invoked whenever a fresh channel is opened,
    /// including after invalidation; the restart is observable remotely as a
    /// re-keying of the token sequence.
    pub fn reset(&mut self) {
        self.current = 1;
    }
}
