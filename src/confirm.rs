use crate::client::core::StreamChannel;
use crate::error::IngestError;
use crate::sequence::OffsetToken;
use std::fmt;
use std::thread;
use std::time::Duration;

/// Retry ceiling for the commit poll. The wait is hard-bounded at
/// `MAX_COMMIT_RETRIES * POLL_INTERVAL`; there is no cancellation signal.
pub const MAX_COMMIT_RETRIES: usize = 20;

/// Fixed sleep between polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep seam for the poll loop. The system implementation blocks the calling
/// thread; tests inject a recording clock so retry semantics run without real
/// delay.
pub trait PollClock {
    fn sleep(&mut self, interval: Duration);
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPollClock;

impl PollClock for SystemPollClock {
    fn sleep(&mut self, interval: Duration) {
        thread::sleep(interval);
    }
}

/// Diagnostic produced when the expected token never showed up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTimeout {
    pub expected: OffsetToken,
    pub max_retries: usize,
    pub last_observed: Option<OffsetToken>,
    pub row_id: u64,
}

impl fmt::Display for CommitTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let observed = match &self.last_observed {
            Some(token) => token.as_str(),
            None => "none",
        };
        write!(
            f,
            "Failed to receive required OffsetToken:{} after MaxRetryCounts:{} ({}) at ID={}",
            self.expected, self.max_retries, observed, self.row_id
        )
    }
}

/// Counters recorded across confirmation attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmTelemetry {
    pub polls_total: u64,
    pub retries_total: u64,
    pub timeouts_total: u64,
}

impl ConfirmTelemetry {
    /// Renders the counters as exposition text.
    pub fn render(&self) -> String {
        format!(
            "rowpipe_commit_polls_total {}\nrowpipe_commit_retries_total {}\nrowpipe_commit_timeouts_total {}\n",
            self.polls_total, self.retries_total, self.timeouts_total
        )
    }
}

/// Blocks the caller until the channel reports the expected offset token as
/// durably committed, or until the retry ceiling is reached.
#[derive(Debug, Clone)]
pub struct CommitConfirmer<C: PollClock> {
    clock: C,
    max_retries: usize,
    interval: Duration,
    telemetry: ConfirmTelemetry,
}

impl CommitConfirmer<SystemPollClock> {
    /// Production confirmer with the fixed 1 s interval and 20-retry ceiling.
    pub fn system() -> Self {
        Self::new(SystemPollClock)
    }
}

impl<C: PollClock> CommitConfirmer<C> {
    pub fn new(clock: C) -> Self {
        Self::with_limits(clock, MAX_COMMIT_RETRIES, POLL_INTERVAL)
    }

    /// Confirmer with explicit limits, for callers that tune the ceiling.
    pub fn with_limits(clock: C, max_retries: usize, interval: Duration) -> Self {
        Self {
            clock,
            max_retries,
            interval,
            telemetry: ConfirmTelemetry::default(),
        }
    }

    pub fn telemetry(&self) -> &ConfirmTelemetry {
        &self.telemetry
    }

    /// Polls the channel's latest committed token. An immediate match returns
    /// without sleeping; otherwise each retry sleeps one interval before
    /// re-polling. After `max_retries` unmatched retries the diagnostic is
    /// returned with the last observed token.
    pub fn confirm<Ch: StreamChannel>(
        &mut self,
        channel: &mut Ch,
        expected: &OffsetToken,
        row_id: u64,
    ) -> Result<(), IngestError> {
        let mut observed = self.poll(channel)?;
        if observed.as_ref() == Some(expected) {
            return Ok(());
        }
        let mut retries = 0usize;
        while retries < self.max_retries {
            self.clock.sleep(self.interval);
            observed = self.poll(channel)?;
            retries += 1;
            self.telemetry.retries_total += 1;
            if observed.as_ref() == Some(expected) {
                return Ok(());
            }
        }
        self.telemetry.timeouts_total += 1;
        Err(IngestError::CommitTimeout(CommitTimeout {
            expected: expected.clone(),
            max_retries: self.max_retries,
            last_observed: observed,
            row_id,
        }))
    }

    fn poll<Ch: StreamChannel>(
        &mut self,
        channel: &mut Ch,
    ) -> Result<Option<OffsetToken>, IngestError> {
        self.telemetry.polls_total += 1;
        channel
            .latest_committed_token()
            .map_err(|err| IngestError::Unexpected(format!("offset poll failed: {err}")))
    }
}
