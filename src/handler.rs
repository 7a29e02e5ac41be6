use crate::client::core::{ClientFactory, StreamChannel, CHANNEL_NAME};
use crate::confirm::{CommitConfirmer, CommitTimeout, PollClock};
use crate::error::{IngestError, INIT_DIAGNOSTIC};
use crate::logging::{IngestLogger, LogLevel, LogRotationPolicy};
use crate::row::{Event, RowAssembler};
use crate::sequence::OffsetToken;
use crate::session::IngestSession;
use std::time::{SystemTime, UNIX_EPOCH};

/// Whether one event becomes one row or one row per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    Single,
    Multi,
}

/// Structured result of one ingestion attempt. Callers branch on the variant;
/// `status` renders the invocation-boundary string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// All rows were submitted and the last token was confirmed durable.
    Committed { token: OffsetToken, rows: usize },
    /// The client/channel pair could not be built; nothing was submitted.
    Initialization { detail: String },
    /// A row was rejected; carries the first reported error message.
    Validation { message: String },
    /// The expected token never appeared within the retry ceiling.
    CommitTimeout(CommitTimeout),
    /// Any other failure during assembly, submission, or confirmation.
    Unexpected { message: String },
}

impl IngestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, IngestOutcome::Committed { .. })
    }

    /// Invocation-boundary status string: exactly `200 OK` on success,
    /// `500 <message>` on any failure. Initialization failures surface the
    /// fixed diagnostic; the underlying cause stays in the log.
    pub fn status(&self) -> String {
        match self {
            IngestOutcome::Committed { .. } => "200 OK".to_string(),
            IngestOutcome::Initialization { .. } => format!("500 {INIT_DIAGNOSTIC}"),
            IngestOutcome::Validation { message } => format!("500 {message}"),
            IngestOutcome::CommitTimeout(timeout) => format!("500 {timeout}"),
            IngestOutcome::Unexpected { message } => format!("500 {message}"),
        }
    }
}

/// Orchestrates one invocation: ensure the connection, assemble rows, submit
/// each row under the sequencer's current token, confirm the last token, and
/// advance the sequencer only on confirmed success.
#[derive(Debug)]
pub struct IngestHandler<C: PollClock> {
    assembler: RowAssembler,
    confirmer: CommitConfirmer<C>,
    logger: IngestLogger,
    debug: bool,
}

impl<C: PollClock> IngestHandler<C> {
    pub fn new(assembler: RowAssembler, confirmer: CommitConfirmer<C>, debug: bool) -> Self {
        let mut logger = IngestLogger::new(LogRotationPolicy::default());
        if debug {
            logger.set_level(LogLevel::Debug);
        }
        Self {
            assembler,
            confirmer,
            logger,
            debug,
        }
    }

    pub fn logger(&self) -> &IngestLogger {
        &self.logger
    }

    pub fn confirmer(&self) -> &CommitConfirmer<C> {
        &self.confirmer
    }

    /// Single mode: the whole event becomes one row.
    pub fn ingest_single<F: ClientFactory>(
        &mut self,
        session: &mut IngestSession<F>,
        event: &Event,
    ) -> IngestOutcome {
        self.ingest(session, event, IngestMode::Single)
    }

    /// Multi mode: one row per event key, all submitted under one token. Only
    /// that token is confirmed, so the durability statement covers the batch
    /// as a whole rather than each row individually.
    pub fn ingest_multi<F: ClientFactory>(
        &mut self,
        session: &mut IngestSession<F>,
        event: &Event,
    ) -> IngestOutcome {
        self.ingest(session, event, IngestMode::Multi)
    }

    fn ingest<F: ClientFactory>(
        &mut self,
        session: &mut IngestSession<F>,
        event: &Event,
        mode: IngestMode,
    ) -> IngestOutcome {
        if let Err(err) = session.ensure_ready() {
            let detail = err.to_string();
            self.record(LogLevel::Error, 0, &detail);
            return IngestOutcome::Initialization { detail };
        }
        let row_id = session.sequencer().current_id();
        if self.debug {
            if let Ok(payload) = serde_json::to_string(event) {
                self.record(LogLevel::Debug, row_id, &format!("EVENT: {payload}"));
            }
        }
        let rows = match mode {
            IngestMode::Single => self.assembler.assemble_single(event),
            IngestMode::Multi => self.assembler.assemble_multi(event),
        };
        let rows = match rows {
            Ok(rows) => rows,
            Err(err) => {
                let message = err.to_string();
                self.record(LogLevel::Error, row_id, &message);
                return IngestOutcome::Unexpected { message };
            }
        };
        if rows.is_empty() {
            let message = "event produced no rows".to_string();
            self.record(LogLevel::Error, row_id, &message);
            return IngestOutcome::Unexpected { message };
        }
        let (channel, sequencer) = match session.parts_mut() {
            Some(parts) => parts,
            None => {
                return IngestOutcome::Initialization {
                    detail: "channel unavailable after initialization".to_string(),
                }
            }
        };
        let token = sequencer.current();
        for row in &rows {
            let outcome = match channel.append_row(row, &token) {
                Ok(outcome) => outcome,
                Err(err) => {
                    let message = format!("row submission failed: {err}");
                    self.record(LogLevel::Error, row_id, &message);
                    return IngestOutcome::Unexpected { message };
                }
            };
            if let Some(first) = outcome.first_error() {
                let message = first.message.clone();
                self.record(LogLevel::Error, row_id, &message);
                return IngestOutcome::Validation { message };
            }
        }
        match self.confirmer.confirm(channel, &token, row_id) {
            Ok(()) => {
                sequencer.advance();
                self.record(
                    LogLevel::Info,
                    row_id,
                    &format!("committed {} row(s) at offset {token}", rows.len()),
                );
                IngestOutcome::Committed {
                    token,
                    rows: rows.len(),
                }
            }
            Err(IngestError::CommitTimeout(timeout)) => {
                self.record(LogLevel::Error, row_id, &timeout.to_string());
                IngestOutcome::CommitTimeout(timeout)
            }
            Err(err) => {
                let message = err.to_string();
                self.record(LogLevel::Error, row_id, &message);
                IngestOutcome::Unexpected { message }
            }
        }
    }

    fn record(&mut self, level: LogLevel, offset_id: u64, message: &str) {
        // Log failures are not surfaced on the ingest path.
        let _ = self
            .logger
            .log(now_ms(), level, "handler", CHANNEL_NAME, offset_id, message);
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis().min(u128::from(u64::MAX)) as u64)
        .unwrap_or(0)
}
