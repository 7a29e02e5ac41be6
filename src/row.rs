use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use thiserror::Error;

/// Inbound event payload: string keys mapped to string values. Values may
/// themselves be serialized structured data; multi-row assembly re-parses
/// them. The ordered map makes multi-row submission order deterministic.
pub type Event = BTreeMap<String, String>;

/// `EVENT_TYPE` tag used when a whole event becomes one row.
pub const EVENT_CONTAINER_TAG: &str = "event_map";

/// One row under the fixed destination schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    #[serde(rename = "ENV")]
    pub env: String,
    #[serde(rename = "CONTEXT")]
    pub context: String,
    #[serde(rename = "EVENT")]
    pub event: String,
    #[serde(rename = "EVENT_TYPE")]
    pub event_type: String,
}

/// Converts one inbound event into row records. Pure and stateless apart from
/// the environment snapshot captured at construction; `ENV` and `CONTEXT` are
/// both filled from that same snapshot, matching the upstream table contract.
#[derive(Debug, Clone)]
pub struct RowAssembler {
    env_snapshot: String,
}

impl RowAssembler {
    /// Captures the current process environment as the snapshot.
    pub fn from_process_env() -> Result<Self, AssembleError> {
        let vars: BTreeMap<String, String> = env::vars().collect();
        Self::with_snapshot(&vars)
    }

    /// Builds an assembler over an explicit variable map (test seam).
    pub fn with_snapshot(vars: &BTreeMap<String, String>) -> Result<Self, AssembleError> {
        let env_snapshot = serde_json::to_string(vars).map_err(AssembleError::Serialize)?;
        Ok(Self { env_snapshot })
    }

    /// Serialized snapshot written into `ENV` and `CONTEXT`.
    pub fn env_snapshot(&self) -> &str {
        &self.env_snapshot
    }

    /// Single mode: exactly one row per event, regardless of event size.
    /// `EVENT` holds the full serialized event.
    pub fn assemble_single(&self, event: &Event) -> Result<Vec<Row>, AssembleError> {
        let serialized = serde_json::to_string(event).map_err(AssembleError::Serialize)?;
        Ok(vec![Row {
            env: self.env_snapshot.clone(),
            context: self.env_snapshot.clone(),
            event: serialized,
            event_type: EVENT_CONTAINER_TAG.to_string(),
        }])
    }

    /// Multi mode: one row per event key, in key order. Each value must parse
    /// as JSON; the normalized form is stored in `EVENT` and the source key
    /// becomes `EVENT_TYPE`.
    pub fn assemble_multi(&self, event: &Event) -> Result<Vec<Row>, AssembleError> {
        let mut rows = Vec::with_capacity(event.len());
        for (key, value) in event {
            let parsed: serde_json::Value =
                serde_json::from_str(value).map_err(|source| AssembleError::InvalidValue {
                    key: key.clone(),
                    source,
                })?;
            let normalized = serde_json::to_string(&parsed).map_err(AssembleError::Serialize)?;
            rows.push(Row {
                env: self.env_snapshot.clone(),
                context: self.env_snapshot.clone(),
                event: normalized,
                event_type: key.clone(),
            });
        }
        Ok(rows)
    }
}

/// Errors surfaced while converting events into rows.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("failed to serialize event payload: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("value for key '{key}' is not valid JSON: {source}")]
    InvalidValue {
        key: String,
        source: serde_json::Error,
    },
}
