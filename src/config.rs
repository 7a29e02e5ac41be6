use std::collections::BTreeMap;
use std::env;
use thiserror::Error;

/// Default host suffix appended to the account identifier when no explicit
/// host override is configured.
pub const DEFAULT_HOST_SUFFIX: &str = "ingest.rowpipe.cloud";

const REQUIRED_VARS: &[&str] = &[
    "account",
    "private_key",
    "role",
    "user",
    "warehouse",
    "database",
    "schema",
    "table",
];

/// Ingestion settings supplied by the hosting environment. The core never
/// produces these values, it only consumes them when building the client
/// profile and the channel destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub account: String,
    pub private_key: String,
    pub role: String,
    pub user: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub table: String,
    /// Optional host override; defaults to `{account}.{DEFAULT_HOST_SUFFIX}`.
    pub host: Option<String>,
    pub debug: bool,
}

impl IngestConfig {
    /// Loads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: BTreeMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Loads the configuration from an explicit variable map (test seam).
    pub fn from_vars(vars: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        for name in REQUIRED_VARS {
            match vars.get(*name) {
                Some(value) if !value.trim().is_empty() => {}
                _ => return Err(ConfigError::MissingVar(name)),
            }
        }
        let get = |name: &str| vars.get(name).cloned().unwrap_or_default();
        Ok(Self {
            account: get("account"),
            private_key: get("private_key"),
            role: get("role"),
            user: get("user"),
            warehouse: get("warehouse"),
            database: get("database"),
            schema: get("schema"),
            table: get("table"),
            host: vars.get("host").cloned(),
            debug: read_debug_flag(vars.get("debug").map(String::as_str)),
        })
    }

    /// Connection properties handed to the transport when a client is built.
    pub fn client_profile(&self) -> ClientProfile {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => format!("{}.{}", self.account, DEFAULT_HOST_SUFFIX),
        };
        ClientProfile {
            scheme: "https".to_string(),
            host,
            port: 443,
            account: self.account.clone(),
            user: self.user.clone(),
            role: self.role.clone(),
            warehouse: self.warehouse.clone(),
            private_key: self.private_key.clone(),
        }
    }
}

fn read_debug_flag(value: Option<&str>) -> bool {
    match value {
        Some(value) => value.eq_ignore_ascii_case("true") || value == "1",
        None => false,
    }
}

/// Endpoint and credential material used to construct a remote client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientProfile {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub account: String,
    pub user: String,
    pub role: String,
    pub warehouse: String,
    pub private_key: String,
}

impl ClientProfile {
    /// Base URL for the streaming endpoints.
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Errors surfaced while reading the hosting environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required configuration variable '{0}' is missing or empty")]
    MissingVar(&'static str),
}
