use crate::client::core::{
    AppendOutcome, ClientFactory, OnErrorPolicy, OpenChannelRequest, RowError, StreamChannel,
    StreamClient, TransportError,
};
use crate::config::ClientProfile;
use crate::row::Row;
use crate::sequence::OffsetToken;
use base64::{engine::general_purpose, Engine as _};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

const CHANNELS_PATH: &str = "/v1/streaming/channels";

/// Builds blocking HTTP clients against the configured streaming endpoint.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    profile: ClientProfile,
}

impl HttpClientFactory {
    pub fn new(profile: ClientProfile) -> Result<Self, TransportError> {
        if profile.host.trim().is_empty() {
            return Err(TransportError::new("streaming host must not be empty"));
        }
        Ok(Self { profile })
    }
}

impl ClientFactory for HttpClientFactory {
    type Client = HttpStreamClient;

    fn create(&self, identity: &str) -> Result<Self::Client, TransportError> {
        if identity.trim().is_empty() {
            return Err(TransportError::new("client identity must not be empty"));
        }
        let http = Client::builder()
            .build()
            .map_err(|err| TransportError::new(format!("http client build failed: {err}")))?;
        Ok(HttpStreamClient {
            http,
            endpoint: self.profile.endpoint(),
            profile: self.profile.clone(),
            identity: identity.to_string(),
            closed: false,
        })
    }
}

/// Blocking HTTP connection to the streaming service. Credentials are sent
/// once, when a channel is opened; subsequent calls carry the channel token
/// issued by the server.
#[derive(Debug, Clone)]
pub struct HttpStreamClient {
    http: Client,
    endpoint: String,
    profile: ClientProfile,
    identity: String,
    closed: bool,
}

impl StreamClient for HttpStreamClient {
    type Channel = HttpStreamChannel;

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn open_channel(
        &mut self,
        request: OpenChannelRequest,
    ) -> Result<Self::Channel, TransportError> {
        let url = format!("{}{}", self.endpoint.trim_end_matches('/'), CHANNELS_PATH);
        let wire = WireOpenChannelRequest::new(&self.profile, &self.identity, &request);
        let response = self
            .http
            .post(url)
            .json(&wire)
            .send()
            .map_err(|err| TransportError::new(format!("open channel failed: {err}")))?;
        if !response.status().is_success() {
            return Err(TransportError::new(format!(
                "open channel returned status {}",
                response.status()
            )));
        }
        let body: WireOpenChannelResponse = response
            .json()
            .map_err(|err| TransportError::new(format!("open channel decode failed: {err}")))?;
        Ok(HttpStreamChannel {
            http: self.http.clone(),
            endpoint: self.endpoint.clone(),
            channel_name: request.channel_name,
            channel_token: body.channel_token,
            valid: true,
            closed: false,
        })
    }
}

/// Server-side handle for one open channel.
#[derive(Debug, Clone)]
pub struct HttpStreamChannel {
    http: Client,
    endpoint: String,
    channel_name: String,
    channel_token: String,
    valid: bool,
    closed: bool,
}

impl HttpStreamChannel {
    fn rows_url(&self) -> String {
        format!(
            "{}{}/{}/rows",
            self.endpoint.trim_end_matches('/'),
            CHANNELS_PATH,
            self.channel_name
        )
    }

    fn offset_url(&self) -> String {
        format!(
            "{}{}/{}/offset",
            self.endpoint.trim_end_matches('/'),
            CHANNELS_PATH,
            self.channel_name
        )
    }
}

impl StreamChannel for HttpStreamChannel {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn append_row(
        &mut self,
        row: &Row,
        offset: &OffsetToken,
    ) -> Result<AppendOutcome, TransportError> {
        let wire = WireAppendRequest {
            channel_token: self.channel_token.clone(),
            offset_token: offset.as_str().to_string(),
            row: row.clone(),
        };
        let response = self
            .http
            .post(self.rows_url())
            .json(&wire)
            .send()
            .map_err(|err| TransportError::new(format!("append row failed: {err}")))?;
        if !response.status().is_success() {
            return Err(TransportError::new(format!(
                "append row returned status {}",
                response.status()
            )));
        }
        let body: WireAppendResponse = response
            .json()
            .map_err(|err| TransportError::new(format!("append row decode failed: {err}")))?;
        self.valid = body.channel_valid;
        self.closed = body.channel_closed;
        Ok(AppendOutcome {
            errors: body.errors.into_iter().map(RowError::from).collect(),
        })
    }

    fn latest_committed_token(&mut self) -> Result<Option<OffsetToken>, TransportError> {
        let response = self
            .http
            .get(self.offset_url())
            .query(&[("channel_token", self.channel_token.as_str())])
            .send()
            .map_err(|err| TransportError::new(format!("offset poll failed: {err}")))?;
        if !response.status().is_success() {
            return Err(TransportError::new(format!(
                "offset poll returned status {}",
                response.status()
            )));
        }
        let body: WireOffsetResponse = response
            .json()
            .map_err(|err| TransportError::new(format!("offset poll decode failed: {err}")))?;
        Ok(body.committed_offset_token.map(OffsetToken::from_raw))
    }
}

#[derive(Debug, Serialize)]
struct WireOpenChannelRequest {
    identity: String,
    channel_name: String,
    database: String,
    schema: String,
    table: String,
    on_error: &'static str,
    account: String,
    user: String,
    role: String,
    warehouse: String,
    private_key_b64: String,
}

impl WireOpenChannelRequest {
    fn new(profile: &ClientProfile, identity: &str, request: &OpenChannelRequest) -> Self {
        Self {
            identity: identity.to_string(),
            channel_name: request.channel_name.clone(),
            database: request.database.clone(),
            schema: request.schema.clone(),
            table: request.table.clone(),
            on_error: match request.on_error {
                OnErrorPolicy::Continue => "CONTINUE",
                OnErrorPolicy::Abort => "ABORT",
            },
            account: profile.account.clone(),
            user: profile.user.clone(),
            role: profile.role.clone(),
            warehouse: profile.warehouse.clone(),
            private_key_b64: general_purpose::STANDARD.encode(profile.private_key.as_bytes()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireOpenChannelResponse {
    channel_token: String,
}

#[derive(Debug, Serialize)]
struct WireAppendRequest {
    channel_token: String,
    offset_token: String,
    row: Row,
}

#[derive(Debug, Deserialize)]
struct WireAppendResponse {
    #[serde(default)]
    errors: Vec<WireRowError>,
    #[serde(default = "default_true")]
    channel_valid: bool,
    #[serde(default)]
    channel_closed: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct WireRowError {
    row_index: usize,
    message: String,
}

impl From<WireRowError> for RowError {
    fn from(wire: WireRowError) -> Self {
        Self {
            row_index: wire.row_index,
            message: wire.message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireOffsetResponse {
    #[serde(default)]
    committed_offset_token: Option<String>,
}
