//! Connection parameters for the updater. Loaded from env (`NATS_` prefix by default) or built in code.
//!
//! | Field | Env var (suffix) |
//! |---|---|
//! | server URL | `SERVER_URL` |
//! | durable consumer name | `CONSUMER_NAME` |
//! | stream name | `STREAM_NAME` |
//! | receiver webhook URL | `RECEIVER_URL` |
//! | receiver shared secret | `RECEIVER_SECRET` |

use std::env;
use std::fmt;

use crate::error::ConfigError;

pub const DEFAULT_ENV_PREFIX: &str = "NATS_";

/// Immutable once built; every field is required and non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct NatsConfig {
    url: String,
    consumer_name: String,
    stream_name: String,
    receiver_url: String,
    receiver_secret: String,
}

impl NatsConfig {
    pub fn builder() -> NatsConfigBuilder {
        NatsConfigBuilder::default()
    }

    /// Loads from `NATS_SERVER_URL`, `NATS_CONSUMER_NAME`, `NATS_STREAM_NAME`, `NATS_RECEIVER_URL`, `NATS_RECEIVER_SECRET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_prefix(DEFAULT_ENV_PREFIX)
    }

    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        let var = |name: &str| env::var(format!("{}{}", prefix, name)).ok();
        Self::builder()
            .maybe_url(var("SERVER_URL"))
            .maybe_consumer_name(var("CONSUMER_NAME"))
            .maybe_stream_name(var("STREAM_NAME"))
            .maybe_receiver_url(var("RECEIVER_URL"))
            .maybe_receiver_secret(var("RECEIVER_SECRET"))
            .build()
    }

    /// Like [`NatsConfig::from_env`] but `Ok(None)` when any setting is missing, for deployments where
    /// the NATS updater is optional and the bot falls back to another update source.
    pub fn from_env_optional() -> Result<Option<Self>, ConfigError> {
        match Self::from_env() {
            Ok(config) => Ok(Some(config)),
            Err(ConfigError::Missing(_)) => Ok(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn receiver_url(&self) -> &str {
        &self.receiver_url
    }

    pub fn receiver_secret(&self) -> &str {
        &self.receiver_secret
    }
}

// The receiver secret stays out of logs.
impl fmt::Debug for NatsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NatsConfig")
            .field("url", &self.url)
            .field("consumer_name", &self.consumer_name)
            .field("stream_name", &self.stream_name)
            .field("receiver_url", &self.receiver_url)
            .field("receiver_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default, Clone)]
pub struct NatsConfigBuilder {
    url: Option<String>,
    consumer_name: Option<String>,
    stream_name: Option<String>,
    receiver_url: Option<String>,
    receiver_secret: Option<String>,
}

impl NatsConfigBuilder {
    pub fn url(self, url: impl Into<String>) -> Self {
        self.maybe_url(Some(url.into()))
    }

    pub fn consumer_name(self, name: impl Into<String>) -> Self {
        self.maybe_consumer_name(Some(name.into()))
    }

    pub fn stream_name(self, name: impl Into<String>) -> Self {
        self.maybe_stream_name(Some(name.into()))
    }

    pub fn receiver_url(self, url: impl Into<String>) -> Self {
        self.maybe_receiver_url(Some(url.into()))
    }

    pub fn receiver_secret(self, secret: impl Into<String>) -> Self {
        self.maybe_receiver_secret(Some(secret.into()))
    }

    fn maybe_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    fn maybe_consumer_name(mut self, name: Option<String>) -> Self {
        self.consumer_name = name;
        self
    }

    fn maybe_stream_name(mut self, name: Option<String>) -> Self {
        self.stream_name = name;
        self
    }

    fn maybe_receiver_url(mut self, url: Option<String>) -> Self {
        self.receiver_url = url;
        self
    }

    fn maybe_receiver_secret(mut self, secret: Option<String>) -> Self {
        self.receiver_secret = secret;
        self
    }

    pub fn build(self) -> Result<NatsConfig, ConfigError> {
        Ok(NatsConfig {
            url: required(self.url, "SERVER_URL")?,
            consumer_name: required(self.consumer_name, "CONSUMER_NAME")?,
            stream_name: required(self.stream_name, "STREAM_NAME")?,
            receiver_url: required(self.receiver_url, "RECEIVER_URL")?,
            receiver_secret: required(self.receiver_secret, "RECEIVER_SECRET")?,
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}
