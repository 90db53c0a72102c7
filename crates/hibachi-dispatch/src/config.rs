//! Configuration for dispatchers and their transports

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::address::{ModelAddress, Protocol};
use crate::error::ConfigurationError;
use crate::tensor::constant::HTTP_CLIENT_CONCURRENCY;

/// Options handed to a [`crate::transport::Connector`] when a client is created.
///
/// Unset fields fall back to the protocol defaults from
/// [`ClientOptions::defaults_for`]. Keys the dispatcher does not know about are
/// kept in `extra` and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,

    /// Maximum number of concurrent connections held by the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ClientOptions {
    /// Defaults applied for `protocol` before any caller options.
    ///
    /// - `grpc`: not verbose, TLS enabled
    /// - `http`: not verbose, bounded connection concurrency
    pub fn defaults_for(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Grpc => Self {
                verbose: Some(false),
                ssl: Some(true),
                ..Default::default()
            },
            Protocol::Http => Self {
                verbose: Some(false),
                concurrency: Some(HTTP_CLIENT_CONCURRENCY),
                ..Default::default()
            },
        }
    }

    /// Overlays every field set in `overrides` on top of `self`.
    pub fn merged_with(&self, overrides: &ClientOptions) -> ClientOptions {
        let mut extra = self.extra.clone();
        extra.extend(overrides.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        ClientOptions {
            verbose: overrides.verbose.or(self.verbose),
            ssl: overrides.ssl.or(self.ssl),
            concurrency: overrides.concurrency.or(self.concurrency),
            extra,
        }
    }

    /// The options a client for `protocol` is actually created with.
    pub fn resolve(protocol: Protocol, overrides: &ClientOptions) -> ClientOptions {
        Self::defaults_for(protocol).merged_with(overrides)
    }
}

fn auto_batch_size() -> i64 {
    -1
}

/// Everything needed to rebuild a [`crate::Dispatcher`].
///
/// Lazily fetched state (client, schema, batch size) is never part of the
/// configuration; a dispatcher built from it starts uninitialized.
///
/// ```
/// use hibachi_dispatch::config::DispatchConfig;
///
/// let config = DispatchConfig::from_json_str(
///     r#"{ "url": "triton+grpc://localhost:8001/tagger/1", "client": { "ssl": false } }"#,
/// ).unwrap();
/// assert_eq!(config.batch_size_override(), None);
/// assert_eq!(config.client.ssl, Some(false));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Model address, `<scheme>+<protocol>://<host>/<model>/<version>`
    pub url: String,

    /// Rows per round trip. Zero or negative resolves it from the server.
    #[serde(default = "auto_batch_size")]
    pub batch_size: i64,

    #[serde(default)]
    pub client: ClientOptions,
}

impl DispatchConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            batch_size: auto_batch_size(),
            client: ClientOptions::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_client_options(mut self, client: ClientOptions) -> Self {
        self.client = client;
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(raw).map_err(ConfigurationError::Parse)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigurationError> {
        serde_json::to_string_pretty(self).map_err(ConfigurationError::Parse)
    }

    pub fn address(&self) -> Result<ModelAddress, ConfigurationError> {
        ModelAddress::parse(&self.url)
    }

    /// The explicit batch size, if one was configured.
    pub fn batch_size_override(&self) -> Option<usize> {
        (self.batch_size > 0).then_some(self.batch_size as usize)
    }
}
