//! # Transport
//!
//! The dispatcher never speaks a wire protocol itself. It talks to the serving
//! endpoint through a [`TransportClient`], created by the [`Connector`]
//! registered for the address's [`Protocol`].
//!
//! The `grpc` and `http` transports share one interface and are chosen when the
//! dispatcher is built, so swapping protocols is a matter of changing the
//! address, not the calling code.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::address::Protocol;
use crate::backend::Backend;
use crate::config::ClientOptions;
use crate::error::{ConfigurationError, TransportError};

/// A connected client for one serving endpoint.
///
/// Implementations perform exactly one network exchange per call and must not
/// retry on their own; retries, timeouts and cancellation belong to the
/// transport's configuration or to the caller.
#[async_trait]
pub trait TransportClient<B>: Send + Sync
where B: Backend
{
    /// Fetches the model's declared inputs and outputs.
    ///
    /// The expected document has `inputs` and `outputs` lists whose entries
    /// carry `name`, `datatype` and `shape`.
    async fn model_metadata(&self, model: &str, version: &str) -> Result<Value, TransportError>;

    /// Fetches the model's server-side configuration, used to resolve the batch size.
    async fn model_config(&self, model: &str, version: &str) -> Result<Value, TransportError>;

    /// Runs one inference round trip.
    ///
    /// # Parameters
    ///
    /// * `inputs` - Named tensors, each already padded to the full batch size
    ///   and cast to the declared data type
    /// * `outputs` - Names of the outputs to return
    ///
    /// # Returns
    ///
    /// The requested outputs keyed by name, each with the batch as dimension `0`.
    async fn infer(
        &self,
        model: &str,
        version: &str,
        inputs: Vec<(String, B)>,
        outputs: &[String],
    ) -> Result<HashMap<String, B>, TransportError>;
}

/// Creates [`TransportClient`]s for one protocol.
#[async_trait]
pub trait Connector<B>: Send + Sync
where B: Backend
{
    /// Connects to `host` using `options`, already merged over the protocol defaults.
    async fn connect(
        &self,
        host: &str,
        options: &ClientOptions,
    ) -> Result<Arc<dyn TransportClient<B>>, TransportError>;
}

/// The set of transports available to a dispatcher, keyed by protocol.
pub struct ConnectorRegistry<B>
where B: Backend
{
    connectors: HashMap<Protocol, Arc<dyn Connector<B>>>,
}

impl<B> ConnectorRegistry<B>
where B: Backend
{
    pub fn new() -> Self {
        Self {
            connectors: HashMap::new(),
        }
    }

    /// Registers `connector` for `protocol`, replacing any previous one.
    pub fn register<C>(mut self, protocol: Protocol, connector: C) -> Self
    where C: Connector<B> + 'static
    {
        self.connectors.insert(protocol, Arc::new(connector));
        self
    }

    pub fn with_grpc<C>(self, connector: C) -> Self
    where C: Connector<B> + 'static
    {
        self.register(Protocol::Grpc, connector)
    }

    pub fn with_http<C>(self, connector: C) -> Self
    where C: Connector<B> + 'static
    {
        self.register(Protocol::Http, connector)
    }

    pub fn supports(&self, protocol: Protocol) -> bool {
        self.connectors.contains_key(&protocol)
    }

    /// The connector for `protocol`.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::MissingTransport`] when nothing is registered for it.
    pub fn get(&self, protocol: Protocol) -> Result<Arc<dyn Connector<B>>, ConfigurationError> {
        self.connectors
            .get(&protocol)
            .cloned()
            .ok_or(ConfigurationError::MissingTransport { protocol })
    }
}

impl<B> Default for ConnectorRegistry<B>
where B: Backend
{
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Clone for ConnectorRegistry<B>
where B: Backend
{
    fn clone(&self) -> Self {
        Self {
            connectors: self.connectors.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod mock;
