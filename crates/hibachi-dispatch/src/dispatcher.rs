use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::address::ModelAddress;
use crate::backend::Backend;
use crate::batching::{assemble, empty_outputs, plan_slices, BatchPlanner, BatchSize, InferenceExecutor};
use crate::config::{ClientOptions, DispatchConfig};
use crate::diagnostics::{Diagnostic, Dispatched};
use crate::error::{ConfigurationError, DispatchError, ValidationError};
use crate::schema::{ModelSchema, SchemaCatalog};
use crate::tensor::operations::leading_len;
use crate::transport::{Connector, ConnectorRegistry, TransportClient};
use crate::validation;

/// How much of a [`Dispatcher`]'s lazily fetched state is in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatcherState {
    /// Nothing has been fetched yet
    Uninitialized,
    /// The model schema is cached, the batch size is not
    SchemaLoaded,
    /// The batch size is cached, the model schema is not
    BatchSizeResolved,
    /// Both schema and batch size are cached
    Ready,
}

/// Sends arbitrarily long requests to one served model in fixed-size batches.
///
/// Construction does no network activity. The transport client, the model
/// schema and the batch size are each fetched on first use and then kept for
/// the life of the dispatcher, so a dispatcher can serve any number of
/// requests and is cheap to rebuild from its [`DispatchConfig`].
///
/// # Type Parameters
///
/// * `B` - The tensor type requests and results are expressed in
///
/// # Example
///
/// ```ignore
/// let connectors = ConnectorRegistry::new().with_grpc(MyGrpcConnector::default());
/// let dispatcher = Dispatcher::new(
///     "triton+grpc://localhost:8001/tagger/1",
///     ClientOptions::default(),
///     -1,
///     &connectors,
/// )?;
///
/// let inputs = HashMap::from([("points".to_string(), points)]);
/// let result = dispatcher.dispatch(&["score".to_string()], &inputs).await?;
/// let score = &result.value["score"];
/// ```
pub struct Dispatcher<B>
where B: Backend
{
    address: ModelAddress,
    options: ClientOptions,
    client_options: ClientOptions,
    connector: Arc<dyn Connector<B>>,
    client: OnceCell<Arc<dyn TransportClient<B>>>,
    catalog: SchemaCatalog,
    planner: BatchPlanner,
}

impl<B> Dispatcher<B>
where B: Backend
{
    /// Creates a dispatcher for the model at `address`.
    ///
    /// # Parameters
    ///
    /// * `address` - `<scheme>+<protocol>://<host>/<model>/<version>`
    /// * `options` - Client options, merged over the protocol defaults
    /// * `batch_size` - Rows per round trip; zero or negative asks the server
    /// * `connectors` - Must hold a connector for the address's protocol
    ///
    /// # Errors
    ///
    /// A [`ConfigurationError`] if the address is malformed or no connector is
    /// registered for its protocol.
    pub fn new(
        address: &str,
        options: ClientOptions,
        batch_size: i64,
        connectors: &ConnectorRegistry<B>,
    ) -> Result<Self, ConfigurationError> {
        let address = ModelAddress::parse(address)?;
        let connector = connectors.get(address.protocol())?;
        let client_options = ClientOptions::resolve(address.protocol(), &options);
        Ok(Self {
            address,
            options,
            client_options,
            connector,
            client: OnceCell::new(),
            catalog: SchemaCatalog::new(),
            planner: BatchPlanner::from_setting(batch_size),
        })
    }

    pub fn from_config(config: &DispatchConfig, connectors: &ConnectorRegistry<B>) -> Result<Self, ConfigurationError> {
        Self::new(&config.url, config.client.clone(), config.batch_size, connectors)
    }

    pub fn address(&self) -> &ModelAddress {
        &self.address
    }

    /// The options the transport client is created with, after merging.
    pub fn client_options(&self) -> &ClientOptions {
        &self.client_options
    }

    /// The configuration this dispatcher can be rebuilt from. Fetched state is not included.
    pub fn config(&self) -> DispatchConfig {
        DispatchConfig {
            url: self.address.to_string(),
            batch_size: self.planner.override_size().map_or(-1, |size| size as i64),
            client: self.options.clone(),
        }
    }

    pub fn state(&self) -> DispatcherState {
        match (self.catalog.is_loaded(), self.planner.is_resolved()) {
            (false, false) => DispatcherState::Uninitialized,
            (true, false) => DispatcherState::SchemaLoaded,
            (false, true) => DispatcherState::BatchSizeResolved,
            (true, true) => DispatcherState::Ready,
        }
    }

    async fn client(&self) -> Result<&Arc<dyn TransportClient<B>>, DispatchError> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let client = self
                    .connector
                    .connect(self.address.host(), &self.client_options)
                    .await?;
                info!(
                    host = self.address.host(),
                    protocol = %self.address.protocol(),
                    "connected to serving endpoint"
                );
                Ok::<_, DispatchError>(client)
            })
            .await?;
        Ok(client)
    }

    /// The model's declared inputs and outputs, fetched on first use.
    pub async fn schema(&self) -> Result<&ModelSchema, DispatchError> {
        let client = self.client().await?;
        self.catalog.load(client.as_ref(), &self.address).await
    }

    /// The rows sent per round trip, resolved on first use.
    pub async fn batch_size(&self) -> Result<BatchSize, DispatchError> {
        let client = self.client().await?;
        self.planner.resolve(client.as_ref(), &self.address).await
    }

    /// Checks a request against the model schema without sending it.
    pub async fn validate(
        &self,
        outputs: &[String],
        inputs: &HashMap<String, B>,
    ) -> Result<Vec<Diagnostic>, DispatchError> {
        let schema = self.schema().await?;
        Ok(validation::validate(schema, outputs, inputs)?)
    }

    /// Runs a request of any length through the model.
    ///
    /// # Parameters
    ///
    /// * `outputs` - Names of the outputs to return
    /// * `inputs` - Every declared input, all with the same number of rows along
    ///   dimension `0`
    ///
    /// # Returns
    ///
    /// The requested outputs keyed by name, each with exactly as many rows as
    /// the inputs, together with any diagnostics raised on the way.
    ///
    /// # Implementation Notes
    ///
    /// The function:
    /// 1. Loads the schema and validates the request before anything is sent
    /// 2. Returns empty outputs straight away for a request with no rows
    /// 3. Cuts the rows into batch windows and sends one padded batch per window, in order
    /// 4. Joins the window outputs and trims away the padding
    ///
    /// Any failure aborts the whole request; no partial result is returned.
    pub async fn dispatch(
        &self,
        outputs: &[String],
        inputs: &HashMap<String, B>,
    ) -> Result<Dispatched<HashMap<String, B>>, DispatchError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("dispatch", %request_id, model = self.address.model());
        self.dispatch_inner(outputs, inputs).instrument(span).await
    }

    async fn dispatch_inner(
        &self,
        outputs: &[String],
        inputs: &HashMap<String, B>,
    ) -> Result<Dispatched<HashMap<String, B>>, DispatchError> {
        let client = self.client().await?;
        let schema = self.catalog.load(client.as_ref(), &self.address).await?;
        let mut diagnostics = validation::validate(schema, outputs, inputs)?;

        let len = request_len(inputs)?;
        if len == 0 {
            debug!("empty request, nothing to send");
            return Ok(Dispatched::new(empty_outputs(schema, outputs)?, diagnostics));
        }

        let batch = self.planner.resolve(client.as_ref(), &self.address).await?;
        if batch.is_fallback() {
            diagnostics.push(Diagnostic::BatchSizeFallback { fallback: batch.value() });
        }

        let windows = plan_slices(len, batch.value());
        debug!(rows = len, batch = batch.value(), windows = windows.len(), "dispatching request");

        let executor = InferenceExecutor::new(client.as_ref(), &self.address, schema, batch.value());
        let results = executor.run(inputs, &windows, outputs).await?;
        let assembled = assemble(outputs, &results, len)?;
        Ok(Dispatched::new(assembled, diagnostics))
    }
}

/// Number of rows in a request: the leading dimension of the first input by name.
fn request_len<B>(inputs: &HashMap<String, B>) -> Result<usize, ValidationError>
where B: Backend
{
    let first = inputs.iter().min_by(|(a, _), (b, _)| a.cmp(b));
    match first {
        None => Ok(0),
        Some((name, tensor)) => leading_len(tensor).ok_or_else(|| ValidationError::MissingBatchDimension {
            name: name.clone(),
        }),
    }
}
