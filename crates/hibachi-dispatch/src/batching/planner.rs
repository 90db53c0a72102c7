use std::fmt;
use std::ops::Range;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::address::ModelAddress;
use crate::backend::Backend;
use crate::error::{DispatchError, SchemaError};
use crate::schema::WireInt;
use crate::tensor::constant::BATCH_SIZE_FALLBACK;
use crate::transport::TransportClient;

/// Where a resolved batch size came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchSizeSource {
    /// Set explicitly by the caller
    Override,
    /// First entry of the server's preferred dynamic batch sizes
    PreferredBatchSize,
    /// The server's maximum batch size
    MaxBatchSize,
    /// Nothing was configured, so [`BATCH_SIZE_FALLBACK`] applies
    Fallback,
}

/// The number of rows sent per inference round trip. Always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSize {
    value: usize,
    source: BatchSizeSource,
}

impl BatchSize {
    pub fn value(&self) -> usize {
        self.value
    }

    pub fn source(&self) -> BatchSizeSource {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == BatchSizeSource::Fallback
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDynamicBatching {
    #[serde(default, alias = "preferredBatchSize")]
    preferred_batch_size: Vec<WireInt>,
}

#[derive(Debug, Default, Deserialize)]
struct RawModelConfig {
    #[serde(default, alias = "maxBatchSize")]
    max_batch_size: Option<WireInt>,

    #[serde(default, alias = "dynamicBatching")]
    dynamic_batching: Option<RawDynamicBatching>,
}

fn positive(value: Option<&WireInt>) -> Option<usize> {
    value
        .and_then(WireInt::value)
        .filter(|&v| v > 0)
        .map(|v| v as usize)
}

/// Resolves the batch size for a model.
///
/// Precedence, first match wins:
/// 1. a positive `override`
/// 2. the first `dynamic_batching.preferred_batch_size` entry, when positive
/// 3. `max_batch_size`, when positive
/// 4. [`BATCH_SIZE_FALLBACK`]
///
/// `server_config` may be the bare model configuration or wrapped in a
/// top-level `config` object, and may use camelCase field names. Values that
/// are zero, negative or not integers count as unset.
///
/// # Errors
///
/// [`SchemaError::MalformedConfig`] when the configuration is not an object of
/// the expected layout.
pub fn resolve_batch_size(
    override_size: Option<usize>,
    server_config: Option<&Value>,
    model: &str,
) -> Result<BatchSize, SchemaError> {
    if let Some(value) = override_size.filter(|&v| v > 0) {
        return Ok(BatchSize {
            value,
            source: BatchSizeSource::Override,
        });
    }

    let config = server_config
        .map(|config| config.get("config").filter(|inner| inner.is_object()).unwrap_or(config))
        .unwrap_or(&Value::Null);
    let raw = match config {
        Value::Null => RawModelConfig::default(),
        other => RawModelConfig::deserialize(other).map_err(|source| SchemaError::MalformedConfig {
            model: model.to_string(),
            source,
        })?,
    };

    let preferred = raw
        .dynamic_batching
        .as_ref()
        .and_then(|batching| positive(batching.preferred_batch_size.first()));
    if let Some(value) = preferred {
        return Ok(BatchSize {
            value,
            source: BatchSizeSource::PreferredBatchSize,
        });
    }
    if let Some(value) = positive(raw.max_batch_size.as_ref()) {
        return Ok(BatchSize {
            value,
            source: BatchSizeSource::MaxBatchSize,
        });
    }

    warn!(
        model,
        fallback = BATCH_SIZE_FALLBACK,
        "batch size not set by model, using default value; check with the model maintainer that this is expected"
    );
    Ok(BatchSize {
        value: BATCH_SIZE_FALLBACK,
        source: BatchSizeSource::Fallback,
    })
}

/// Splits `[0, len)` into consecutive windows of `batch` rows.
///
/// The last window is shorter when `batch` does not divide `len`. An empty
/// range yields no windows.
pub fn plan_slices(len: usize, batch: usize) -> Vec<Range<usize>> {
    if len == 0 || batch == 0 {
        return vec![];
    }
    (0..len)
        .step_by(batch)
        .map(|start| start..(start + batch).min(len))
        .collect()
}

/// Resolves and caches the batch size of one model.
#[derive(Debug)]
pub struct BatchPlanner {
    override_size: Option<usize>,
    resolved: OnceCell<BatchSize>,
}

impl BatchPlanner {
    /// A planner with an explicit batch size, or `None` to ask the server.
    pub fn new(override_size: Option<usize>) -> Self {
        Self {
            override_size: override_size.filter(|&v| v > 0),
            resolved: OnceCell::new(),
        }
    }

    /// Builds a planner from a raw setting where zero or negative means "ask the server".
    pub fn from_setting(batch_size: i64) -> Self {
        Self::new((batch_size > 0).then_some(batch_size as usize))
    }

    pub fn override_size(&self) -> Option<usize> {
        self.override_size
    }

    /// Returns the cached batch size, resolving it on the first call.
    ///
    /// The server configuration is only fetched when no override is set. A
    /// failed fetch is not cached.
    pub async fn resolve<B>(
        &self,
        client: &dyn TransportClient<B>,
        address: &ModelAddress,
    ) -> Result<BatchSize, DispatchError>
    where B: Backend
    {
        let size = self
            .resolved
            .get_or_try_init(|| async {
                let size = match self.override_size {
                    Some(_) => resolve_batch_size(self.override_size, None, address.model())?,
                    None => {
                        let config = client.model_config(address.model(), address.version()).await?;
                        resolve_batch_size(None, Some(&config), address.model())?
                    }
                };
                info!(
                    model = address.model(),
                    batch_size = size.value(),
                    source = ?size.source(),
                    "resolved batch size"
                );
                Ok::<_, DispatchError>(size)
            })
            .await?;
        Ok(*size)
    }

    /// The batch size, if it has already been resolved.
    pub fn get(&self) -> Option<BatchSize> {
        self.resolved.get().copied()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.initialized()
    }
}
