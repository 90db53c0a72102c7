//! # Model Schema
//!
//! The declared contract of a served model: the shape and element type of every
//! named input and output. The schema is fetched once per dispatcher by the
//! [`SchemaCatalog`] and never refreshed.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::info;

use crate::address::ModelAddress;
use crate::backend::{Backend, DataType};
use crate::error::{DispatchError, SchemaError};
use crate::transport::TransportClient;

/// An integer that may arrive as a JSON number or as a decimal string.
///
/// Protocol buffer JSON encodes 64-bit integers as strings, so the same field
/// shows up as `-1` over one transport and `"-1"` over the other.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireInt {
    Int(i64),
    Text(String),
}

impl WireInt {
    pub(crate) fn value(&self) -> Option<i64> {
        match self {
            WireInt::Int(v) => Some(*v),
            WireInt::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTensor {
    name: String,
    datatype: String,
    shape: Vec<WireInt>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    inputs: Vec<RawTensor>,
    outputs: Vec<RawTensor>,
}

/// Declared shape and element type of one tensor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorSpec {
    dims: Vec<i64>,
    datatype: DataType,
}

impl TensorSpec {
    pub fn new(dims: Vec<i64>, datatype: DataType) -> Self {
        Self { dims, datatype }
    }

    /// Declared dimension sizes; a non-positive size accepts any size.
    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn datatype(&self) -> DataType {
        self.datatype
    }

    /// Whether every fixed dimension matches `shape`. Ranks must already agree.
    pub fn accepts_shape(&self, shape: &[usize]) -> bool {
        self.dims
            .iter()
            .zip(shape.iter())
            .all(|(&declared, &actual)| declared <= 0 || declared as usize == actual)
    }
}

/// The named inputs and outputs of a model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSchema {
    inputs: BTreeMap<String, TensorSpec>,
    outputs: BTreeMap<String, TensorSpec>,
}

impl ModelSchema {
    pub fn new(inputs: BTreeMap<String, TensorSpec>, outputs: BTreeMap<String, TensorSpec>) -> Self {
        Self { inputs, outputs }
    }

    /// Builds a schema from a model metadata document.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when a required field is missing, a dimension
    /// is not an integer, a data type is unknown, or a name is declared twice.
    pub fn from_metadata(model: &str, metadata: &Value) -> Result<Self, SchemaError> {
        let raw = RawMetadata::deserialize(metadata).map_err(|source| SchemaError::MalformedMetadata {
            model: model.to_string(),
            source,
        })?;
        Ok(Self {
            inputs: normalize(raw.inputs)?,
            outputs: normalize(raw.outputs)?,
        })
    }

    pub fn inputs(&self) -> &BTreeMap<String, TensorSpec> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeMap<String, TensorSpec> {
        &self.outputs
    }

    pub fn input(&self, name: &str) -> Option<&TensorSpec> {
        self.inputs.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&TensorSpec> {
        self.outputs.get(name)
    }

    pub fn input_names(&self) -> Vec<String> {
        self.inputs.keys().cloned().collect()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.outputs.keys().cloned().collect()
    }
}

fn normalize(tensors: Vec<RawTensor>) -> Result<BTreeMap<String, TensorSpec>, SchemaError> {
    let mut specs = BTreeMap::new();
    for tensor in tensors {
        let dims = tensor
            .shape
            .iter()
            .map(|d| {
                d.value().ok_or_else(|| SchemaError::InvalidDimension {
                    tensor: tensor.name.clone(),
                    value: format!("{d:?}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let datatype = tensor.datatype.parse()?;
        if specs.insert(tensor.name.clone(), TensorSpec::new(dims, datatype)).is_some() {
            return Err(SchemaError::DuplicateName { name: tensor.name });
        }
    }
    Ok(specs)
}

/// Fetches a model's schema on first use and caches it for its own lifetime.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    schema: OnceCell<ModelSchema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached schema, fetching it from `client` on the first call.
    ///
    /// A failed fetch is not cached; the next call tries again.
    pub async fn load<B>(
        &self,
        client: &dyn TransportClient<B>,
        address: &ModelAddress,
    ) -> Result<&ModelSchema, DispatchError>
    where B: Backend
    {
        self.schema
            .get_or_try_init(|| async {
                let metadata = client.model_metadata(address.model(), address.version()).await?;
                let schema = ModelSchema::from_metadata(address.model(), &metadata)?;
                info!(
                    model = address.model(),
                    version = address.version(),
                    inputs = ?schema.input_names(),
                    outputs = ?schema.output_names(),
                    "loaded model schema"
                );
                Ok::<_, DispatchError>(schema)
            })
            .await
    }

    /// The schema, if it has already been loaded.
    pub fn get(&self) -> Option<&ModelSchema> {
        self.schema.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.schema.initialized()
    }
}
