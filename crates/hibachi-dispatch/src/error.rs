//! # Errors
//!
//! Every fallible operation in the dispatcher returns a [`DispatchError`], which
//! wraps one of the stage-specific error families below. Fatal errors carry the
//! offending tensor or model name and, where it applies, the expected and actual
//! values. Nothing in this crate retries on error.

use std::path::PathBuf;

use thiserror::Error;

use crate::address::Protocol;
use crate::backend::DataType;

/// Boxed error type used to carry collaborator failures as a source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top level error returned by [`crate::Dispatcher`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Address or configuration problem, raised before any network activity.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The model metadata or configuration could not be interpreted.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The request does not satisfy the model contract.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A round trip to the serving endpoint failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A tensor operation failed in the backend.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// Malformed addresses, unknown protocols and missing transports.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("malformed model address [{address}]: {reason} (expected <scheme>+<protocol>://<host>/<model>/<version>)")]
    MalformedAddress {
        address: String,
        reason: &'static str,
    },

    #[error("[{protocol}] does not encode a valid protocol (grpc or http)")]
    UnknownProtocol { protocol: String },

    #[error("no transport registered for protocol [{protocol}]")]
    MissingTransport { protocol: Protocol },

    #[error("unable to read configuration from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse dispatcher configuration")]
    Parse(#[source] serde_json::Error),
}

/// Failures interpreting what the serving endpoint reports about a model.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed metadata for model [{model}]")]
    MalformedMetadata {
        model: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed configuration for model [{model}]")]
    MalformedConfig {
        model: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("tensor [{tensor}] declares invalid dimension [{value}]")]
    InvalidDimension { tensor: String, value: String },

    #[error("unknown data type [{0}]")]
    UnknownDataType(String),

    #[error("tensor [{name}] is declared more than once")]
    DuplicateName { name: String },
}

/// A request that violates the model contract. Raised before any inference call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("input [{name}] not defined in model! Inputs defined by model: {accepted:?}")]
    UnknownInput { name: String, accepted: Vec<String> },

    #[error("input [{name}] not given in input dictionary")]
    MissingInput { name: String },

    #[error("input [{name}] got wrong dimension: {actual} (expected {expected})")]
    RankMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("input [{name}] got array of shape {actual:?} (expected {expected:?}, non-positive means arbitrary)")]
    ShapeMismatch {
        name: String,
        expected: Vec<i64>,
        actual: Vec<usize>,
    },

    #[error("requested output [{name}] not defined by model (defined: {accepted:?})")]
    UnknownOutput { name: String, accepted: Vec<String> },

    #[error("input [{name}] has no leading batch dimension")]
    MissingBatchDimension { name: String },
}

/// Network and protocol failures reported by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unable to reach serving endpoint at {address}")]
    Connection {
        address: String,
        #[source]
        source: BoxError,
    },

    #[error("request to model [{model}] failed")]
    Request {
        model: String,
        #[source]
        source: BoxError,
    },

    #[error("malformed response from model [{model}]: {message}")]
    MalformedResponse { model: String, message: String },
}

/// Failures inside a tensor backend.
#[derive(Debug, Error)]
pub enum TensorError {
    #[error("dimension {dim} out of range for tensor of rank {rank}")]
    DimensionOutOfRange { dim: usize, rank: usize },

    #[error("range [{start}, {end}) out of bounds for dimension {dim} of size {size}")]
    OutOfBounds {
        dim: usize,
        start: usize,
        end: usize,
        size: usize,
    },

    #[error("cannot concatenate tensors of shapes {left:?} and {right:?} along dimension {dim}")]
    IncompatibleShapes {
        dim: usize,
        left: Vec<usize>,
        right: Vec<usize>,
    },

    #[error("cannot concatenate an empty list of tensors")]
    EmptyConcat,

    #[error("cannot tile a tensor with no rows")]
    EmptyTile,

    #[error("data type [{0}] is not supported by this backend")]
    UnsupportedDataType(DataType),

    #[error("backend operation failed")]
    Backend(#[source] BoxError),
}
