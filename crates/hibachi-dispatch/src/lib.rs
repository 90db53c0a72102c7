//! # Hibachi Dispatch
//!
//! Batched dispatch of dense tensors to remote inference servers.
//!
//! ## Overview
//!
//! A served model accepts requests of a fixed batch size, while callers hold
//! arrays of arbitrary length. This library sits between the two: it validates
//! a request against the model's declared contract, cuts it into windows of the
//! server's batch size, pads every window to a full batch, sends the windows one
//! after another and stitches the answers back into arrays as long as the
//! request.
//!
//! Key components include:
//!
//! - A tensor abstraction layer supporting various backends
//! - A model address and configuration layer that round trips through JSON
//! - A transport abstraction for `grpc` and `http` serving endpoints
//! - Lazily fetched, cached model schema and batch size
//! - The batching pipeline: planning, padded execution and result assembly
//!
//! ## Architecture
//!
//! ### Assumptions
//! Regardless of backend used, the `0th` dimension of every input and output is
//! reserved as the batch dimension. Tensors may fill in other dimensions.
//!
//! ### Backend Traits
//!
//! The `Backend` trait defines the interface that any tensor implementation
//! must satisfy to be dispatched. This allows the batching logic to remain
//! independent of the specific tensor implementation.
//!
//! ### Transports
//!
//! The `TransportClient` and `Connector` traits hide the wire protocol. A
//! `ConnectorRegistry` maps each protocol to the connector that serves it, and
//! the dispatcher picks one from the protocol named in the model address.
//!
//! ### Dispatching
//!
//! `Dispatcher::dispatch` is the entry point. It returns the requested outputs
//! wrapped in `Dispatched`, which also carries any `Diagnostic` raised along the
//! way, such as an input that had to be cast to the declared element type.
//!
//! ```ignore
//! use hibachi_dispatch::{Dispatcher, config::ClientOptions, transport::ConnectorRegistry};
//!
//! let connectors = ConnectorRegistry::new().with_http(MyHttpConnector::default());
//! let dispatcher = Dispatcher::new(
//!     "triton+http://localhost:8000/tagger/1",
//!     ClientOptions::default(),
//!     -1,
//!     &connectors,
//! )?;
//! let result = dispatcher.dispatch(&["score".to_string()], &inputs).await?;
//! for diagnostic in &result.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! ```
//!
//! ## Features
//!
//! - **candle** - Enables candle backend
//!
//! ## Implementation Details
//!
//! Construction never touches the network. The transport client, the model
//! schema and the batch size are each fetched on first use and cached for the
//! life of the dispatcher. Windows are always padded by repeating the window's
//! own rows, so the server never sees rows that are not part of the request.
//!

mod dispatcher;
mod tensor;

pub mod address;
pub mod backend;
pub mod batching;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod schema;
pub mod transport;
pub mod validation;

/// Constants for client reference
pub use tensor::constant;

pub use address::{ModelAddress, Protocol};
pub use diagnostics::{Diagnostic, Dispatched};
pub use dispatcher::{Dispatcher, DispatcherState};
pub use error::{
    ConfigurationError, DispatchError, SchemaError, TensorError, TransportError, ValidationError,
};
