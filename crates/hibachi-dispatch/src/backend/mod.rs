//! # Tensor Backend
//!
//! Everything the dispatcher does to an array (slicing a window, tiling it to
//! a full batch, casting it, joining answers) goes through the [`Backend`]
//! trait, so requests can be expressed in whichever dense tensor library the
//! caller already uses.
//!
//! Element types are described by [`DataType`], named the way the serving
//! endpoint names them.
//!
//! ## Feature Flags
//!
//! - `candle`: implements [`Backend`] for `candle_core::Tensor` (on by default)
//!
//! Other tensor types can be dispatched by implementing [`Backend`] for them.

mod core_trait;
mod dtype;

#[cfg_attr(docsrs, doc(cfg(feature = "candle")))]
#[cfg(feature = "candle")]
/// [`Backend`] for Candle's `Tensor`, kept on the CPU for zero-row outputs.
pub mod candle;

pub use core_trait::*;
pub use dtype::DataType;

#[cfg(test)]
/// Row-major tensor over `f64` values, used in tests
pub(crate) mod mock_tensor;
