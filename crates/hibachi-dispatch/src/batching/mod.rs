//! # Batching
//!
//! Turns one arbitrarily long request into a sequence of fixed-size round trips
//! and back:
//!
//! - [`BatchPlanner`] settles on a batch size and [`plan_slices`] cuts the
//!   request into windows of that many rows
//! - [`InferenceExecutor`] pads each window to a full batch and sends it
//! - [`assemble`] drops the padding and joins the window outputs in order

mod assembler;
mod executor;
mod planner;

pub use assembler::{assemble, empty_outputs};
pub use executor::{InferenceExecutor, WindowOutput};
pub use planner::{plan_slices, resolve_batch_size, BatchPlanner, BatchSize, BatchSizeSource};
