//! # Tensor Operations
//!
//! Row-level helpers the dispatcher builds on top of [`crate::backend::Backend`].

pub mod constant;
pub(crate) mod operations;
