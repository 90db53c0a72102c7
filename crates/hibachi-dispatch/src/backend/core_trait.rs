use std::fmt::{Debug, Display};

use super::DataType;
use crate::error::TensorError;

/// The backend trait that must be fulfilled by any dense array type to be dispatched.
///
/// Dimension `0` is always the batch dimension. Every operation returns a new
/// tensor and leaves `self` untouched.
pub trait Backend: Debug + Display + Clone + Send + Sync + 'static {
    /// Return the shape of this tensor
    fn shape(&self) -> Vec<usize>;

    /// Return the element type of this tensor
    fn dtype(&self) -> DataType;

    /// Concatenate several tensors to each other along dimension `dim`, in the order supplied
    fn cat(tensors: &[Self], dim: usize) -> Result<Self, TensorError>;

    /// Slice a given `dimension` from `start` to `start + len`
    fn slice(&self, dimension: usize, start: usize, len: usize) -> Result<Self, TensorError>;

    /// Repeat a given tensor `times` along `dim`
    fn repeat(&self, dim: usize, times: usize) -> Result<Self, TensorError>;

    /// Convert the elements of this tensor to `dtype`, or to its [`Backend::storage_dtype`]
    fn cast(&self, dtype: DataType) -> Result<Self, TensorError>;

    /// Create a tensor of `shape` filled with zeros, typed like [`Backend::cast`] would type it
    fn zeros(shape: &[usize], dtype: DataType) -> Result<Self, TensorError>;

    /// The element type this backend holds values declared as `dtype` in.
    ///
    /// Backends without a native type for `dtype` return the closest type that
    /// can hold every value, or `None` when there is none.
    fn storage_dtype(dtype: DataType) -> Option<DataType> {
        Some(dtype)
    }
}
