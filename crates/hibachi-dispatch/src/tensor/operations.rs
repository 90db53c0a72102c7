use std::ops::Range;

use crate::backend::{Backend, DataType};
use crate::error::TensorError;
use super::constant::BATCH_DIM;

/// Number of rows along the batch dimension, or `None` for a scalar.
pub(crate) fn leading_len<B>(tensor: &B) -> Option<usize>
where B: Backend
{
    tensor.shape().get(BATCH_DIM).copied()
}

/// The element type `B` holds values declared as `declared` in.
///
/// Falls back to `declared` when the backend has no such type, so that the
/// following cast reports it as unsupported.
pub(crate) fn held_dtype<B>(declared: DataType) -> DataType
where B: Backend
{
    B::storage_dtype(declared).unwrap_or(declared)
}

/// Extracts rows `[window.start, window.end)` of `tensor`.
pub(crate) fn slice_rows<B>(tensor: &B, window: &Range<usize>) -> Result<B, TensorError>
where B: Backend
{
    tensor.slice(BATCH_DIM, window.start, window.len())
}

/// Pads a tensor along the batch dimension to exactly `target` rows.
///
/// The tensor's own rows are tiled to fill the batch: row `i` of the result is
/// row `i % rows` of the input, so the first `rows` rows are unchanged and no
/// row is ever zero-filled.
///
/// # Parameters
///
/// * `tensor` - Tensor of shape `(rows, ...)` with `rows > 0`
/// * `target` - The number of rows the result must have
///
/// # Returns
///
/// A tensor of shape `(target, ...)`. When `rows >= target` the tensor is cut
/// down to its first `target` rows instead.
///
/// # Implementation Notes
///
/// The function:
/// 1. Repeats the whole tensor `ceil(target / rows)` times along the batch dimension
/// 2. Slices the first `target` rows from the repeated tensor
pub(crate) fn pad_rows_by_tiling<B>(tensor: &B, target: usize) -> Result<B, TensorError>
where B: Backend
{
    let rows = leading_len(tensor).ok_or(TensorError::DimensionOutOfRange {
        dim: BATCH_DIM,
        rank: 0,
    })?;
    if rows == target {
        return Ok(tensor.clone());
    }
    if rows > target {
        return tensor.slice(BATCH_DIM, 0, target);
    }
    if rows == 0 {
        return Err(TensorError::EmptyTile);
    }
    let times = target.div_ceil(rows);
    tensor
        .repeat(BATCH_DIM, times)?
        .slice(BATCH_DIM, 0, target)
}

/// Concatenates `parts` in order along the batch dimension.
pub(crate) fn concat_rows<B>(parts: &[B]) -> Result<B, TensorError>
where B: Backend
{
    if parts.len() == 1 {
        return Ok(parts[0].clone());
    }
    B::cat(parts, BATCH_DIM)
}

/// Keeps at most the first `len` rows of `tensor`.
pub(crate) fn truncate_rows<B>(tensor: &B, len: usize) -> Result<B, TensorError>
where B: Backend
{
    match leading_len(tensor) {
        Some(rows) if rows > len => tensor.slice(BATCH_DIM, 0, len),
        _ => Ok(tensor.clone()),
    }
}

/// Builds a zero-row tensor shaped `(0, *declared[1..])`, held in the
/// backend's storage type for `dtype`.
///
/// Wildcard (non-positive) trailing dimensions have no size to borrow from an
/// input, so they collapse to `0`.
pub(crate) fn empty_rows<B>(declared: &[i64], dtype: DataType) -> Result<B, TensorError>
where B: Backend
{
    let mut shape = vec![0usize];
    shape.extend(declared.iter().skip(1).map(|&d| if d > 0 { d as usize } else { 0 }));
    B::zeros(&shape, held_dtype::<B>(dtype))
}
