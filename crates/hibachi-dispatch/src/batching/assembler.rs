use std::collections::HashMap;

use crate::backend::Backend;
use crate::error::TensorError;
use crate::schema::ModelSchema;
use crate::tensor::operations::{concat_rows, empty_rows, truncate_rows};

use super::executor::WindowOutput;

/// Stitches per-window outputs back into one tensor per requested output.
///
/// Each window's output is trimmed to the rows that window actually served,
/// the pieces are joined in window order and the result is cut to exactly
/// `len` rows.
pub fn assemble<B>(
    outputs: &[String],
    windows: &[WindowOutput<B>],
    len: usize,
) -> Result<HashMap<String, B>, TensorError>
where B: Backend
{
    let mut assembled = HashMap::with_capacity(outputs.len());
    for name in outputs {
        let parts = windows
            .iter()
            .filter_map(|w| w.tensors.get(name).map(|t| truncate_rows(t, w.window.len())))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() {
            return Err(TensorError::EmptyConcat);
        }
        let joined = concat_rows(&parts)?;
        assembled.insert(name.clone(), truncate_rows(&joined, len)?);
    }
    Ok(assembled)
}

/// Zero-row outputs for an empty request, shaped from the declared output
/// dimensions and typed with the declared element type.
pub fn empty_outputs<B>(schema: &ModelSchema, outputs: &[String]) -> Result<HashMap<String, B>, TensorError>
where B: Backend
{
    let mut empty = HashMap::with_capacity(outputs.len());
    for name in outputs {
        if let Some(spec) = schema.output(name) {
            empty.insert(name.clone(), empty_rows(spec.dims(), spec.datatype())?);
        }
    }
    Ok(empty)
}
