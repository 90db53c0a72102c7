//! # Request Validation
//!
//! Checks a request against the model schema before anything is sent. The
//! checks run in a fixed order and the first violation is returned:
//!
//! 1. every request input is declared by the model
//! 2. every declared input is present in the request
//! 3. every input has the declared rank
//! 4. every fixed (positive) declared dimension matches exactly
//! 5. every input has the declared element type (non-fatal, reported as a [`Diagnostic`])
//! 6. every requested output is declared by the model
//!
//! A declared element type the backend has no native type for is compared in
//! its wider storage type, and the substitution is reported as a [`Diagnostic`]
//! for every input and requested output it affects.
//!
//! Inputs are visited in name order so the reported violation is deterministic.

use std::collections::HashMap;

use tracing::warn;

use crate::backend::Backend;
use crate::diagnostics::Diagnostic;
use crate::error::ValidationError;
use crate::schema::{ModelSchema, TensorSpec};
use crate::tensor::operations::held_dtype;

/// Validates `inputs` and the requested `outputs` against `schema`.
///
/// # Returns
///
/// The non-fatal diagnostics found: element type mismatches and substitutions.
///
/// # Errors
///
/// The first [`ValidationError`] in check order.
pub fn validate<B>(
    schema: &ModelSchema,
    outputs: &[String],
    inputs: &HashMap<String, B>,
) -> Result<Vec<Diagnostic>, ValidationError>
where B: Backend
{
    let mut names: Vec<&String> = inputs.keys().collect();
    names.sort();

    for name in &names {
        if schema.input(name).is_none() {
            return Err(ValidationError::UnknownInput {
                name: name.to_string(),
                accepted: schema.input_names(),
            });
        }
    }

    for name in schema.inputs().keys() {
        if !inputs.contains_key(name) {
            return Err(ValidationError::MissingInput { name: name.clone() });
        }
    }

    // Every name is known past this point
    let pairs: Vec<_> = names
        .iter()
        .filter_map(|name| Some((*name, schema.input(name)?, inputs.get(*name)?)))
        .collect();

    for (name, spec, tensor) in &pairs {
        let actual = tensor.shape().len();
        if actual != spec.rank() {
            return Err(ValidationError::RankMismatch {
                name: name.to_string(),
                expected: spec.rank(),
                actual,
            });
        }
    }

    for (name, spec, tensor) in &pairs {
        let shape = tensor.shape();
        if !spec.accepts_shape(&shape) {
            return Err(ValidationError::ShapeMismatch {
                name: name.to_string(),
                expected: spec.dims().to_vec(),
                actual: shape,
            });
        }
    }

    let mut diagnostics = vec![];
    for (name, spec, tensor) in &pairs {
        diagnostics.extend(substitution::<B>(name, spec));
        let expected = held_dtype::<B>(spec.datatype());
        let actual = tensor.dtype();
        if actual != expected {
            let diagnostic = Diagnostic::DtypeMismatch {
                name: name.to_string(),
                expected,
                actual,
            };
            warn!("{diagnostic}");
            diagnostics.push(diagnostic);
        }
    }

    for name in outputs {
        let spec = schema.output(name).ok_or_else(|| ValidationError::UnknownOutput {
            name: name.clone(),
            accepted: schema.output_names(),
        })?;
        diagnostics.extend(substitution::<B>(name, spec));
    }

    Ok(diagnostics)
}

fn substitution<B>(name: &str, spec: &TensorSpec) -> Option<Diagnostic>
where B: Backend
{
    let declared = spec.datatype();
    let stored = held_dtype::<B>(declared);
    if stored == declared {
        return None;
    }
    let diagnostic = Diagnostic::DtypeSubstituted {
        name: name.to_string(),
        declared,
        stored,
    };
    warn!("{diagnostic}");
    Some(diagnostic)
}
