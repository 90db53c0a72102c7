//! Non-fatal findings reported alongside a dispatch result

use std::fmt;

use crate::backend::DataType;

/// A recoverable issue noticed while serving a request.
///
/// Diagnostics never stop a dispatch. They are also logged at `warn` level
/// when they are first produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// An input arrived with a different element type than declared and was cast.
    DtypeMismatch {
        name: String,
        expected: DataType,
        actual: DataType,
    },

    /// The backend has no native type for a declared element type and holds the
    /// tensor in a wider one instead.
    DtypeSubstituted {
        name: String,
        declared: DataType,
        stored: DataType,
    },

    /// Neither the caller nor the server set a batch size, so the fallback was used.
    BatchSizeFallback { fallback: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DtypeMismatch { name, expected, actual } => write!(
                f,
                "input [{name}] got array of type [{actual}] (expected [{expected}]); it will be cast"
            ),
            Diagnostic::DtypeSubstituted { name, declared, stored } => write!(
                f,
                "tensor [{name}] is declared as [{declared}] but held as [{stored}] by this backend"
            ),
            Diagnostic::BatchSizeFallback { fallback } => write!(
                f,
                "batch size not set by model, using default value {fallback}"
            ),
        }
    }
}

/// A value together with the diagnostics produced while computing it.
///
/// ```
/// use hibachi_dispatch::{Diagnostic, Dispatched};
///
/// let result = Dispatched::new(vec![0.5, 0.25, 0.75], vec![Diagnostic::BatchSizeFallback { fallback: 10 }]);
/// let rows = result.map(|scores| scores.len());
///
/// assert!(rows.has_diagnostics());
/// assert_eq!(rows.into_inner(), 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatched<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Dispatched<T> {
    pub fn new(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Discards the diagnostics.
    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn map<U, F>(self, f: F) -> Dispatched<U>
    where F: FnOnce(T) -> U
    {
        Dispatched {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }
}
