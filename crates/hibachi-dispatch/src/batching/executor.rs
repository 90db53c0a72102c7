use std::collections::HashMap;
use std::ops::Range;

use tracing::debug;

use crate::address::ModelAddress;
use crate::backend::Backend;
use crate::error::{DispatchError, TransportError, ValidationError};
use crate::schema::ModelSchema;
use crate::tensor::operations::{held_dtype, leading_len, pad_rows_by_tiling, slice_rows};
use crate::transport::TransportClient;

/// The outputs returned for one batch window.
#[derive(Clone, Debug)]
pub struct WindowOutput<B>
where B: Backend
{
    pub window: Range<usize>,
    pub tensors: HashMap<String, B>,
}

/// Sends a request one fixed-size batch at a time.
///
/// Every round trip carries exactly `batch` rows per input, whatever the
/// length of the window it serves. Windows are sent strictly in order and the
/// next one is only built once the previous response has arrived.
pub struct InferenceExecutor<'a, B>
where B: Backend
{
    client: &'a dyn TransportClient<B>,
    address: &'a ModelAddress,
    schema: &'a ModelSchema,
    batch: usize,
}

impl<'a, B> InferenceExecutor<'a, B>
where B: Backend
{
    pub fn new(
        client: &'a dyn TransportClient<B>,
        address: &'a ModelAddress,
        schema: &'a ModelSchema,
        batch: usize,
    ) -> Self {
        Self {
            client,
            address,
            schema,
            batch,
        }
    }

    /// Runs every window in order, stopping at the first failure.
    pub async fn run(
        &self,
        inputs: &HashMap<String, B>,
        windows: &[Range<usize>],
        outputs: &[String],
    ) -> Result<Vec<WindowOutput<B>>, DispatchError> {
        let mut results = Vec::with_capacity(windows.len());
        for window in windows {
            results.push(self.run_window(inputs, window, outputs).await?);
        }
        Ok(results)
    }

    /// Builds the padded request for `window`, sends it and checks the response.
    ///
    /// # Implementation Notes
    ///
    /// For every declared input, in schema order:
    /// 1. Slices rows `[window.start, window.end)`
    /// 2. Tiles the slice's own rows until it has exactly `batch` rows
    /// 3. Casts it to the backend's storage type for the declared element type when the types differ
    pub async fn run_window(
        &self,
        inputs: &HashMap<String, B>,
        window: &Range<usize>,
        outputs: &[String],
    ) -> Result<WindowOutput<B>, DispatchError> {
        let mut request = Vec::with_capacity(self.schema.inputs().len());
        for (name, spec) in self.schema.inputs() {
            let tensor = inputs
                .get(name)
                .ok_or_else(|| ValidationError::MissingInput { name: name.clone() })?;
            let mut padded = pad_rows_by_tiling(&slice_rows(tensor, window)?, self.batch)?;
            let target = held_dtype::<B>(spec.datatype());
            if padded.dtype() != target {
                padded = padded.cast(target)?;
            }
            request.push((name.clone(), padded));
        }

        debug!(
            model = self.address.model(),
            start = window.start,
            stop = window.end,
            batch = self.batch,
            "sending batch"
        );
        let tensors = self
            .client
            .infer(self.address.model(), self.address.version(), request, outputs)
            .await?;

        self.check_response(&tensors, window, outputs)?;
        Ok(WindowOutput {
            window: window.clone(),
            tensors,
        })
    }

    fn check_response(
        &self,
        tensors: &HashMap<String, B>,
        window: &Range<usize>,
        outputs: &[String],
    ) -> Result<(), TransportError> {
        for name in outputs {
            let malformed = |message: String| TransportError::MalformedResponse {
                model: self.address.model().to_string(),
                message,
            };
            let tensor = tensors
                .get(name)
                .ok_or_else(|| malformed(format!("output [{name}] missing from response")))?;
            let rows = leading_len(tensor).unwrap_or(0);
            if rows < window.len() {
                return Err(malformed(format!(
                    "output [{name}] has {rows} rows, expected at least {}",
                    window.len()
                )));
            }
        }
        Ok(())
    }
}
