//! A deterministic in-memory transport used by the crate's tests
//!
//! Lazy fetches yield once so that concurrent first callers overlap.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Connector, TransportClient};
use crate::backend::mock_tensor::MockTensor;
use crate::backend::DataType;
use crate::config::ClientOptions;
use crate::error::TransportError;

type ModelFn = dyn Fn(&[(String, MockTensor)], &[String]) -> HashMap<String, MockTensor> + Send + Sync;

/// One recorded `infer` call
#[derive(Clone, Debug)]
pub(crate) struct RecordedInfer {
    pub inputs: Vec<(String, MockTensor)>,
    pub outputs: Vec<String>,
}

pub(crate) struct MockTransport {
    metadata: Value,
    config: Value,
    model: Box<ModelFn>,
    fail_infer_at: Option<usize>,
    metadata_calls: AtomicUsize,
    config_calls: AtomicUsize,
    infers: Mutex<Vec<RecordedInfer>>,
}

impl MockTransport {
    pub fn new<F>(metadata: Value, config: Value, model: F) -> Self
    where F: Fn(&[(String, MockTensor)], &[String]) -> HashMap<String, MockTensor> + Send + Sync + 'static
    {
        Self {
            metadata,
            config,
            model: Box::new(model),
            fail_infer_at: None,
            metadata_calls: AtomicUsize::new(0),
            config_calls: AtomicUsize::new(0),
            infers: Mutex::new(vec![]),
        }
    }

    /// Input `x` of shape `(-1, 4)`, output `y` of shape `(-1, 2)` holding
    /// `[row sum, first element]` of each row, max batch size `3`.
    pub fn row_sum() -> Self {
        Self::new(
            json!({
                "name": "row_sum",
                "versions": ["1"],
                "platform": "onnxruntime_onnx",
                "inputs": [{ "name": "x", "datatype": "FP32", "shape": [-1, 4] }],
                "outputs": [{ "name": "y", "datatype": "FP32", "shape": [-1, 2] }]
            }),
            json!({ "config": { "name": "row_sum", "max_batch_size": 3 } }),
            |inputs, outputs| {
                let x = &inputs.iter().find(|(name, _)| name == "x").expect("x is sent").1;
                let mut data = vec![];
                for row in x.rows() {
                    data.push(row.iter().sum::<f64>());
                    data.push(row[0]);
                }
                let y = MockTensor::new(vec![x.shape[0], 2], DataType::F32, data);
                outputs
                    .iter()
                    .filter(|name| name.as_str() == "y")
                    .map(|name| (name.clone(), y.clone()))
                    .collect()
            },
        )
    }

    /// Fails the `call`-th infer request (zero based).
    pub fn failing_at(mut self, call: usize) -> Self {
        self.fail_infer_at = Some(call);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn config_calls(&self) -> usize {
        self.config_calls.load(Ordering::SeqCst)
    }

    pub fn infer_calls(&self) -> usize {
        self.infers.lock().unwrap().len()
    }

    pub fn recorded(&self) -> Vec<RecordedInfer> {
        self.infers.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportClient<MockTensor> for MockTransport {
    async fn model_metadata(&self, _model: &str, _version: &str) -> Result<Value, TransportError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self.metadata.clone())
    }

    async fn model_config(&self, _model: &str, _version: &str) -> Result<Value, TransportError> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self.config.clone())
    }

    async fn infer(
        &self,
        model: &str,
        _version: &str,
        inputs: Vec<(String, MockTensor)>,
        outputs: &[String],
    ) -> Result<HashMap<String, MockTensor>, TransportError> {
        let call = {
            let mut infers = self.infers.lock().unwrap();
            infers.push(RecordedInfer {
                inputs: inputs.clone(),
                outputs: outputs.to_vec(),
            });
            infers.len() - 1
        };
        if self.fail_infer_at == Some(call) {
            return Err(TransportError::Request {
                model: model.to_string(),
                source: "connection reset by peer".into(),
            });
        }
        Ok((self.model)(&inputs, outputs))
    }
}

#[derive(Clone)]
pub(crate) struct MockConnector {
    transport: Arc<MockTransport>,
    connections: Arc<Mutex<Vec<(String, ClientOptions)>>>,
}

impl MockConnector {
    pub fn new(transport: Arc<MockTransport>) -> Self {
        Self {
            transport,
            connections: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn connections(&self) -> Vec<(String, ClientOptions)> {
        self.connections.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector<MockTensor> for MockConnector {
    async fn connect(
        &self,
        host: &str,
        options: &ClientOptions,
    ) -> Result<Arc<dyn TransportClient<MockTensor>>, TransportError> {
        self.connections
            .lock()
            .unwrap()
            .push((host.to_string(), options.clone()));
        tokio::task::yield_now().await;
        let client: Arc<dyn TransportClient<MockTensor>> = self.transport.clone();
        Ok(client)
    }
}

/// A connector for hosts that never answer
pub(crate) struct UnreachableConnector;

#[async_trait]
impl Connector<MockTensor> for UnreachableConnector {
    async fn connect(
        &self,
        host: &str,
        _options: &ClientOptions,
    ) -> Result<Arc<dyn TransportClient<MockTensor>>, TransportError> {
        Err(TransportError::Connection {
            address: host.to_string(),
            source: "connection refused".into(),
        })
    }
}
