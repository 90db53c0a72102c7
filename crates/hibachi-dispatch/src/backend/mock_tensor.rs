use std::fmt;
use crate::backend::{Backend, DataType};
use crate::error::TensorError;

// A simple row-major tensor implementation for testing
#[derive(Clone, Debug, PartialEq)]
pub struct MockTensor {
    pub(crate) shape: Vec<usize>,
    pub(crate) dtype: DataType,
    pub(crate) data: Vec<f64>,
}

impl MockTensor {
    pub fn new(shape: Vec<usize>, dtype: DataType, data: Vec<f64>) -> Self {
        assert_eq!(shape.iter().product::<usize>(), data.len(), "data does not fill shape");
        Self { shape, dtype, data }
    }

    /// Tensor of `shape` holding `0, 1, 2, ...` in row-major order
    pub fn arange(shape: Vec<usize>, dtype: DataType) -> Self {
        let n = shape.iter().product::<usize>();
        Self::new(shape, dtype, (0..n).map(|i| i as f64).collect())
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        let width = self.row_width();
        if width == 0 {
            return vec![vec![]; self.shape.first().copied().unwrap_or(0)];
        }
        self.data.chunks(width).map(|c| c.to_vec()).collect()
    }

    fn row_width(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    // (outer, size, inner) strides around `dim`
    fn split_at(&self, dim: usize) -> Result<(usize, usize, usize), TensorError> {
        if dim >= self.shape.len() {
            return Err(TensorError::DimensionOutOfRange { dim, rank: self.shape.len() });
        }
        let outer = self.shape[..dim].iter().product();
        let inner = self.shape[dim + 1..].iter().product();
        Ok((outer, self.shape[dim], inner))
    }
}

impl fmt::Display for MockTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MockTensor({:?}, {}, {:?})", self.shape, self.dtype, self.data)
    }
}

impl Backend for MockTensor {
    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn dtype(&self) -> DataType {
        self.dtype
    }

    fn cat(tensors: &[Self], dim: usize) -> Result<Self, TensorError> {
        let first = tensors.first().ok_or(TensorError::EmptyConcat)?;
        let (outer, _, inner) = first.split_at(dim)?;
        for t in tensors.iter().skip(1) {
            let compatible = t.shape.len() == first.shape.len()
                && t.shape.iter().zip(first.shape.iter()).enumerate().all(|(i, (a, b))| i == dim || a == b);
            if !compatible {
                return Err(TensorError::IncompatibleShapes {
                    dim,
                    left: first.shape.clone(),
                    right: t.shape.clone(),
                });
            }
        }

        let mut data = Vec::new();
        for o in 0..outer {
            for t in tensors {
                let chunk = t.shape[dim] * inner;
                data.extend_from_slice(&t.data[o * chunk..(o + 1) * chunk]);
            }
        }
        let mut shape = first.shape.clone();
        shape[dim] = tensors.iter().map(|t| t.shape[dim]).sum();
        Ok(MockTensor::new(shape, first.dtype, data))
    }

    fn slice(&self, dimension: usize, start: usize, len: usize) -> Result<Self, TensorError> {
        let (outer, size, inner) = self.split_at(dimension)?;
        if start + len > size {
            return Err(TensorError::OutOfBounds { dim: dimension, start, end: start + len, size });
        }
        let mut data = Vec::with_capacity(outer * len * inner);
        for o in 0..outer {
            let base = o * size * inner;
            data.extend_from_slice(&self.data[base + start * inner..base + (start + len) * inner]);
        }
        let mut shape = self.shape.clone();
        shape[dimension] = len;
        Ok(MockTensor::new(shape, self.dtype, data))
    }

    fn repeat(&self, dim: usize, times: usize) -> Result<Self, TensorError> {
        let (outer, size, inner) = self.split_at(dim)?;
        let chunk = size * inner;
        let mut data = Vec::with_capacity(self.data.len() * times);
        for o in 0..outer {
            for _ in 0..times {
                data.extend_from_slice(&self.data[o * chunk..(o + 1) * chunk]);
            }
        }
        let mut shape = self.shape.clone();
        shape[dim] *= times;
        Ok(MockTensor::new(shape, self.dtype, data))
    }

    fn cast(&self, dtype: DataType) -> Result<Self, TensorError> {
        if dtype == DataType::Bytes {
            return Err(TensorError::UnsupportedDataType(dtype));
        }
        let data = if dtype.is_integer() {
            self.data.iter().map(|v| v.trunc()).collect()
        } else {
            self.data.clone()
        };
        Ok(MockTensor::new(self.shape.clone(), dtype, data))
    }

    fn zeros(shape: &[usize], dtype: DataType) -> Result<Self, TensorError> {
        let n = shape.iter().product();
        Ok(MockTensor::new(shape.to_vec(), dtype, vec![0.0; n]))
    }

    fn storage_dtype(dtype: DataType) -> Option<DataType> {
        (dtype != DataType::Bytes).then_some(dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_middle_dimension() {
        let t = MockTensor::arange(vec![2, 3, 2], DataType::F32);
        let s = t.slice(1, 1, 2).unwrap();
        assert_eq!(s.shape, vec![2, 2, 2]);
        assert_eq!(s.data, vec![2.0, 3.0, 4.0, 5.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_cat_rejects_mismatched_trailing_dims() {
        let a = MockTensor::arange(vec![1, 2], DataType::F32);
        let b = MockTensor::arange(vec![1, 3], DataType::F32);
        assert!(matches!(
            MockTensor::cat(&[a, b], 0),
            Err(TensorError::IncompatibleShapes { .. })
        ));
    }

    #[test]
    fn test_repeat_rows() {
        let t = MockTensor::arange(vec![2, 1], DataType::F32);
        let r = t.repeat(0, 3).unwrap();
        assert_eq!(r.data, vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_cast_truncates_to_integers() {
        let t = MockTensor::new(vec![2], DataType::F64, vec![1.5, -2.7]);
        let c = t.cast(DataType::I64).unwrap();
        assert_eq!(c.dtype, DataType::I64);
        assert_eq!(c.data, vec![1.0, -2.0]);
    }
}
