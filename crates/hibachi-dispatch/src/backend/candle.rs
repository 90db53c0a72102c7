use super::{Backend, DataType};
use crate::error::TensorError;
use candle_core::{DType, Device, Tensor};

impl From<candle_core::Error> for TensorError {
    fn from(error: candle_core::Error) -> Self {
        TensorError::Backend(Box::new(error))
    }
}

// Types candle has no storage for are widened: narrow signed ints and UINT64
// to I64, BOOL to U8, UINT16 to U32
fn to_candle_dtype(dtype: DataType) -> Result<DType, TensorError> {
    match dtype {
        DataType::Bool | DataType::U8 => Ok(DType::U8),
        DataType::U16 | DataType::U32 => Ok(DType::U32),
        DataType::F16 => Ok(DType::F16),
        DataType::BF16 => Ok(DType::BF16),
        DataType::F32 => Ok(DType::F32),
        DataType::F64 => Ok(DType::F64),
        other if other.is_integer() => Ok(DType::I64),
        other => Err(TensorError::UnsupportedDataType(other)),
    }
}

fn from_candle_dtype(dtype: DType) -> DataType {
    match dtype {
        DType::U8 => DataType::U8,
        DType::U32 => DataType::U32,
        DType::I64 => DataType::I64,
        DType::F16 => DataType::F16,
        DType::BF16 => DataType::BF16,
        DType::F32 => DataType::F32,
        DType::F64 => DataType::F64,
    }
}

impl Backend for Tensor {
    fn shape(&self) -> Vec<usize> {
        self.dims().to_vec()
    }

    fn dtype(&self) -> DataType {
        from_candle_dtype(Tensor::dtype(self))
    }

    fn cat(tensors: &[Self], dim: usize) -> Result<Self, TensorError> {
        if tensors.is_empty() {
            return Err(TensorError::EmptyConcat);
        }
        Ok(Tensor::cat(tensors, dim)?)
    }

    fn slice(&self, dimension: usize, start: usize, len: usize) -> Result<Self, TensorError> {
        let dims = self.dims();
        let size = *dims.get(dimension).ok_or(TensorError::DimensionOutOfRange {
            dim: dimension,
            rank: dims.len(),
        })?;
        if start + len > size {
            return Err(TensorError::OutOfBounds {
                dim: dimension,
                start,
                end: start + len,
                size,
            });
        }
        Ok(self.narrow(dimension, start, len)?)
    }

    fn repeat(&self, dim: usize, times: usize) -> Result<Self, TensorError> {
        let rank = self.rank();
        if dim >= rank {
            return Err(TensorError::DimensionOutOfRange { dim, rank });
        }
        let mut repeats = vec![1usize; rank];
        repeats[dim] = times;
        Ok(Tensor::repeat(self, repeats)?)
    }

    fn cast(&self, dtype: DataType) -> Result<Self, TensorError> {
        Ok(self.to_dtype(to_candle_dtype(dtype)?)?)
    }

    fn zeros(shape: &[usize], dtype: DataType) -> Result<Self, TensorError> {
        Ok(Tensor::zeros(shape.to_vec(), to_candle_dtype(dtype)?, &Device::Cpu)?)
    }

    fn storage_dtype(dtype: DataType) -> Option<DataType> {
        to_candle_dtype(dtype).ok().map(from_candle_dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::operations::pad_rows_by_tiling;

    fn rows(n: usize, width: usize) -> Tensor {
        let data: Vec<f32> = (0..n * width).map(|i| i as f32).collect();
        Tensor::from_vec(data, (n, width), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_shape_and_dtype() {
        let t = rows(3, 4);
        assert_eq!(Backend::shape(&t), vec![3, 4]);
        assert_eq!(Backend::dtype(&t), DataType::F32);
    }

    #[test]
    fn test_slice_rows() {
        let t = rows(5, 2);
        let s = Backend::slice(&t, 0, 1, 2).unwrap();
        assert_eq!(s.to_vec2::<f32>().unwrap(), vec![vec![2.0, 3.0], vec![4.0, 5.0]]);
    }

    #[test]
    fn test_slice_out_of_bounds() {
        let t = rows(2, 2);
        let err = Backend::slice(&t, 0, 1, 2).unwrap_err();
        assert!(matches!(err, TensorError::OutOfBounds { size: 2, end: 3, .. }));
    }

    #[test]
    fn test_repeat_and_cat_along_rows() {
        let t = rows(2, 1);
        let r = Backend::repeat(&t, 0, 2).unwrap();
        assert_eq!(r.to_vec2::<f32>().unwrap(), vec![vec![0.0], vec![1.0], vec![0.0], vec![1.0]]);

        let c = <Tensor as Backend>::cat(&[t.clone(), t], 0).unwrap();
        assert_eq!(Backend::shape(&c), vec![4, 1]);
    }

    #[test]
    fn test_tiling_pad_repeats_own_rows() {
        let t = rows(2, 2);
        let padded = pad_rows_by_tiling(&t, 5).unwrap();
        assert_eq!(
            padded.to_vec2::<f32>().unwrap(),
            vec![
                vec![0.0, 1.0],
                vec![2.0, 3.0],
                vec![0.0, 1.0],
                vec![2.0, 3.0],
                vec![0.0, 1.0],
            ]
        );
    }

    #[test]
    fn test_cast_and_unsupported_dtype() {
        let t = rows(1, 3);
        let c = Backend::cast(&t, DataType::F64).unwrap();
        assert_eq!(Backend::dtype(&c), DataType::F64);

        let err = Backend::cast(&t, DataType::Bytes).unwrap_err();
        assert!(matches!(err, TensorError::UnsupportedDataType(DataType::Bytes)));
    }

    #[test]
    fn test_cast_widens_types_candle_cannot_hold() {
        let t = Tensor::from_vec(vec![1.7f32, -2.2, 3.0], 3, &Device::Cpu).unwrap();

        let ints = Backend::cast(&t, DataType::I32).unwrap();
        assert_eq!(Backend::dtype(&ints), DataType::I64);
        assert_eq!(ints.to_vec1::<i64>().unwrap(), vec![1, -2, 3]);

        assert_eq!(Backend::dtype(&Backend::cast(&t, DataType::I8).unwrap()), DataType::I64);
        assert_eq!(Backend::dtype(&Backend::cast(&t, DataType::U16).unwrap()), DataType::U32);
    }

    #[test]
    fn test_storage_dtype() {
        let storage = <Tensor as Backend>::storage_dtype;
        assert_eq!(storage(DataType::F32), Some(DataType::F32));
        assert_eq!(storage(DataType::I16), Some(DataType::I64));
        assert_eq!(storage(DataType::U64), Some(DataType::I64));
        assert_eq!(storage(DataType::Bool), Some(DataType::U8));
        assert_eq!(storage(DataType::U16), Some(DataType::U32));
        assert_eq!(storage(DataType::Bytes), None);
    }

    #[test]
    fn test_zero_length_zeros() {
        let t = <Tensor as Backend>::zeros(&[0, 3], DataType::F32).unwrap();
        assert_eq!(Backend::shape(&t), vec![0, 3]);

        let mask = <Tensor as Backend>::zeros(&[0, 2], DataType::Bool).unwrap();
        assert_eq!(Backend::dtype(&mask), DataType::U8);
    }
}
