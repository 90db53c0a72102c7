use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

/// Element types understood by the serving endpoint, named as they appear on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
    BF16,
    Bytes,
}

impl DataType {
    /// The wire name of this type, e.g. `FP32`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Bool => "BOOL",
            DataType::U8 => "UINT8",
            DataType::U16 => "UINT16",
            DataType::U32 => "UINT32",
            DataType::U64 => "UINT64",
            DataType::I8 => "INT8",
            DataType::I16 => "INT16",
            DataType::I32 => "INT32",
            DataType::I64 => "INT64",
            DataType::F16 => "FP16",
            DataType::F32 => "FP32",
            DataType::F64 => "FP64",
            DataType::BF16 => "BF16",
            DataType::Bytes => "BYTES",
        }
    }

    /// Whether values of this type are integral.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Bool
                | DataType::U8
                | DataType::U16
                | DataType::U32
                | DataType::U64
                | DataType::I8
                | DataType::I16
                | DataType::I32
                | DataType::I64
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dtype = match s.trim() {
            "BOOL" => DataType::Bool,
            "UINT8" => DataType::U8,
            "UINT16" => DataType::U16,
            "UINT32" => DataType::U32,
            "UINT64" => DataType::U64,
            "INT8" => DataType::I8,
            "INT16" => DataType::I16,
            "INT32" => DataType::I32,
            "INT64" => DataType::I64,
            "FP16" => DataType::F16,
            "FP32" => DataType::F32,
            "FP64" => DataType::F64,
            "BF16" => DataType::BF16,
            "BYTES" => DataType::Bytes,
            other => return Err(SchemaError::UnknownDataType(other.to_string())),
        };
        Ok(dtype)
    }
}
