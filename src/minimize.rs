//! Smallest storage type for integer and string values.
//!
//! Values are classified once into a [`ValueClass`], and the storage type is
//! picked from the class. Integers shrink to the narrowest standard width that
//! holds their range (unsigned whenever nothing is negative), strings to the
//! longest value. Floats keep their width.

use log::trace;
use thiserror::Error;

use crate::container::{
    trim_nul, AttrValue, Column, ContainerError, DType, DatasetValue, Field, Scalar,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Type error: {0}")]
pub struct TypeError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    F32,
    F64,
}

/// What a value is, independent of how it is currently stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueClass {
    Integer { min: i64, max: i64 },
    UnsignedInteger { max: u64 },
    Float(FloatWidth),
    String { max_len: usize },
    ArrayOf(Box<ValueClass>),
}

fn integer_class(min: i128, max: i128) -> ValueClass {
    if min >= 0 {
        ValueClass::UnsignedInteger {
            max: u64::try_from(max).unwrap_or(u64::MAX),
        }
    } else {
        ValueClass::Integer {
            min: i64::try_from(min).unwrap_or(i64::MIN),
            max: i64::try_from(max).unwrap_or(i64::MAX),
        }
    }
}

/// Classify the elements of a column
pub fn classify_column(column: &Column) -> ValueClass {
    match column {
        Column::F32(_) => ValueClass::Float(FloatWidth::F32),
        Column::F64(_) => ValueClass::Float(FloatWidth::F64),
        Column::Bytes { values, .. } => ValueClass::String {
            max_len: values.iter().map(|v| trim_nul(v).len()).max().unwrap_or(0),
        },
        _ => {
            let ints = column.ints().unwrap_or_default();
            match (ints.iter().min(), ints.iter().max()) {
                (Some(&min), Some(&max)) => integer_class(min, max),
                _ => ValueClass::UnsignedInteger { max: 0 },
            }
        }
    }
}

/// Classify an attribute value; opaque payloads have no class
pub fn classify(value: &AttrValue) -> Result<ValueClass, TypeError> {
    match value {
        AttrValue::Scalar { dtype, value } => Ok(match value {
            Scalar::Int(v) => integer_class(*v as i128, *v as i128),
            Scalar::UInt(v) => ValueClass::UnsignedInteger { max: *v },
            Scalar::Float(_) if *dtype == DType::F32 => ValueClass::Float(FloatWidth::F32),
            Scalar::Float(_) => ValueClass::Float(FloatWidth::F64),
            Scalar::Bytes(bytes) => ValueClass::String {
                max_len: trim_nul(bytes).len(),
            },
        }),
        AttrValue::Array(column) => Ok(ValueClass::ArrayOf(Box::new(classify_column(column)))),
        AttrValue::Opaque(bytes) => Err(opaque_error(bytes)),
    }
}

fn opaque_error(bytes: &[u8]) -> TypeError {
    TypeError(format!(
        "opaque value of {} bytes has no numeric or string reading",
        bytes.len()
    ))
}

/// Storage type for a class
pub fn min_dtype(class: &ValueClass) -> DType {
    match class {
        ValueClass::UnsignedInteger { max } => match *max {
            m if m <= u8::MAX as u64 => DType::U8,
            m if m <= u16::MAX as u64 => DType::U16,
            m if m <= u32::MAX as u64 => DType::U32,
            _ => DType::U64,
        },
        ValueClass::Integer { min, max } => {
            let fits = |lo: i64, hi: i64| *min >= lo && *max <= hi;
            if fits(i8::MIN as i64, i8::MAX as i64) {
                DType::I8
            } else if fits(i16::MIN as i64, i16::MAX as i64) {
                DType::I16
            } else if fits(i32::MIN as i64, i32::MAX as i64) {
                DType::I32
            } else {
                DType::I64
            }
        }
        ValueClass::Float(FloatWidth::F32) => DType::F32,
        ValueClass::Float(FloatWidth::F64) => DType::F64,
        ValueClass::String { max_len } => DType::Bytes((*max_len).max(1)),
        ValueClass::ArrayOf(inner) => min_dtype(inner),
    }
}

/// Integer column in the smallest type holding `values`
pub fn minimal_int_column(values: &[i128]) -> Result<Column, TypeError> {
    let class = match (values.iter().min(), values.iter().max()) {
        (Some(&min), Some(&max)) => {
            if min < i64::MIN as i128 || max > u64::MAX as i128 || (min < 0 && max > i64::MAX as i128) {
                return Err(TypeError(format!(
                    "integer range [{}, {}] does not fit a 64-bit type",
                    min, max
                )));
            }
            integer_class(min, max)
        }
        _ => ValueClass::UnsignedInteger { max: 0 },
    };
    let dtype = min_dtype(&class);
    Column::from_ints(dtype, values)
        .ok_or_else(|| TypeError(format!("values do not fit {}", dtype)))
}

/// Re-store a column in its minimal type
pub fn minimize_column(column: &Column) -> Column {
    match column {
        Column::F32(_) | Column::F64(_) => column.clone(),
        Column::Bytes { values, .. } => {
            let values: Vec<Vec<u8>> = values.iter().map(|v| trim_nul(v).to_vec()).collect();
            Column::strings(values)
        }
        _ => {
            let ints = column.ints().unwrap_or_default();
            let dtype = min_dtype(&classify_column(column));
            Column::from_ints(dtype, &ints).unwrap_or_else(|| column.clone())
        }
    }
}

/// Re-store an attribute value in its minimal type
pub fn minimize_attr(value: &AttrValue) -> Result<AttrValue, TypeError> {
    match value {
        AttrValue::Scalar { value: scalar, .. } => {
            let dtype = min_dtype(&classify(value)?);
            let scalar = match scalar {
                Scalar::Bytes(bytes) => Scalar::Bytes(trim_nul(bytes).to_vec()),
                other => other.clone(),
            };
            Ok(AttrValue::Scalar {
                dtype,
                value: scalar,
            })
        }
        AttrValue::Array(column) => Ok(AttrValue::Array(minimize_column(column))),
        AttrValue::Opaque(bytes) => Err(opaque_error(bytes)),
    }
}

/// Minimize every field of a dataset
pub fn minimize_dataset(value: DatasetValue) -> Result<DatasetValue, ContainerError> {
    let fields = value
        .into_fields()
        .into_iter()
        .map(|field| {
            let column = minimize_column(&field.column);
            trace!(
                "{}: {} -> {}",
                field.name.as_deref().unwrap_or("<value>"),
                field.column.dtype(),
                column.dtype()
            );
            Field {
                name: field.name,
                column,
            }
        })
        .collect();
    DatasetValue::from_fields(fields)
}
