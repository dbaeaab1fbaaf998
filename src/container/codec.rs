//! Dataset payloads as single-row-group Parquet blobs.
//!
//! Each field becomes one non-nullable Arrow column. An unnamed single field is
//! stored under [`UNNAMED_FIELD`]; the manifest records whether the dataset is
//! compound, so the name can be dropped again on read.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, FixedSizeBinaryArray, Float32Array, Float64Array, Int16Array, Int32Array,
    Int64Array, Int8Array, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::buffer::Buffer;
use arrow::datatypes::{DataType, Field as ArrowField, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression as ParquetCompression, GzipLevel};
use parquet::file::properties::WriterProperties;

use super::compression::Compression;
use super::error::ContainerError;
use super::tree::{DatasetValue, Field};
use super::value::Column;

/// Column name used for single-typed datasets
pub const UNNAMED_FIELD: &str = "value";

fn data_type(column: &Column) -> Result<DataType, ContainerError> {
    Ok(match column {
        Column::I8(_) => DataType::Int8,
        Column::I16(_) => DataType::Int16,
        Column::I32(_) => DataType::Int32,
        Column::I64(_) => DataType::Int64,
        Column::U8(_) => DataType::UInt8,
        Column::U16(_) => DataType::UInt16,
        Column::U32(_) => DataType::UInt32,
        Column::U64(_) => DataType::UInt64,
        Column::F32(_) => DataType::Float32,
        Column::F64(_) => DataType::Float64,
        Column::Bytes { width, .. } => DataType::FixedSizeBinary(binary_width(*width)?),
    })
}

fn binary_width(width: usize) -> Result<i32, ContainerError> {
    i32::try_from(width)
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| ContainerError::InvalidDataset(format!("invalid string width {}", width)))
}

fn to_array(column: &Column) -> Result<ArrayRef, ContainerError> {
    let array: ArrayRef = match column {
        Column::I8(v) => Arc::new(Int8Array::from(v.clone())),
        Column::I16(v) => Arc::new(Int16Array::from(v.clone())),
        Column::I32(v) => Arc::new(Int32Array::from(v.clone())),
        Column::I64(v) => Arc::new(Int64Array::from(v.clone())),
        Column::U8(v) => Arc::new(UInt8Array::from(v.clone())),
        Column::U16(v) => Arc::new(UInt16Array::from(v.clone())),
        Column::U32(v) => Arc::new(UInt32Array::from(v.clone())),
        Column::U64(v) => Arc::new(UInt64Array::from(v.clone())),
        Column::F32(v) => Arc::new(Float32Array::from(v.clone())),
        Column::F64(v) => Arc::new(Float64Array::from(v.clone())),
        Column::Bytes { width, values } => {
            if let Some(long) = values.iter().find(|v| v.len() > *width) {
                return Err(ContainerError::InvalidDataset(format!(
                    "string of {} bytes exceeds width {}",
                    long.len(),
                    width
                )));
            }
            let mut flat = Vec::with_capacity(width * values.len());
            for value in values {
                flat.extend_from_slice(value);
                flat.resize(flat.len() + width - value.len(), 0);
            }
            Arc::new(FixedSizeBinaryArray::try_new(binary_width(*width)?, Buffer::from_vec(flat), None)?)
        }
    };
    Ok(array)
}

/// Serialize a dataset payload to a Parquet blob
pub fn encode_dataset(value: &DatasetValue, compression: Compression) -> Result<Vec<u8>, ContainerError> {
    let mut fields = Vec::with_capacity(value.fields().len());
    let mut arrays = Vec::with_capacity(value.fields().len());
    for field in value.fields() {
        let name = field.name.as_deref().unwrap_or(UNNAMED_FIELD);
        fields.push(ArrowField::new(name, data_type(&field.column)?, false));
        arrays.push(to_array(&field.column)?);
    }
    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(value.len()));
    let batch = RecordBatch::try_new_with_options(schema.clone(), arrays, &options)?;

    let codec = match compression {
        Compression::None => ParquetCompression::UNCOMPRESSED,
        Compression::Gzip(level) => ParquetCompression::GZIP(GzipLevel::try_new(level as u32)?),
    };
    let props = WriterProperties::builder().set_compression(codec).build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buffer)
}

fn empty_column(data_type: &DataType) -> Result<Column, ContainerError> {
    Ok(match data_type {
        DataType::Int8 => Column::I8(Vec::new()),
        DataType::Int16 => Column::I16(Vec::new()),
        DataType::Int32 => Column::I32(Vec::new()),
        DataType::Int64 => Column::I64(Vec::new()),
        DataType::UInt8 => Column::U8(Vec::new()),
        DataType::UInt16 => Column::U16(Vec::new()),
        DataType::UInt32 => Column::U32(Vec::new()),
        DataType::UInt64 => Column::U64(Vec::new()),
        DataType::Float32 => Column::F32(Vec::new()),
        DataType::Float64 => Column::F64(Vec::new()),
        DataType::FixedSizeBinary(width) => Column::Bytes {
            width: *width as usize,
            values: Vec::new(),
        },
        other => {
            return Err(ContainerError::InvalidFormat(format!(
                "unsupported column type {}",
                other
            )))
        }
    })
}

fn downcast<'a, T: Array + 'static>(array: &'a ArrayRef) -> Result<&'a T, ContainerError> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        ContainerError::InvalidFormat(format!("unexpected array type {}", array.data_type()))
    })
}

fn append(column: &mut Column, array: &ArrayRef) -> Result<(), ContainerError> {
    match column {
        Column::I8(v) => v.extend_from_slice(downcast::<Int8Array>(array)?.values()),
        Column::I16(v) => v.extend_from_slice(downcast::<Int16Array>(array)?.values()),
        Column::I32(v) => v.extend_from_slice(downcast::<Int32Array>(array)?.values()),
        Column::I64(v) => v.extend_from_slice(downcast::<Int64Array>(array)?.values()),
        Column::U8(v) => v.extend_from_slice(downcast::<UInt8Array>(array)?.values()),
        Column::U16(v) => v.extend_from_slice(downcast::<UInt16Array>(array)?.values()),
        Column::U32(v) => v.extend_from_slice(downcast::<UInt32Array>(array)?.values()),
        Column::U64(v) => v.extend_from_slice(downcast::<UInt64Array>(array)?.values()),
        Column::F32(v) => v.extend_from_slice(downcast::<Float32Array>(array)?.values()),
        Column::F64(v) => v.extend_from_slice(downcast::<Float64Array>(array)?.values()),
        Column::Bytes { values, .. } => {
            let strings = downcast::<FixedSizeBinaryArray>(array)?;
            values.extend((0..strings.len()).map(|i| strings.value(i).to_vec()));
        }
    }
    Ok(())
}

/// Read a dataset payload back from a Parquet blob
pub fn decode_dataset(bytes: Bytes, compound: bool) -> Result<DatasetValue, ContainerError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let mut columns = schema
        .fields()
        .iter()
        .map(|f| empty_column(f.data_type()))
        .collect::<Result<Vec<_>, _>>()?;
    for batch in reader {
        let batch = batch?;
        for (column, array) in columns.iter_mut().zip(batch.columns()) {
            append(column, array)?;
        }
    }

    let fields = schema
        .fields()
        .iter()
        .zip(columns)
        .map(|(f, column)| Field {
            name: compound.then(|| f.name().clone()),
            column,
        })
        .collect();
    DatasetValue::from_fields(fields)
}
