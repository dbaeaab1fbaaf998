//! Element types, typed columns and attribute values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed-width element type of a column or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Fixed-width byte string, NUL padded
    Bytes(usize),
}

impl DType {
    /// True for the eight integer types
    pub fn is_integer(&self) -> bool {
        !matches!(self, DType::F32 | DType::F64 | DType::Bytes(_))
    }

    /// True for `F32` and `F64`
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Storage size of one element in bytes
    pub fn size(&self) -> usize {
        match self {
            DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 => 2,
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 => 8,
            DType::Bytes(width) => *width,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::I8 => write!(f, "int8"),
            DType::I16 => write!(f, "int16"),
            DType::I32 => write!(f, "int32"),
            DType::I64 => write!(f, "int64"),
            DType::U8 => write!(f, "uint8"),
            DType::U16 => write!(f, "uint16"),
            DType::U32 => write!(f, "uint32"),
            DType::U64 => write!(f, "uint64"),
            DType::F32 => write!(f, "float32"),
            DType::F64 => write!(f, "float64"),
            DType::Bytes(width) => write!(f, "|S{}", width),
        }
    }
}

/// A single element read out of a column or attribute.
///
/// Equality is value equality: integers compare numerically whatever their
/// signedness, floats compare by bit pattern and byte strings ignore trailing
/// NUL padding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    Int(i64),
    UInt(u64),
    Float(#[serde(with = "float_bits::scalar")] f64),
    Bytes(Vec<u8>),
}

impl Scalar {
    /// Integer value widened to `i128`
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Scalar::Int(v) => Some(*v as i128),
            Scalar::UInt(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Numeric value as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::UInt(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Bytes(_) => None,
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
            (Scalar::Bytes(a), Scalar::Bytes(b)) => trim_nul(a) == trim_nul(b),
            (a, b) => match (a.as_i128(), b.as_i128()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::UInt(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Bytes(v) => write!(f, "b{:?}", String::from_utf8_lossy(trim_nul(v))),
        }
    }
}

/// Strip trailing NUL padding from a fixed-width byte string
pub fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

/// A one-dimensional typed array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(#[serde(with = "float_bits::vec32")] Vec<f32>),
    F64(#[serde(with = "float_bits::vec64")] Vec<f64>),
    Bytes { width: usize, values: Vec<Vec<u8>> },
}

macro_rules! with_values {
    ($column:expr, $v:ident => $e:expr) => {
        match $column {
            Column::I8($v) => $e,
            Column::I16($v) => $e,
            Column::I32($v) => $e,
            Column::I64($v) => $e,
            Column::U8($v) => $e,
            Column::U16($v) => $e,
            Column::U32($v) => $e,
            Column::U64($v) => $e,
            Column::F32($v) => $e,
            Column::F64($v) => $e,
            Column::Bytes { values: $v, .. } => $e,
        }
    };
}

macro_rules! map_values {
    ($column:expr, $v:ident => $e:expr) => {
        match $column {
            Column::I8($v) => Column::I8($e),
            Column::I16($v) => Column::I16($e),
            Column::I32($v) => Column::I32($e),
            Column::I64($v) => Column::I64($e),
            Column::U8($v) => Column::U8($e),
            Column::U16($v) => Column::U16($e),
            Column::U32($v) => Column::U32($e),
            Column::U64($v) => Column::U64($e),
            Column::F32($v) => Column::F32($e),
            Column::F64($v) => Column::F64($e),
            Column::Bytes { width, values: $v } => Column::Bytes {
                width: *width,
                values: $e,
            },
        }
    };
}

fn pick<T: Clone>(values: &[T], rows: &[usize]) -> Vec<T> {
    rows.iter().map(|&row| values[row].clone()).collect()
}

fn narrow<T: TryFrom<i128>>(values: &[i128]) -> Option<Vec<T>> {
    values.iter().map(|&v| T::try_from(v).ok()).collect()
}

impl Column {
    /// Empty column of the given type
    pub fn empty(dtype: DType) -> Self {
        match dtype {
            DType::I8 => Column::I8(Vec::new()),
            DType::I16 => Column::I16(Vec::new()),
            DType::I32 => Column::I32(Vec::new()),
            DType::I64 => Column::I64(Vec::new()),
            DType::U8 => Column::U8(Vec::new()),
            DType::U16 => Column::U16(Vec::new()),
            DType::U32 => Column::U32(Vec::new()),
            DType::U64 => Column::U64(Vec::new()),
            DType::F32 => Column::F32(Vec::new()),
            DType::F64 => Column::F64(Vec::new()),
            DType::Bytes(width) => Column::Bytes {
                width,
                values: Vec::new(),
            },
        }
    }

    /// Byte-string column; the width is the longest value (at least 1)
    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let values: Vec<Vec<u8>> = values.into_iter().map(|v| v.as_ref().to_vec()).collect();
        let width = values.iter().map(Vec::len).max().unwrap_or(0).max(1);
        Column::Bytes { width, values }
    }

    /// Build an integer column of `dtype`, or `None` if a value does not fit
    /// or `dtype` is not an integer type.
    pub fn from_ints(dtype: DType, values: &[i128]) -> Option<Self> {
        match dtype {
            DType::I8 => narrow(values).map(Column::I8),
            DType::I16 => narrow(values).map(Column::I16),
            DType::I32 => narrow(values).map(Column::I32),
            DType::I64 => narrow(values).map(Column::I64),
            DType::U8 => narrow(values).map(Column::U8),
            DType::U16 => narrow(values).map(Column::U16),
            DType::U32 => narrow(values).map(Column::U32),
            DType::U64 => narrow(values).map(Column::U64),
            DType::F32 | DType::F64 | DType::Bytes(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            Column::I8(_) => DType::I8,
            Column::I16(_) => DType::I16,
            Column::I32(_) => DType::I32,
            Column::I64(_) => DType::I64,
            Column::U8(_) => DType::U8,
            Column::U16(_) => DType::U16,
            Column::U32(_) => DType::U32,
            Column::U64(_) => DType::U64,
            Column::F32(_) => DType::F32,
            Column::F64(_) => DType::F64,
            Column::Bytes { width, .. } => DType::Bytes(*width),
        }
    }

    /// Element at `row`
    ///
    /// # Panics
    /// Panics if `row` is out of bounds.
    pub fn get(&self, row: usize) -> Scalar {
        match self {
            Column::I8(v) => Scalar::Int(v[row] as i64),
            Column::I16(v) => Scalar::Int(v[row] as i64),
            Column::I32(v) => Scalar::Int(v[row] as i64),
            Column::I64(v) => Scalar::Int(v[row]),
            Column::U8(v) => Scalar::UInt(v[row] as u64),
            Column::U16(v) => Scalar::UInt(v[row] as u64),
            Column::U32(v) => Scalar::UInt(v[row] as u64),
            Column::U64(v) => Scalar::UInt(v[row]),
            Column::F32(v) => Scalar::Float(v[row] as f64),
            Column::F64(v) => Scalar::Float(v[row]),
            Column::Bytes { values, .. } => Scalar::Bytes(trim_nul(&values[row]).to_vec()),
        }
    }

    /// Integer values widened to `i128`; `None` for float and string columns
    pub fn ints(&self) -> Option<Vec<i128>> {
        fn widen<T: Copy + Into<i128>>(v: &[T]) -> Vec<i128> {
            v.iter().map(|&x| x.into()).collect()
        }
        match self {
            Column::I8(v) => Some(widen(v)),
            Column::I16(v) => Some(widen(v)),
            Column::I32(v) => Some(widen(v)),
            Column::I64(v) => Some(widen(v)),
            Column::U8(v) => Some(widen(v)),
            Column::U16(v) => Some(widen(v)),
            Column::U32(v) => Some(widen(v)),
            Column::U64(v) => Some(widen(v)),
            _ => None,
        }
    }

    /// Float values widened to `f64`; `None` for every other type
    pub fn floats(&self) -> Option<Vec<f64>> {
        match self {
            Column::F32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Column::F64(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Numeric values as `f64`, integers included
    pub fn numbers(&self) -> Option<Vec<f64>> {
        self.floats()
            .or_else(|| self.ints().map(|v| v.into_iter().map(|x| x as f64).collect()))
    }

    /// Rows selected by index, in the given order
    pub fn take(&self, rows: &[usize]) -> Column {
        map_values!(self, v => pick(v, rows))
    }

    /// Element-wise value equality (see [`Scalar`]) with equal lengths
    pub fn same_values(&self, other: &Column) -> bool {
        self.len() == other.len() && (0..self.len()).all(|row| self.get(row) == other.get(row))
    }
}

/// Value of an attribute on a group or dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    /// A single element stored with an explicit type
    Scalar { dtype: DType, value: Scalar },
    /// A one-dimensional array
    Array(Column),
    /// Object references and other payloads with no numeric or string reading
    Opaque(Vec<u8>),
}

impl AttrValue {
    pub fn int(value: i64) -> Self {
        AttrValue::Scalar {
            dtype: DType::I64,
            value: Scalar::Int(value),
        }
    }

    pub fn uint(value: u64) -> Self {
        AttrValue::Scalar {
            dtype: DType::U64,
            value: Scalar::UInt(value),
        }
    }

    pub fn float(value: f64) -> Self {
        AttrValue::Scalar {
            dtype: DType::F64,
            value: Scalar::Float(value),
        }
    }

    pub fn string(value: impl AsRef<[u8]>) -> Self {
        let bytes = value.as_ref().to_vec();
        AttrValue::Scalar {
            dtype: DType::Bytes(bytes.len().max(1)),
            value: Scalar::Bytes(bytes),
        }
    }

    /// Signed or unsigned integer scalar, whichever holds `value`
    pub fn from_i128(value: i128) -> Option<Self> {
        if value >= 0 {
            u64::try_from(value).ok().map(AttrValue::uint)
        } else {
            i64::try_from(value).ok().map(AttrValue::int)
        }
    }

    /// Storage type of the value; `None` for opaque payloads
    pub fn dtype(&self) -> Option<DType> {
        match self {
            AttrValue::Scalar { dtype, .. } => Some(*dtype),
            AttrValue::Array(column) => Some(column.dtype()),
            AttrValue::Opaque(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            AttrValue::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_f64)
    }

    pub fn as_i128(&self) -> Option<i128> {
        self.as_scalar().and_then(Scalar::as_i128)
    }

    /// String reading of a byte-string scalar, padding removed
    pub fn as_str(&self) -> Option<String> {
        match self.as_scalar() {
            Some(Scalar::Bytes(bytes)) => Some(String::from_utf8_lossy(trim_nul(bytes)).into_owned()),
            _ => None,
        }
    }

    /// Array-aware value equality, ignoring storage width
    pub fn same_value(&self, other: &AttrValue) -> bool {
        match (self, other) {
            (AttrValue::Scalar { value: a, .. }, AttrValue::Scalar { value: b, .. }) => a == b,
            (AttrValue::Array(a), AttrValue::Array(b)) => a.same_values(b),
            (AttrValue::Opaque(a), AttrValue::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Scalar { value, .. } => write!(f, "{}", value),
            AttrValue::Array(column) => {
                write!(f, "[")?;
                for row in 0..column.len() {
                    if row > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", column.get(row))?;
                }
                write!(f, "]")
            }
            AttrValue::Opaque(bytes) => write!(f, "<opaque {} bytes>", bytes.len()),
        }
    }
}

/// Floats travel through JSON as their bit patterns so every value,
/// NaN payloads included, comes back identical.
mod float_bits {
    pub mod scalar {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u64(value.to_bits())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            u64::deserialize(deserializer).map(f64::from_bits)
        }
    }

    pub mod vec64 {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|v| v.to_bits()))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
            Vec::<u64>::deserialize(deserializer)
                .map(|bits| bits.into_iter().map(f64::from_bits).collect())
        }
    }

    pub mod vec32 {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(values: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|v| v.to_bits()))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
            Vec::<u32>::deserialize(deserializer)
                .map(|bits| bits.into_iter().map(f32::from_bits).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_equality_ignores_width() {
        assert_eq!(Scalar::Int(5), Scalar::UInt(5));
        assert_ne!(Scalar::Int(-1), Scalar::UInt(u64::MAX));
        assert_ne!(Scalar::Int(1), Scalar::Float(1.0));
        assert_eq!(Scalar::Bytes(b"ab\0\0".to_vec()), Scalar::Bytes(b"ab".to_vec()));
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Scalar::Float(f64::NAN), Scalar::Float(f64::NAN));
        assert_ne!(Scalar::Float(0.0), Scalar::Float(-0.0));
    }

    #[test]
    fn test_from_ints_rejects_overflow() {
        assert_eq!(Column::from_ints(DType::U8, &[0, 255]), Some(Column::U8(vec![0, 255])));
        assert_eq!(Column::from_ints(DType::U8, &[256]), None);
        assert_eq!(Column::from_ints(DType::I8, &[-129]), None);
        assert_eq!(Column::from_ints(DType::F64, &[1]), None);
    }

    #[test]
    fn test_take_and_same_values() {
        let column = Column::I32(vec![10, 20, 30, 40]);
        let taken = column.take(&[3, 1, 1]);
        assert_eq!(taken, Column::I32(vec![40, 20, 20]));
        assert!(Column::U8(vec![40, 20, 20]).same_values(&taken));
        assert!(!Column::U8(vec![40, 20]).same_values(&taken));
    }

    #[test]
    fn test_attr_json_keeps_float_bits() {
        let value = AttrValue::Array(Column::F64(vec![0.1, f64::NAN, -0.0]));
        let json = serde_json::to_string(&value).unwrap();
        let back: AttrValue = serde_json::from_str(&json).unwrap();
        assert!(value.same_value(&back));
    }

    #[test]
    fn test_string_attr() {
        let value = AttrValue::string("Analyses/EventDetection_000");
        assert_eq!(value.dtype(), Some(DType::Bytes(27)));
        assert_eq!(value.as_str().as_deref(), Some("Analyses/EventDetection_000"));
        assert_eq!(AttrValue::string("").dtype(), Some(DType::Bytes(1)));
    }
}
