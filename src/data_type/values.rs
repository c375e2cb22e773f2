use num::NumCast;
use serde_json::Value;

use super::{DataTypeError, Element, NumType};

/// A flat buffer of elements of a runtime-known [`NumType`].
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum ArrayValues {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Char(Vec<u8>),
    Binary(Vec<u8>),
}

/// Apply `$body` to the vector inside any [`ArrayValues`] variant.
macro_rules! map_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            ArrayValues::Float32($v) => $body,
            ArrayValues::Float64($v) => $body,
            ArrayValues::Int8($v) => $body,
            ArrayValues::UInt8($v) => $body,
            ArrayValues::Int16($v) => $body,
            ArrayValues::UInt16($v) => $body,
            ArrayValues::Int32($v) => $body,
            ArrayValues::UInt32($v) => $body,
            ArrayValues::Int64($v) => $body,
            ArrayValues::UInt64($v) => $body,
            ArrayValues::Char($v) => $body,
            ArrayValues::Binary($v) => $body,
        }
    };
}

/// Apply `$body` to the vector inside a numeric [`ArrayValues`] variant, or evaluate `$other` for text and binary.
macro_rules! map_numeric_values {
    ($values:expr, $v:ident => $body:expr, _ => $other:expr) => {
        match $values {
            ArrayValues::Float32($v) => $body,
            ArrayValues::Float64($v) => $body,
            ArrayValues::Int8($v) => $body,
            ArrayValues::UInt8($v) => $body,
            ArrayValues::Int16($v) => $body,
            ArrayValues::UInt16($v) => $body,
            ArrayValues::Int32($v) => $body,
            ArrayValues::UInt32($v) => $body,
            ArrayValues::Int64($v) => $body,
            ArrayValues::UInt64($v) => $body,
            ArrayValues::Char(_) | ArrayValues::Binary(_) => $other,
        }
    };
}

fn float_to_json(value: f64) -> Value {
    if value.is_nan() {
        Value::from("NaN")
    } else if value.is_infinite() {
        Value::from(if value.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        })
    } else {
        serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

fn float_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(string) => match string.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn int_from_json<T: NumCast>(value: &Value) -> Option<T> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .and_then(T::from)
            .or_else(|| number.as_u64().and_then(T::from)),
        _ => None,
    }
}

impl ArrayValues {
    /// Create zero valued elements of `num_type`.
    #[must_use]
    pub fn zeros(num_type: NumType, len: usize) -> Self {
        match num_type {
            NumType::Float32 => Self::Float32(vec![0.0; len]),
            NumType::Float64 => Self::Float64(vec![0.0; len]),
            NumType::Int8 => Self::Int8(vec![0; len]),
            NumType::UInt8 => Self::UInt8(vec![0; len]),
            NumType::Int16 => Self::Int16(vec![0; len]),
            NumType::UInt16 => Self::UInt16(vec![0; len]),
            NumType::Int32 => Self::Int32(vec![0; len]),
            NumType::UInt32 => Self::UInt32(vec![0; len]),
            NumType::Int64 => Self::Int64(vec![0; len]),
            NumType::UInt64 => Self::UInt64(vec![0; len]),
            NumType::Char => Self::Char(vec![0; len]),
            NumType::Binary => Self::Binary(vec![0; len]),
        }
    }

    /// Create values from elements.
    #[must_use]
    pub fn from_elements<T: Element>(elements: Vec<T>) -> Self {
        T::into_values(elements)
    }

    /// Decode values of `num_type` from little-endian bytes.
    ///
    /// # Errors
    /// Returns [`DataTypeError::InvalidBytesLength`] if `bytes` is not a whole number of elements.
    pub fn from_bytes(num_type: NumType, bytes: &[u8]) -> Result<Self, DataTypeError> {
        Ok(match num_type {
            NumType::Float32 => Self::Float32(f32::from_bytes(bytes)?),
            NumType::Float64 => Self::Float64(f64::from_bytes(bytes)?),
            NumType::Int8 => Self::Int8(i8::from_bytes(bytes)?),
            NumType::UInt8 => Self::UInt8(bytes.to_vec()),
            NumType::Int16 => Self::Int16(i16::from_bytes(bytes)?),
            NumType::UInt16 => Self::UInt16(u16::from_bytes(bytes)?),
            NumType::Int32 => Self::Int32(i32::from_bytes(bytes)?),
            NumType::UInt32 => Self::UInt32(u32::from_bytes(bytes)?),
            NumType::Int64 => Self::Int64(i64::from_bytes(bytes)?),
            NumType::UInt64 => Self::UInt64(u64::from_bytes(bytes)?),
            NumType::Char => Self::Char(bytes.to_vec()),
            NumType::Binary => Self::Binary(bytes.to_vec()),
        })
    }

    /// Encode the values as little-endian bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        map_values!(self, v => Element::to_bytes(v.as_slice()))
    }

    /// The storage type of the values.
    #[must_use]
    pub const fn num_type(&self) -> NumType {
        match self {
            Self::Float32(_) => NumType::Float32,
            Self::Float64(_) => NumType::Float64,
            Self::Int8(_) => NumType::Int8,
            Self::UInt8(_) => NumType::UInt8,
            Self::Int16(_) => NumType::Int16,
            Self::UInt16(_) => NumType::UInt16,
            Self::Int32(_) => NumType::Int32,
            Self::UInt32(_) => NumType::UInt32,
            Self::Int64(_) => NumType::Int64,
            Self::UInt64(_) => NumType::UInt64,
            Self::Char(_) => NumType::Char,
            Self::Binary(_) => NumType::Binary,
        }
    }

    /// The number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        map_values!(self, v => v.len())
    }

    /// Returns true if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the first `len` elements.
    pub fn truncate(&mut self, len: usize) {
        map_values!(self, v => v.truncate(len));
    }

    /// Convert numeric values element-wise with [`NumCast`].
    ///
    /// Returns [`None`] for text and binary values, or if any value is out of range for `T`.
    #[must_use]
    pub fn cast<T: NumCast>(&self) -> Option<Vec<T>> {
        map_numeric_values!(self, v => v.iter().map(|&e| T::from(e)).collect(), _ => None)
    }

    /// Coerce the values to `i32` without loss.
    ///
    /// Integer types of 32 bits or fewer are accepted, `UINT32` only if every value fits.
    ///
    /// # Errors
    /// Returns [`DataTypeError::Coercion`] for 64-bit integers, floats, text, binary, or an out of range `UINT32` value.
    pub fn coerce_i32(&self) -> Result<Vec<i32>, DataTypeError> {
        let stored = self.num_type();
        if !stored.is_int32_or_less() {
            return Err(DataTypeError::Coercion {
                stored,
                target: "int",
                reason: "not an integer type of 32 bits or fewer".to_string(),
            });
        }
        self.cast::<i32>().ok_or_else(|| DataTypeError::Coercion {
            stored,
            target: "int",
            reason: "value out of range".to_string(),
        })
    }

    /// Coerce the values to `f64`. Any numeric type is accepted.
    ///
    /// # Errors
    /// Returns [`DataTypeError::Coercion`] for text and binary values.
    pub fn coerce_f64(&self) -> Result<Vec<f64>, DataTypeError> {
        self.cast::<f64>().ok_or_else(|| DataTypeError::Coercion {
            stored: self.num_type(),
            target: "double",
            reason: "not a numeric type".to_string(),
        })
    }

    /// Interpret text values as a string, dropping trailing NUL padding.
    ///
    /// Returns [`None`] if the values are not [`NumType::Char`].
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Char(bytes) => {
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            _ => None,
        }
    }

    /// Serialise the values to JSON.
    ///
    /// Numbers become a JSON array. Non-finite floats are written as `"NaN"`, `"Infinity"` or `"-Infinity"`.
    /// Text is written as a JSON string if it is valid UTF-8.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Float32(v) => v
                .iter()
                .map(|&e| float_to_json(<f64 as From<f32>>::from(e)))
                .collect(),
            Self::Float64(v) => v.iter().map(|&e| float_to_json(e)).collect(),
            Self::Char(v) => std::str::from_utf8(v)
                .map_or_else(|_| v.iter().map(|&e| Value::from(e)).collect(), Value::from),
            Self::Int8(v) => v.iter().map(|&e| Value::from(e)).collect(),
            Self::UInt8(v) | Self::Binary(v) => v.iter().map(|&e| Value::from(e)).collect(),
            Self::Int16(v) => v.iter().map(|&e| Value::from(e)).collect(),
            Self::UInt16(v) => v.iter().map(|&e| Value::from(e)).collect(),
            Self::Int32(v) => v.iter().map(|&e| Value::from(e)).collect(),
            Self::UInt32(v) => v.iter().map(|&e| Value::from(e)).collect(),
            Self::Int64(v) => v.iter().map(|&e| Value::from(e)).collect(),
            Self::UInt64(v) => v.iter().map(|&e| Value::from(e)).collect(),
        }
    }

    /// Deserialise values of `num_type` from JSON produced by [`ArrayValues::to_json`].
    ///
    /// # Errors
    /// Returns [`DataTypeError::InvalidValue`] if an element is not valid for `num_type`.
    pub fn from_json(num_type: NumType, value: &Value) -> Result<Self, DataTypeError> {
        if let (NumType::Char, Value::String(string)) = (num_type, value) {
            return Ok(Self::Char(string.as_bytes().to_vec()));
        }
        let items = match value {
            Value::Array(items) => items.as_slice(),
            value => std::slice::from_ref(value),
        };
        let invalid = |item: &Value| DataTypeError::InvalidValue {
            data_type: num_type,
            value: item.to_string(),
        };
        macro_rules! collect {
            ($convert:expr) => {
                items
                    .iter()
                    .map(|item| $convert(item).ok_or_else(|| invalid(item)))
                    .collect::<Result<Vec<_>, _>>()?
            };
        }
        Ok(match num_type {
            // f32 values were widened on serialisation, so narrowing restores them exactly
            #[allow(clippy::cast_possible_truncation)]
            NumType::Float32 => Self::Float32(collect!(|item| float_from_json(item).map(|f| f as f32))),
            NumType::Float64 => Self::Float64(collect!(float_from_json)),
            NumType::Int8 => Self::Int8(collect!(int_from_json)),
            NumType::UInt8 => Self::UInt8(collect!(int_from_json)),
            NumType::Int16 => Self::Int16(collect!(int_from_json)),
            NumType::UInt16 => Self::UInt16(collect!(int_from_json)),
            NumType::Int32 => Self::Int32(collect!(int_from_json)),
            NumType::UInt32 => Self::UInt32(collect!(int_from_json)),
            NumType::Int64 => Self::Int64(collect!(int_from_json)),
            NumType::UInt64 => Self::UInt64(collect!(int_from_json)),
            NumType::Char => Self::Char(collect!(int_from_json)),
            NumType::Binary => Self::Binary(collect!(int_from_json)),
        })
    }
}

macro_rules! impl_from_vec {
    ($raw_type:ty) => {
        impl From<Vec<$raw_type>> for ArrayValues {
            fn from(elements: Vec<$raw_type>) -> Self {
                <$raw_type as Element>::into_values(elements)
            }
        }
    };
}

impl_from_vec!(f32);
impl_from_vec!(f64);
impl_from_vec!(i8);
impl_from_vec!(u8);
impl_from_vec!(i16);
impl_from_vec!(u16);
impl_from_vec!(i32);
impl_from_vec!(u32);
impl_from_vec!(i64);
impl_from_vec!(u64);

impl From<&str> for ArrayValues {
    fn from(text: &str) -> Self {
        Self::Char(text.as_bytes().to_vec())
    }
}
