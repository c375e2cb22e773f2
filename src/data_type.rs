//! Primitive storage types and compression kinds.
//!
//! A dataset or attribute stores elements of one [`NumType`]. Host element types implement [`Element`], which maps
//! each of them onto exactly one [`NumType`] (see [`type_of`]). Values of a runtime-known type are held in the
//! [`ArrayValues`] tagged union, which also carries the coercion rules used by typed reads.

mod element;
mod values;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use element::{type_of, Binary, Char, Element};
pub use values::ArrayValues;

/// A primitive storage type.
///
/// The codes match the type codes of the NeXus API.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum NumType {
    /// `f32`.
    Float32,
    /// `f64`.
    Float64,
    /// `i8`.
    Int8,
    /// `u8`.
    UInt8,
    /// `i16`.
    Int16,
    /// `u16`.
    UInt16,
    /// `i32`.
    Int32,
    /// `u32`.
    UInt32,
    /// `i64`.
    Int64,
    /// `u64`.
    UInt64,
    /// A character (byte) of text.
    Char,
    /// An opaque byte.
    Binary,
}

/// A compression kind.
///
/// Compression is advisory: a backend that does not support a kind accepts and ignores it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compression {
    /// No compression.
    #[default]
    #[display("NONE")]
    None,
    /// Chunked storage without compression.
    #[display("CHUNK")]
    Chunk,
    /// Lempel-Ziv-Welch compression.
    #[display("LZW")]
    Lzw,
    /// Run length encoding.
    #[display("RLE")]
    Rle,
    /// Huffman encoding.
    #[display("HUF")]
    Huf,
}

/// A data type error.
#[derive(Debug, Error)]
pub enum DataTypeError {
    /// The type name, code or host representation is outside the supported set.
    #[error("unsupported data type {0}")]
    Unsupported(String),
    /// The stored type cannot be read as the requested type.
    #[error("stored type {stored} cannot be read as {requested}")]
    Mismatch {
        /// The stored type.
        stored: NumType,
        /// The requested type.
        requested: NumType,
    },
    /// Values of the stored type cannot be coerced to the target representation.
    #[error("cannot coerce {stored} values to {target}: {reason}")]
    Coercion {
        /// The stored type.
        stored: NumType,
        /// The target representation.
        target: &'static str,
        /// The offending value or property.
        reason: String,
    },
    /// A byte buffer is not a whole number of elements.
    #[error("{len} bytes is not a multiple of the {data_type} element size {}", data_type.size())]
    InvalidBytesLength {
        /// The buffer length.
        len: usize,
        /// The element type.
        data_type: NumType,
    },
    /// A serialised value is not valid for its type.
    #[error("invalid {data_type} value {value}")]
    InvalidValue {
        /// The element type.
        data_type: NumType,
        /// The offending value.
        value: String,
    },
}

impl NumType {
    /// Every supported storage type.
    pub const ALL: [Self; 12] = [
        Self::Float32,
        Self::Float64,
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Char,
        Self::Binary,
    ];

    /// The canonical name of the type, e.g. `FLOAT64`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Float32 => "FLOAT32",
            Self::Float64 => "FLOAT64",
            Self::Int8 => "INT8",
            Self::UInt8 => "UINT8",
            Self::Int16 => "INT16",
            Self::UInt16 => "UINT16",
            Self::Int32 => "INT32",
            Self::UInt32 => "UINT32",
            Self::Int64 => "INT64",
            Self::UInt64 => "UINT64",
            Self::Char => "CHAR",
            Self::Binary => "BINARY",
        }
    }

    /// The NeXus type code.
    ///
    /// [`NumType::Binary`] shares its code with [`NumType::UInt8`].
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Char => 4,
            Self::Float32 => 5,
            Self::Float64 => 6,
            Self::Int8 => 20,
            Self::UInt8 | Self::Binary => 21,
            Self::Int16 => 22,
            Self::UInt16 => 23,
            Self::Int32 => 24,
            Self::UInt32 => 25,
            Self::Int64 => 26,
            Self::UInt64 => 27,
        }
    }

    /// The size of one element in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 | Self::Char | Self::Binary => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Float32 | Self::Int32 | Self::UInt32 => 4,
            Self::Float64 | Self::Int64 | Self::UInt64 => 8,
        }
    }

    /// Resolve a type from its canonical name.
    ///
    /// # Errors
    /// Returns [`DataTypeError::Unsupported`] if `name` is not a supported type name.
    pub fn from_name(name: &str) -> Result<Self, DataTypeError> {
        Self::ALL
            .into_iter()
            .find(|num_type| num_type.name() == name)
            .ok_or_else(|| DataTypeError::Unsupported(name.to_string()))
    }

    /// Resolve a type from its NeXus type code. Code 21 resolves to [`NumType::UInt8`].
    ///
    /// # Errors
    /// Returns [`DataTypeError::Unsupported`] if `code` is not a supported type code.
    pub fn from_code(code: i32) -> Result<Self, DataTypeError> {
        Self::ALL
            .into_iter()
            .find(|num_type| num_type.code() == code)
            .ok_or_else(|| DataTypeError::Unsupported(format!("code {code}")))
    }

    /// Returns true for the integer types.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::UInt8
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }

    /// Returns true for the signed integer types.
    #[must_use]
    pub const fn is_signed_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Returns true for the floating point types.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Returns true for the integer and floating point types.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns true for the integer types of 32 bits or fewer.
    #[must_use]
    pub const fn is_int32_or_less(&self) -> bool {
        self.is_integer() && self.size() <= 4
    }

    /// Returns true if every value of `self` is exactly representable as `target`.
    ///
    /// A type widens to itself, to a wider integer of the same signedness, from unsigned to a strictly wider
    /// signed integer, and from an integer to a float with enough mantissa bits. Text and binary only convert
    /// to themselves.
    #[must_use]
    pub fn widens_to(&self, target: Self) -> bool {
        if *self == target {
            return true;
        }
        if !self.is_numeric() || !target.is_numeric() {
            return false;
        }
        match (self.is_float(), target.is_float()) {
            (true, true) => target.size() > self.size(),
            (true, false) => false,
            (false, true) => {
                if target == Self::Float32 {
                    self.size() <= 2
                } else {
                    self.size() <= 4
                }
            }
            (false, false) => match (self.is_signed_integer(), target.is_signed_integer()) {
                (true, false) => false,
                (false, true) => target.size() > self.size(),
                _ => target.size() > self.size(),
            },
        }
    }
}

impl std::fmt::Display for NumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<NumType> for &'static str {
    fn from(num_type: NumType) -> Self {
        num_type.name()
    }
}

impl TryFrom<String> for NumType {
    type Error = DataTypeError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::from_name(&name)
    }
}

impl std::str::FromStr for NumType {
    type Err = DataTypeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::from_name(name)
    }
}

impl Compression {
    /// The NeXus compression code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Chunk => 0,
            Self::None => 100,
            Self::Lzw => 200,
            Self::Rle => 300,
            Self::Huf => 400,
        }
    }

    /// Resolve a compression kind from its NeXus code.
    ///
    /// # Errors
    /// Returns [`DataTypeError::Unsupported`] if `code` is not a compression code.
    pub fn from_code(code: i32) -> Result<Self, DataTypeError> {
        [Self::None, Self::Chunk, Self::Lzw, Self::Rle, Self::Huf]
            .into_iter()
            .find(|compression| compression.code() == code)
            .ok_or_else(|| DataTypeError::Unsupported(format!("compression code {code}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_type_names_and_codes() {
        for num_type in NumType::ALL {
            assert_eq!(NumType::from_name(num_type.name()).unwrap(), num_type);
            assert_eq!(num_type.to_string(), num_type.name());
        }
        assert_eq!(NumType::Float64.code(), 6);
        assert_eq!(NumType::Char.code(), 4);
        assert_eq!(NumType::from_code(24).unwrap(), NumType::Int32);
        assert_eq!(NumType::from_code(21).unwrap(), NumType::UInt8);
        assert!(matches!(
            NumType::from_code(99),
            Err(DataTypeError::Unsupported(_))
        ));
        assert_eq!(
            NumType::from_name("COMPLEX64").unwrap_err().to_string(),
            "unsupported data type COMPLEX64"
        );
    }

    #[test]
    fn num_type_serde() {
        assert_eq!(
            serde_json::to_string(&NumType::UInt16).unwrap(),
            r#""UINT16""#
        );
        assert_eq!(
            serde_json::from_str::<NumType>(r#""FLOAT32""#).unwrap(),
            NumType::Float32
        );
        assert!(serde_json::from_str::<NumType>(r#""float32""#).is_err());
    }

    #[test]
    fn num_type_widening() {
        use NumType::*;
        assert!(Int8.widens_to(Int64));
        assert!(UInt16.widens_to(Int32));
        assert!(UInt16.widens_to(UInt64));
        assert!(!UInt32.widens_to(Int32));
        assert!(!Int16.widens_to(UInt32));
        assert!(!Int64.widens_to(Int32));
        assert!(Int16.widens_to(Float32));
        assert!(!Int32.widens_to(Float32));
        assert!(Int32.widens_to(Float64));
        assert!(!Int64.widens_to(Float64));
        assert!(Float32.widens_to(Float64));
        assert!(!Float64.widens_to(Float32));
        assert!(!Float32.widens_to(Int64));
        assert!(!Char.widens_to(UInt8));
        assert!(!UInt8.widens_to(Char));
        assert!(Binary.widens_to(Binary));
    }

    #[test]
    fn num_type_classes() {
        assert!(NumType::UInt32.is_int32_or_less());
        assert!(!NumType::Int64.is_int32_or_less());
        assert!(!NumType::Float32.is_int32_or_less());
        assert!(!NumType::Char.is_numeric());
        assert_eq!(NumType::UInt64.size(), 8);
    }

    #[test]
    fn compression_codes() {
        assert_eq!(Compression::default(), Compression::None);
        assert_eq!(Compression::Lzw.code(), 200);
        assert_eq!(Compression::from_code(0).unwrap(), Compression::Chunk);
        assert!(Compression::from_code(1).is_err());
        assert_eq!(
            serde_json::to_string(&Compression::Huf).unwrap(),
            r#""HUF""#
        );
        assert_eq!(Compression::Rle.to_string(), "RLE");
    }
}
