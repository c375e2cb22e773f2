use derive_more::{Display, From};

use super::{ArrayValues, DataTypeError, NumType};

/// A host element type with a fixed storage type.
///
/// Elements are stored little-endian.
pub trait Element: Sized + Copy + Default + Send + Sync + 'static {
    /// The storage type of the element.
    const NUM_TYPE: NumType;

    /// Wrap owned elements in [`ArrayValues`].
    fn into_values(elements: Vec<Self>) -> ArrayValues;

    /// Extract elements from `values`, widening losslessly if the stored type differs.
    ///
    /// # Errors
    /// Returns [`DataTypeError::Mismatch`] if the stored type does not widen to [`Element::NUM_TYPE`].
    fn from_values(values: ArrayValues) -> Result<Vec<Self>, DataTypeError>;

    /// Encode elements as little-endian bytes.
    fn to_bytes(elements: &[Self]) -> Vec<u8>;

    /// Decode elements from little-endian bytes.
    ///
    /// # Errors
    /// Returns [`DataTypeError::InvalidBytesLength`] if `bytes` is not a whole number of elements.
    fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>, DataTypeError>;
}

/// Return the storage type of the element type `T`.
#[must_use]
pub const fn type_of<T: Element>() -> NumType {
    T::NUM_TYPE
}

/// A character of text. Stored as [`NumType::Char`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From)]
#[display("{}", char::from(*_0))]
#[repr(transparent)]
pub struct Char(pub u8);

/// An opaque byte. Stored as [`NumType::Binary`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, From)]
#[repr(transparent)]
pub struct Binary(pub u8);

fn check_bytes_length(bytes: &[u8], data_type: NumType) -> Result<(), DataTypeError> {
    if bytes.len() % data_type.size() == 0 {
        Ok(())
    } else {
        Err(DataTypeError::InvalidBytesLength {
            len: bytes.len(),
            data_type,
        })
    }
}

macro_rules! impl_element_pod {
    ($raw_type:ty, $variant:ident) => {
        impl Element for $raw_type {
            const NUM_TYPE: NumType = NumType::$variant;

            fn into_values(elements: Vec<Self>) -> ArrayValues {
                ArrayValues::$variant(elements)
            }

            fn from_values(values: ArrayValues) -> Result<Vec<Self>, DataTypeError> {
                match values {
                    ArrayValues::$variant(elements) => Ok(elements),
                    values => {
                        let stored = values.num_type();
                        let mismatch = DataTypeError::Mismatch {
                            stored,
                            requested: Self::NUM_TYPE,
                        };
                        if stored.widens_to(Self::NUM_TYPE) {
                            values.cast::<Self>().ok_or(mismatch)
                        } else {
                            Err(mismatch)
                        }
                    }
                }
            }

            fn to_bytes(elements: &[Self]) -> Vec<u8> {
                if cfg!(target_endian = "little") {
                    bytemuck::cast_slice(elements).to_vec()
                } else {
                    elements.iter().flat_map(|e| e.to_le_bytes()).collect()
                }
            }

            fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>, DataTypeError> {
                check_bytes_length(bytes, Self::NUM_TYPE)?;
                if cfg!(target_endian = "little") {
                    Ok(bytemuck::pod_collect_to_vec(bytes))
                } else {
                    Ok(bytes
                        .chunks_exact(std::mem::size_of::<Self>())
                        .map(|chunk| Self::from_le_bytes(chunk.try_into().unwrap_or_default()))
                        .collect())
                }
            }
        }
    };
}

impl_element_pod!(f32, Float32);
impl_element_pod!(f64, Float64);
impl_element_pod!(i8, Int8);
impl_element_pod!(u8, UInt8);
impl_element_pod!(i16, Int16);
impl_element_pod!(u16, UInt16);
impl_element_pod!(i32, Int32);
impl_element_pod!(u32, UInt32);
impl_element_pod!(i64, Int64);
impl_element_pod!(u64, UInt64);

macro_rules! impl_element_byte {
    ($newtype:ident, $variant:ident) => {
        impl Element for $newtype {
            const NUM_TYPE: NumType = NumType::$variant;

            fn into_values(elements: Vec<Self>) -> ArrayValues {
                ArrayValues::$variant(elements.into_iter().map(|e| e.0).collect())
            }

            fn from_values(values: ArrayValues) -> Result<Vec<Self>, DataTypeError> {
                match values {
                    ArrayValues::$variant(bytes) => Ok(bytes.into_iter().map(Self).collect()),
                    values => Err(DataTypeError::Mismatch {
                        stored: values.num_type(),
                        requested: Self::NUM_TYPE,
                    }),
                }
            }

            fn to_bytes(elements: &[Self]) -> Vec<u8> {
                elements.iter().map(|e| e.0).collect()
            }

            fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>, DataTypeError> {
                Ok(bytes.iter().copied().map(Self).collect())
            }
        }
    };
}

impl_element_byte!(Char, Char);
impl_element_byte!(Binary, Binary);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_types() {
        assert_eq!(type_of::<f32>(), NumType::Float32);
        assert_eq!(type_of::<f64>(), NumType::Float64);
        assert_eq!(type_of::<i8>(), NumType::Int8);
        assert_eq!(type_of::<u8>(), NumType::UInt8);
        assert_eq!(type_of::<i16>(), NumType::Int16);
        assert_eq!(type_of::<u16>(), NumType::UInt16);
        assert_eq!(type_of::<i32>(), NumType::Int32);
        assert_eq!(type_of::<u32>(), NumType::UInt32);
        assert_eq!(type_of::<i64>(), NumType::Int64);
        assert_eq!(type_of::<u64>(), NumType::UInt64);
        assert_eq!(type_of::<Char>(), NumType::Char);
        assert_eq!(type_of::<Binary>(), NumType::Binary);
    }

    #[test]
    fn element_bytes_little_endian() {
        assert_eq!(u16::to_bytes(&[0x0102, 0x0304]), vec![0x02, 0x01, 0x04, 0x03]);
        assert_eq!(u16::from_bytes(&[0x02, 0x01]).unwrap(), vec![0x0102]);
        assert_eq!(f64::from_bytes(&f64::to_bytes(&[1.5, -2.0])).unwrap(), vec![1.5, -2.0]);
        assert!(matches!(
            i32::from_bytes(&[0, 0, 0]),
            Err(DataTypeError::InvalidBytesLength { len: 3, .. })
        ));
    }

    #[test]
    fn element_from_values_widens() {
        let values = ArrayValues::UInt16(vec![1, 65535]);
        assert_eq!(i32::from_values(values.clone()).unwrap(), vec![1, 65535]);
        assert_eq!(f32::from_values(values.clone()).unwrap(), vec![1.0, 65535.0]);
        assert!(matches!(
            i16::from_values(values),
            Err(DataTypeError::Mismatch {
                stored: NumType::UInt16,
                requested: NumType::Int16
            })
        ));
        assert!(u8::from_values(ArrayValues::Char(b"ab".to_vec())).is_err());
        assert_eq!(
            Char::from_values(ArrayValues::Char(b"ab".to_vec())).unwrap(),
            vec![Char(b'a'), Char(b'b')]
        );
    }

    #[test]
    fn char_display() {
        assert_eq!(Char(b'x').to_string(), "x");
    }
}
