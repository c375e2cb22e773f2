//! Array subsets.
//!
//! An [`ArraySubset`] is the rectangular region of a slab read or write: a start index and a shape per dimension.
//! It produces iterators over the indices, contiguous runs and overlapping chunks of a region.
//!
//! This module provides convenience functions for extracting and storing the bytes within subsets of an array.

mod iterators;

pub use iterators::{ChunksIterator, ContiguousLinearisedIndicesIterator, IndicesIterator};

use derive_more::Display;
use itertools::izip;
use thiserror::Error;

/// The indices of an element in an array.
pub type ArrayIndices = Vec<u64>;

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// An array subset.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    /// The start of the array subset.
    start: ArrayIndices,
    /// The shape of the array subset.
    shape: ArrayShape,
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// An incompatible array shape error.
#[derive(Clone, Debug, Error)]
#[error("incompatible array shape {0:?} with array subset {1}")]
pub struct IncompatibleArrayShapeError(ArrayShape, ArraySubset);

/// An array extract bytes error.
#[derive(Debug, Error)]
#[error("array subset {_0} is incompatible with array of shape {_1:?} and element size {_2}")]
pub struct ArrayExtractBytesError(ArraySubset, ArrayShape, usize);

/// An array store bytes error.
#[derive(Debug, Error)]
pub enum ArrayStoreBytesError {
    /// Invalid array shape.
    #[error(transparent)]
    InvalidArrayShape(#[from] IncompatibleArrayShapeError),
    /// Invalid subset bytes.
    #[error("expected subset bytes to have length {_1}, got {_0}")]
    InvalidSubsetBytes(usize, u64),
    /// Invalid array bytes.
    #[error("expected array bytes to have length {_1}, got {_0}")]
    InvalidArrayBytes(usize, u64),
}

/// Return the number of elements in an array of `shape`, or [`None`] if it overflows [`u64`].
#[must_use]
pub fn checked_num_elements(shape: &[u64]) -> Option<u64> {
    shape.iter().try_fold(1u64, |count, &extent| count.checked_mul(extent))
}

/// Return the linearised (C order) index of `indices` in an array of shape `array_shape`.
#[must_use]
pub fn ravel_indices(indices: &[u64], array_shape: &[u64]) -> u64 {
    let mut index = 0;
    let mut stride = 1;
    for (&i, &extent) in std::iter::zip(indices, array_shape).rev() {
        index += i * stride;
        stride *= extent;
    }
    index
}

impl ArraySubset {
    /// Create a new array subset with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the lengths of `start` and `shape` differ.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError(shape.len(), start.len()))
        }
    }

    /// Create a new array subset from a start and an exclusive end.
    ///
    /// An end before the start along a dimension gives an empty subset.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the lengths of `start` and `end` differ.
    pub fn new_with_start_end_exc(
        start: ArrayIndices,
        end: &[u64],
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == end.len() {
            let shape = std::iter::zip(&start, end)
                .map(|(&s, &e)| e.saturating_sub(s))
                .collect();
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError(end.len(), start.len()))
        }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the exclusive end of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the number of elements of the array subset.
    ///
    /// Equal to the product of the components of its shape, saturating at [`u64::MAX`].
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        checked_num_elements(&self.shape).unwrap_or(u64::MAX)
    }

    /// Returns true if the array subset holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    /// Returns true if the array subset is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && izip!(&self.start, &self.shape, array_shape)
                .all(|(start, size, extent)| start + size <= *extent)
    }

    /// Return the intersection of this array subset and `other`, or [`None`] if they do not overlap.
    #[must_use]
    pub fn overlap(&self, other: &Self) -> Option<Self> {
        if self.dimensionality() != other.dimensionality() {
            return None;
        }
        let start: ArrayIndices = std::iter::zip(&self.start, &other.start)
            .map(|(a, b)| *a.max(b))
            .collect();
        let end: ArrayIndices = std::iter::zip(self.end_exc(), other.end_exc())
            .map(|(a, b)| a.min(b))
            .collect();
        let overlap = Self::new_with_start_end_exc(start, &end).ok()?;
        (!overlap.is_empty()).then_some(overlap)
    }

    /// Return this array subset with `origin` subtracted from its start.
    ///
    /// `origin` must not exceed the start along any dimension.
    #[must_use]
    pub fn relative_to(&self, origin: &[u64]) -> Self {
        Self {
            start: std::iter::zip(&self.start, origin)
                .map(|(start, origin)| start.saturating_sub(*origin))
                .collect(),
            shape: self.shape.clone(),
        }
    }

    /// Returns an iterator over the indices of elements within the subset.
    #[must_use]
    pub fn iter_indices(&self) -> IndicesIterator {
        IndicesIterator::new(self.clone())
    }

    /// Returns an iterator over the contiguous runs of this subset within an array of shape `array_shape`.
    ///
    /// The iterator item is a (linearised index, number of contiguous elements) tuple.
    ///
    /// # Errors
    /// Returns [`IncompatibleArrayShapeError`] if `array_shape` does not encapsulate this array subset.
    pub fn iter_contiguous_linearised_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<ContiguousLinearisedIndicesIterator, IncompatibleArrayShapeError> {
        if self.inbounds(array_shape) {
            Ok(ContiguousLinearisedIndicesIterator::new(self, array_shape))
        } else {
            Err(IncompatibleArrayShapeError(
                array_shape.to_vec(),
                self.clone(),
            ))
        }
    }

    /// Returns an iterator over the chunks of a regular grid with `chunk_shape` that overlap this subset.
    ///
    /// The iterator item is a (chunk grid indices, chunk subset) tuple. Chunk subsets always have the full
    /// `chunk_shape`, so they may extend beyond this subset.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `chunk_shape` does not match the dimensionality of this subset.
    pub fn iter_chunks(
        &self,
        chunk_shape: &[u64],
    ) -> Result<ChunksIterator, IncompatibleDimensionalityError> {
        if chunk_shape.len() == self.dimensionality() {
            Ok(ChunksIterator::new(self, chunk_shape))
        } else {
            Err(IncompatibleDimensionalityError(
                chunk_shape.len(),
                self.dimensionality(),
            ))
        }
    }

    /// Return the bytes in this array subset from an array with shape `array_shape` and `element_size`.
    ///
    /// # Errors
    /// Returns [`ArrayExtractBytesError`] if the length of `bytes` does not match `array_shape` and `element_size`,
    /// or the array subset is outside of the bounds of `array_shape`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<Vec<u8>, ArrayExtractBytesError> {
        let error = || ArrayExtractBytesError(self.clone(), array_shape.to_vec(), element_size);
        let array_size = checked_num_elements(array_shape)
            .and_then(|count| count.checked_mul(element_size as u64));
        if array_size != Some(bytes.len() as u64) {
            return Err(error());
        }
        let runs = self
            .iter_contiguous_linearised_indices(array_shape)
            .map_err(|_| error())?;
        let mut bytes_subset = Vec::with_capacity(self.num_elements() as usize * element_size);
        for (array_index, contiguous_elements) in runs {
            // bounded by bytes.len()
            let byte_offset = array_index as usize * element_size;
            let byte_length = contiguous_elements as usize * element_size;
            bytes_subset.extend_from_slice(&bytes[byte_offset..byte_offset + byte_length]);
        }
        Ok(bytes_subset)
    }

    /// Store `bytes_subset` into the bytes of an array (`bytes_array`) with shape `array_shape` and `element_size`.
    ///
    /// # Errors
    /// Returns [`ArrayStoreBytesError`] if:
    ///  - the array subset is outside of the bounds of `array_shape`,
    ///  - the length of `bytes_array` is not compatible with `array_shape` and `element_size`, or
    ///  - the length of `bytes_subset` is not compatible with the shape of this subset and `element_size`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn store_bytes(
        &self,
        bytes_subset: &[u8],
        bytes_array: &mut [u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<(), ArrayStoreBytesError> {
        let expected_subset_size = self.num_elements().saturating_mul(element_size as u64);
        let expected_array_size = checked_num_elements(array_shape)
            .unwrap_or(u64::MAX)
            .saturating_mul(element_size as u64);
        if bytes_subset.len() as u64 != expected_subset_size {
            return Err(ArrayStoreBytesError::InvalidSubsetBytes(
                bytes_subset.len(),
                expected_subset_size,
            ));
        }
        if bytes_array.len() as u64 != expected_array_size {
            return Err(ArrayStoreBytesError::InvalidArrayBytes(
                bytes_array.len(),
                expected_array_size,
            ));
        }
        let mut offset = 0;
        for (array_index, contiguous_elements) in
            self.iter_contiguous_linearised_indices(array_shape)?
        {
            let byte_index = array_index as usize * element_size;
            let byte_length = contiguous_elements as usize * element_size;
            bytes_array[byte_index..byte_index + byte_length]
                .copy_from_slice(&bytes_subset[offset..offset + byte_length]);
            offset += byte_length;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset() {
        let subset = ArraySubset::new_with_start_shape(vec![1, 2], vec![2, 3]).unwrap();
        assert_eq!(subset.end_exc(), vec![3, 5]);
        assert_eq!(subset.num_elements(), 6);
        assert!(subset.inbounds(&[3, 5]));
        assert!(!subset.inbounds(&[3, 4]));
        assert!(!subset.inbounds(&[3]));
        assert!(ArraySubset::new_with_start_shape(vec![0], vec![1, 1]).is_err());
        assert_eq!(subset.to_string(), "start [1, 2] shape [2, 3]");
        assert_eq!(
            ArraySubset::new_with_start_end_exc(vec![2, 2], &[4, 1]).unwrap().shape(),
            &[2, 0]
        );
    }

    #[test]
    fn array_subset_num_elements_overflow() {
        assert_eq!(checked_num_elements(&[1 << 31, 1 << 31]), Some(1 << 62));
        assert_eq!(checked_num_elements(&[1 << 32, 1 << 32]), None);
        assert_eq!(checked_num_elements(&[]), Some(1));
        let huge = ArraySubset::new_with_shape(vec![1 << 32, 1 << 32]);
        assert_eq!(huge.num_elements(), u64::MAX);
        assert!(!huge.is_empty());
        assert!(ArraySubset::new_with_shape(vec![1])
            .extract_bytes(&[0], &[1 << 32, 1 << 32], 1)
            .is_err());
    }

    #[test]
    fn array_subset_overlap() {
        let a = ArraySubset::new_with_start_shape(vec![0, 0], vec![4, 4]).unwrap();
        let b = ArraySubset::new_with_start_shape(vec![2, 3], vec![4, 4]).unwrap();
        let overlap = a.overlap(&b).unwrap();
        assert_eq!(overlap.start(), &[2, 3]);
        assert_eq!(overlap.shape(), &[2, 1]);
        assert_eq!(overlap.relative_to(&[2, 0]).start(), &[0, 3]);
        let c = ArraySubset::new_with_start_shape(vec![4, 0], vec![1, 1]).unwrap();
        assert!(a.overlap(&c).is_none());
    }

    #[test]
    fn ravel() {
        assert_eq!(ravel_indices(&[1, 2], &[3, 4]), 6);
        assert_eq!(ravel_indices(&[], &[]), 0);
    }

    #[test]
    fn extract_and_store_bytes() {
        // 3x4 array of u8 with values 0..12
        let array: Vec<u8> = (0..12).collect();
        let subset = ArraySubset::new_with_start_shape(vec![1, 1], vec![2, 2]).unwrap();
        let bytes = subset.extract_bytes(&array, &[3, 4], 1).unwrap();
        assert_eq!(bytes, vec![5, 6, 9, 10]);
        assert!(subset.extract_bytes(&array, &[3, 3], 1).is_err());

        let mut array = vec![0u8; 12];
        subset.store_bytes(&[1, 2, 3, 4], &mut array, &[3, 4], 1).unwrap();
        assert_eq!(array, vec![0, 0, 0, 0, 0, 1, 2, 0, 0, 3, 4, 0]);
        assert!(matches!(
            subset.store_bytes(&[1, 2, 3], &mut array, &[3, 4], 1),
            Err(ArrayStoreBytesError::InvalidSubsetBytes(3, 4))
        ));
    }

    #[test]
    fn extract_bytes_multi_byte_elements() {
        let array: Vec<u8> = (0..8u16).flat_map(u16::to_le_bytes).collect();
        let subset = ArraySubset::new_with_start_shape(vec![2], vec![3]).unwrap();
        let bytes = subset.extract_bytes(&array, &[8], 2).unwrap();
        assert_eq!(bytes, vec![2, 0, 3, 0, 4, 0]);
    }
}
