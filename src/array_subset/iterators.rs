use std::iter::FusedIterator;

use super::{ravel_indices, ArrayIndices, ArraySubset};

/// Iterates over element indices in an array subset, in C order.
pub struct IndicesIterator {
    subset: ArraySubset,
    next: ArrayIndices,
    remaining: u64,
}

impl IndicesIterator {
    /// Create a new indices iterator.
    #[must_use]
    pub fn new(subset: ArraySubset) -> Self {
        let remaining = subset.num_elements();
        let next = subset.start().to_vec();
        Self {
            subset,
            next,
            remaining,
        }
    }
}

impl Iterator for IndicesIterator {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next.clone();
        for (dim, index) in self.next.iter_mut().enumerate().rev() {
            *index += 1;
            if *index < self.subset.start()[dim] + self.subset.shape()[dim] {
                break;
            }
            *index = self.subset.start()[dim];
        }
        Some(current)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndicesIterator {}

impl FusedIterator for IndicesIterator {}

/// Iterates over contiguous linearised element indices in an array subset.
///
/// The iterator item is a tuple: (linearised index, # contiguous elements).
/// The trailing dimensions that the subset spans completely are merged into each run.
pub struct ContiguousLinearisedIndicesIterator {
    outer: IndicesIterator,
    inner_start: ArrayIndices,
    array_shape: Vec<u64>,
    contiguous_elements: u64,
}

impl ContiguousLinearisedIndicesIterator {
    pub(super) fn new(subset: &ArraySubset, array_shape: &[u64]) -> Self {
        let dimensionality = subset.dimensionality();
        let mut contiguous_elements = 1;
        let mut outer_dimensionality = dimensionality;
        for dim in (0..dimensionality).rev() {
            contiguous_elements *= subset.shape()[dim];
            outer_dimensionality = dim;
            if subset.shape()[dim] != array_shape[dim] {
                break;
            }
        }
        let outer_subset = ArraySubset {
            start: subset.start()[..outer_dimensionality].to_vec(),
            shape: subset.shape()[..outer_dimensionality].to_vec(),
        };
        let mut outer = IndicesIterator::new(outer_subset);
        if contiguous_elements == 0 {
            outer.remaining = 0;
        }
        Self {
            outer,
            inner_start: subset.start()[outer_dimensionality..].to_vec(),
            array_shape: array_shape.to_vec(),
            contiguous_elements,
        }
    }

    /// Return the number of contiguous elements (fixed on each iteration).
    #[must_use]
    pub fn contiguous_elements(&self) -> u64 {
        self.contiguous_elements
    }
}

impl Iterator for ContiguousLinearisedIndicesIterator {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.outer.next().map(|mut indices| {
            indices.extend_from_slice(&self.inner_start);
            (
                ravel_indices(&indices, &self.array_shape),
                self.contiguous_elements,
            )
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.outer.size_hint()
    }
}

impl ExactSizeIterator for ContiguousLinearisedIndicesIterator {}

impl FusedIterator for ContiguousLinearisedIndicesIterator {}

/// Iterates over the regular sized chunks overlapping an array subset.
/// All chunks have the same size, and may extend over the bounds of the array subset.
///
/// The iterator item is a ([`ArrayIndices`], [`ArraySubset`]) tuple corresponding to the chunk indices and array subset.
pub struct ChunksIterator {
    inner: IndicesIterator,
    chunk_shape: Vec<u64>,
}

impl ChunksIterator {
    pub(super) fn new(subset: &ArraySubset, chunk_shape: &[u64]) -> Self {
        let chunk_shape: Vec<u64> = chunk_shape.iter().map(|&c| c.max(1)).collect();
        let chunk_start: ArrayIndices = std::iter::zip(subset.start(), &chunk_shape)
            .map(|(s, c)| s / c)
            .collect();
        let chunk_end_exc: ArrayIndices = std::iter::zip(subset.end_exc(), &chunk_shape)
            .map(|(e, c)| e.div_ceil(*c))
            .collect();
        let subset_chunks = if subset.is_empty() {
            ArraySubset::new_with_shape(vec![0; chunk_shape.len()])
        } else {
            ArraySubset {
                shape: std::iter::zip(&chunk_start, &chunk_end_exc)
                    .map(|(s, e)| e - s)
                    .collect(),
                start: chunk_start,
            }
        };
        let mut inner = IndicesIterator::new(subset_chunks);
        if subset.is_empty() {
            inner.remaining = 0;
        }
        Self { inner, chunk_shape }
    }
}

impl Iterator for ChunksIterator {
    type Item = (ArrayIndices, ArraySubset);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|chunk_indices| {
            let start = std::iter::zip(&chunk_indices, &self.chunk_shape)
                .map(|(i, c)| i * c)
                .collect();
            let chunk_subset = ArraySubset {
                start,
                shape: self.chunk_shape.clone(),
            };
            (chunk_indices, chunk_subset)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ChunksIterator {}

impl FusedIterator for ChunksIterator {}
