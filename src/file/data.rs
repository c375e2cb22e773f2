use log::{debug, warn};

use crate::{
    array_subset::{checked_num_elements, ArraySubset},
    backend::BackendRef,
    config::global_config,
    data_type::{ArrayValues, Compression, DataTypeError, Element, NumType},
    node::{DataMetadata, NodeMetadata, NodePath},
};

use super::{File, Info, NexusError, UNLIMITED};

/// Split `dims` into a shape and the unlimited dimension.
fn parse_dims(dims: &[i64]) -> Result<(Vec<u64>, Option<usize>), NexusError> {
    let invalid = || NexusError::InvalidDimensions(format!("{dims:?}"));
    if dims.is_empty() {
        return Err(invalid());
    }
    let mut unlimited_dimension = None;
    let mut shape = Vec::with_capacity(dims.len());
    for (axis, &extent) in dims.iter().enumerate() {
        if extent == UNLIMITED && unlimited_dimension.is_none() {
            unlimited_dimension = Some(axis);
            shape.push(0);
        } else if extent > 0 {
            shape.push(extent.unsigned_abs());
        } else {
            return Err(invalid());
        }
    }
    Ok((shape, unlimited_dimension))
}

/// The chunk shape of a new dataset with elements of `element_size` bytes.
///
/// Without `chunk`, the chunk starts with the extent of each fixed dimension and the default chunk size along the
/// unlimited dimension. Its largest dimension is then halved until it holds no more than the default chunk bytes.
fn chunk_shape(
    shape: &[u64],
    unlimited_dimension: Option<usize>,
    chunk: Option<&[i64]>,
    element_size: usize,
) -> Result<Vec<u64>, NexusError> {
    match chunk {
        Some(chunk) if !chunk.is_empty() => {
            if chunk.len() != shape.len() || chunk.iter().any(|&extent| extent <= 0) {
                return Err(NexusError::InvalidDimensions(format!(
                    "chunk {chunk:?} for dimensions {shape:?}"
                )));
            }
            Ok(chunk.iter().map(|extent| extent.unsigned_abs()).collect())
        }
        _ => {
            let config = global_config();
            let max_elements = (config.default_chunk_bytes() / element_size as u64).max(1);
            let mut chunk_shape: Vec<u64> = shape
                .iter()
                .enumerate()
                .map(|(axis, &extent)| {
                    if Some(axis) == unlimited_dimension {
                        config.default_chunk_size()
                    } else {
                        extent
                    }
                })
                .collect();
            while checked_num_elements(&chunk_shape).map_or(true, |count| count > max_elements) {
                match chunk_shape.iter_mut().max_by_key(|extent| **extent) {
                    Some(largest) if *largest > 1 => *largest = largest.div_ceil(2),
                    _ => break,
                }
            }
            Ok(chunk_shape)
        }
    }
}

/// Convert slab offsets or extents, which must not be negative.
fn slab_extents(values: &[i64], what: &str) -> Result<Vec<u64>, NexusError> {
    values
        .iter()
        .map(|&value| {
            u64::try_from(value)
                .map_err(|_| NexusError::RangeError(format!("negative slab {what} {values:?}")))
        })
        .collect()
}

fn len_i64(len: usize) -> Result<i64, NexusError> {
    i64::try_from(len).map_err(|_| NexusError::InvalidDimensions(format!("length {len}")))
}

fn check_type(metadata: &DataMetadata, requested: NumType) -> Result<(), NexusError> {
    if metadata.data_type == requested {
        Ok(())
    } else {
        Err(DataTypeError::Mismatch {
            stored: metadata.data_type,
            requested,
        }
        .into())
    }
}

fn check_len(path: &NodePath, bytes: &[u8], subset: &ArraySubset, data_type: NumType) -> Result<(), NexusError> {
    let expected = subset.num_elements().saturating_mul(data_type.size() as u64);
    if bytes.len() as u64 == expected {
        Ok(())
    } else {
        Err(NexusError::RankMismatch(format!(
            "{} elements for {subset} of dataset {path}",
            bytes.len() / data_type.size()
        )))
    }
}

impl File {
    /// Create a dataset `name` of `data_type` with `dims` in the current group, and open it if `open`.
    ///
    /// One extent of `dims` may be [`UNLIMITED`], which makes the dataset extendible along that dimension. It starts
    /// with extent zero there.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidDimensions`] if `dims` is empty or has a non-positive extent other than one
    /// [`UNLIMITED`], [`NexusError::NameConflict`] if a sibling named `name` exists, or [`NexusError::InvalidState`]
    /// if a dataset is open.
    pub fn make_data(
        &mut self,
        name: &str,
        data_type: NumType,
        dims: &[i64],
        open: bool,
    ) -> Result<(), NexusError> {
        self.create_dataset(name, data_type, dims, Compression::None, None, open)
    }

    /// Create a dataset like [`File::make_data`] with a compression hint and a chunk shape.
    ///
    /// An empty `chunk` selects the default chunk shape. Unsupported compression is ignored.
    ///
    /// # Errors
    /// See [`File::make_data`]. Returns [`NexusError::InvalidDimensions`] if `chunk` does not match `dims`.
    pub fn make_comp_data(
        &mut self,
        name: &str,
        data_type: NumType,
        dims: &[i64],
        compression: Compression,
        chunk: &[i64],
        open: bool,
    ) -> Result<(), NexusError> {
        self.create_dataset(name, data_type, dims, compression, Some(chunk), open)
    }

    fn create_dataset(
        &mut self,
        name: &str,
        data_type: NumType,
        dims: &[i64],
        compression: Compression,
        chunk: Option<&[i64]>,
        open: bool,
    ) -> Result<(), NexusError> {
        self.ensure_no_data()?;
        let (shape, unlimited_dimension) = parse_dims(dims)?;
        let chunk_shape = chunk_shape(&shape, unlimited_dimension, chunk, data_type.size())?;
        let top = self.chain.top();
        top.backend.create_data(
            &top.path.child(name)?,
            DataMetadata::new(data_type, shape, unlimited_dimension, chunk_shape, compression),
        )?;
        if open {
            self.open_data(name)?;
        }
        Ok(())
    }

    /// Close the dataset opened by a convenience writer or reader, returning the first error.
    fn close_data_after<R>(&mut self, result: Result<R, NexusError>) -> Result<R, NexusError> {
        let closed = self.close_data();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Write `values` to a new one-dimensional dataset `name` in the current group.
    ///
    /// # Errors
    /// See [`File::make_data`].
    pub fn write_data<T: Element>(&mut self, name: &str, values: &[T]) -> Result<(), NexusError> {
        self.write_data_with_dims(name, values, &[len_i64(values.len())?])
    }

    /// Write `values` to a new dataset `name` with `dims` in the current group.
    ///
    /// # Errors
    /// See [`File::make_data`]. Returns [`NexusError::RankMismatch`] if `values` does not fill `dims`.
    pub fn write_data_with_dims<T: Element>(
        &mut self,
        name: &str,
        values: &[T],
        dims: &[i64],
    ) -> Result<(), NexusError> {
        self.make_data(name, T::NUM_TYPE, dims, true)?;
        let result = self.put_data(values);
        self.close_data_after(result)
    }

    /// Write `value` to a new dataset `name` holding one element.
    ///
    /// # Errors
    /// See [`File::make_data`].
    pub fn write_scalar<T: Element>(&mut self, name: &str, value: T) -> Result<(), NexusError> {
        self.write_data(name, &[value])
    }

    /// Write `text` to a new `CHAR` dataset `name`. An empty string is written as a single space.
    ///
    /// # Errors
    /// See [`File::make_data`].
    pub fn write_str(&mut self, name: &str, text: &str) -> Result<(), NexusError> {
        let text = if text.is_empty() { " " } else { text };
        let values = ArrayValues::from(text);
        self.make_data(name, NumType::Char, &[len_i64(values.len())?], true)?;
        let result = self.put_values(&values);
        self.close_data_after(result)
    }

    /// Write `values` to a new one-dimensional extendible dataset `name`.
    ///
    /// `chunk` defaults to the [default chunk size](crate::config::Config#default-chunk-size).
    ///
    /// # Errors
    /// See [`File::make_comp_data`].
    pub fn write_extendible_data<T: Element>(
        &mut self,
        name: &str,
        values: &[T],
        chunk: Option<u64>,
    ) -> Result<(), NexusError> {
        let chunk = chunk.unwrap_or_else(|| global_config().default_chunk_size());
        let chunk = i64::try_from(chunk)
            .map_err(|_| NexusError::InvalidDimensions(format!("chunk {chunk}")))?;
        self.make_comp_data(name, T::NUM_TYPE, &[UNLIMITED], Compression::None, &[chunk], true)?;
        let result = len_i64(values.len()).and_then(|len| self.put_slab(values, &[0], &[len]));
        self.close_data_after(result)
    }

    /// Write `values` with `dims` to a new dataset `name` which is extendible along its first dimension.
    ///
    /// # Errors
    /// See [`File::make_comp_data`]. Returns [`NexusError::RankMismatch`] if `values` does not fill `dims`.
    pub fn write_extendible_data_with_dims<T: Element>(
        &mut self,
        name: &str,
        values: &[T],
        dims: &[i64],
        chunk: &[i64],
    ) -> Result<(), NexusError> {
        let mut create_dims = dims.to_vec();
        let first = create_dims
            .first_mut()
            .ok_or_else(|| NexusError::InvalidDimensions(format!("{dims:?}")))?;
        *first = UNLIMITED;
        self.make_comp_data(name, T::NUM_TYPE, &create_dims, Compression::None, chunk, true)?;
        let result = self.put_slab(values, &vec![0; dims.len()], dims);
        self.close_data_after(result)
    }

    /// Overwrite the one-dimensional dataset `name` with `values`, resizing it if it is extendible.
    ///
    /// # Errors
    /// See [`File::write_updated_data_with_dims`].
    pub fn write_updated_data<T: Element>(&mut self, name: &str, values: &[T]) -> Result<(), NexusError> {
        self.write_updated_data_with_dims(name, values, &[len_i64(values.len())?])
    }

    /// Overwrite the dataset `name` with `values` of shape `dims`.
    ///
    /// An extendible dataset is resized to `dims` if they differ along its unlimited dimension. The dataset is closed
    /// afterwards.
    ///
    /// # Errors
    /// Returns [`NexusError::TypeMismatch`] if the dataset does not store `T`, [`NexusError::NotExtendible`] if a
    /// resize is required but not possible, or [`NexusError::RankMismatch`] if `values` does not fill `dims`.
    pub fn write_updated_data_with_dims<T: Element>(
        &mut self,
        name: &str,
        values: &[T],
        dims: &[i64],
    ) -> Result<(), NexusError> {
        self.open_data(name)?;
        let result = self.update_open_data(values, dims);
        self.close_data_after(result)
    }

    fn update_open_data<T: Element>(&self, values: &[T], dims: &[i64]) -> Result<(), NexusError> {
        let (backend, path, metadata) = self.open_dataset()?;
        check_type(&metadata, T::NUM_TYPE)?;
        let (shape, _) = parse_dims(dims)?;
        if shape.len() != metadata.shape.len() {
            return Err(NexusError::RankMismatch(format!(
                "dimensions {dims:?} for dataset {path} with shape {:?}",
                metadata.shape
            )));
        }
        let subset = ArraySubset::new_with_shape(shape);
        let bytes = T::to_bytes(values);
        check_len(path, &bytes, &subset, T::NUM_TYPE)?;
        if subset.shape() != metadata.shape.as_slice() {
            let resizable = metadata.unlimited_dimension.is_some_and(|unlimited| {
                std::iter::zip(subset.shape(), &metadata.shape)
                    .enumerate()
                    .all(|(axis, (new, old))| axis == unlimited || new == old)
            });
            if !resizable {
                return Err(NexusError::NotExtendible(path.to_string()));
            }
            backend.set_shape(path, subset.shape())?;
        }
        backend.write_slab(path, &subset, &bytes)
    }

    /// Write `values` to a new dataset `name` with a compression hint and a chunk shape.
    ///
    /// # Errors
    /// See [`File::make_comp_data`]. Returns [`NexusError::RankMismatch`] if `values` does not fill `dims`.
    pub fn write_comp_data<T: Element>(
        &mut self,
        name: &str,
        values: &[T],
        dims: &[i64],
        compression: Compression,
        chunk: &[i64],
    ) -> Result<(), NexusError> {
        self.make_comp_data(name, T::NUM_TYPE, dims, compression, chunk, true)?;
        let result = self.put_data(values);
        self.close_data_after(result)
    }

    /// The backend, path and current metadata of the open dataset.
    fn open_dataset(&self) -> Result<(&BackendRef, &NodePath, DataMetadata), NexusError> {
        let data = self.open_data_ref()?;
        let backend = &self.chain.top().backend;
        match backend.node(&data.path)? {
            Some(NodeMetadata::Data(metadata)) => Ok((backend, &data.path, metadata)),
            Some(_) => Err(NexusError::TypeMismatch(format!(
                "{} is not a dataset",
                data.path
            ))),
            None => Err(NexusError::NotFound(format!("dataset {}", data.path))),
        }
    }

    fn write_whole(&self, data_type: Option<NumType>, bytes: &[u8]) -> Result<(), NexusError> {
        let (backend, path, metadata) = self.open_dataset()?;
        if let Some(data_type) = data_type {
            check_type(&metadata, data_type)?;
        }
        let subset = ArraySubset::new_with_shape(metadata.shape);
        check_len(path, bytes, &subset, metadata.data_type)?;
        backend.write_slab(path, &subset, bytes)
    }

    fn put_values(&self, values: &ArrayValues) -> Result<(), NexusError> {
        self.write_whole(Some(values.num_type()), &values.to_bytes())
    }

    /// Write the whole of the open dataset.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if no dataset is open, [`NexusError::TypeMismatch`] if the dataset does
    /// not store `T`, or [`NexusError::RankMismatch`] if `values` does not hold one value per element.
    pub fn put_data<T: Element>(&mut self, values: &[T]) -> Result<(), NexusError> {
        self.write_whole(Some(T::NUM_TYPE), &T::to_bytes(values))
    }

    /// Write the whole of the open dataset from little-endian bytes of its storage type.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if no dataset is open, or [`NexusError::RankMismatch`] if `bytes` does
    /// not hold one value per element.
    pub fn put_data_bytes(&mut self, bytes: &[u8]) -> Result<(), NexusError> {
        self.write_whole(None, bytes)
    }

    fn read_values(&self, start: Option<&[i64]>, size: Option<&[i64]>) -> Result<ArrayValues, NexusError> {
        let (backend, path, metadata) = self.open_dataset()?;
        let subset = match (start, size) {
            (Some(start), Some(size)) => Self::slab_subset(&metadata, start, size)?,
            _ => ArraySubset::new_with_shape(metadata.shape),
        };
        let bytes = backend.read_slab(path, &subset)?;
        Ok(ArrayValues::from_bytes(metadata.data_type, &bytes)?)
    }

    /// Read the whole of the open dataset into `buffer`, which is resized to the number of elements.
    ///
    /// Stored values are widened to `T` if the conversion is lossless.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if no dataset is open, or [`NexusError::TypeMismatch`] if the stored type
    /// does not widen to `T`.
    pub fn get_data<T: Element>(&self, buffer: &mut Vec<T>) -> Result<(), NexusError> {
        *buffer = self.get_data_vec()?;
        Ok(())
    }

    /// Read the whole of the open dataset. See [`File::get_data`].
    ///
    /// # Errors
    /// See [`File::get_data`].
    pub fn get_data_vec<T: Element>(&self) -> Result<Vec<T>, NexusError> {
        Ok(T::from_values(self.read_values(None, None)?)?)
    }

    /// Read the whole of the open dataset as little-endian bytes of its storage type.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if no dataset is open.
    pub fn get_data_bytes(&self) -> Result<Vec<u8>, NexusError> {
        Ok(self.read_values(None, None)?.to_bytes())
    }

    /// Read the open dataset as `i32` values.
    ///
    /// # Errors
    /// Returns [`NexusError::CoercionError`] unless the dataset stores integers of 32 bits or fewer, each of which
    /// fits in an `i32`.
    pub fn get_data_coerce_int(&self) -> Result<Vec<i32>, NexusError> {
        Ok(self.read_values(None, None)?.coerce_i32()?)
    }

    /// Read the open dataset as `f64` values.
    ///
    /// # Errors
    /// Returns [`NexusError::CoercionError`] if the dataset stores text or binary values.
    pub fn get_data_coerce_double(&self) -> Result<Vec<f64>, NexusError> {
        Ok(self.read_values(None, None)?.coerce_f64()?)
    }

    /// Returns true if the open dataset stores integers of 32 bits or fewer, which [`File::get_data_coerce_int`]
    /// accepts.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if no dataset is open.
    pub fn is_data_int(&self) -> Result<bool, NexusError> {
        Ok(self.get_info()?.data_type.is_int32_or_less())
    }

    fn slab_subset(metadata: &DataMetadata, start: &[i64], size: &[i64]) -> Result<ArraySubset, NexusError> {
        let rank = metadata.shape.len();
        if start.len() != rank || size.len() != rank {
            return Err(NexusError::RankMismatch(format!(
                "slab start {start:?} size {size:?} for a dataset with {rank} dimensions"
            )));
        }
        Ok(ArraySubset::new_with_start_shape(
            slab_extents(start, "start")?,
            slab_extents(size, "size")?,
        )?)
    }

    fn write_slab_bytes(
        &self,
        data_type: Option<NumType>,
        bytes: &[u8],
        start: &[i64],
        size: &[i64],
    ) -> Result<(), NexusError> {
        let (backend, path, metadata) = self.open_dataset()?;
        if let Some(data_type) = data_type {
            check_type(&metadata, data_type)?;
        }
        let subset = Self::slab_subset(&metadata, start, size)?;
        check_len(path, bytes, &subset, metadata.data_type)?;

        let mut shape = metadata.shape.clone();
        for (axis, (end, extent)) in std::iter::zip(subset.end_exc(), shape.iter_mut()).enumerate() {
            if end > *extent {
                if metadata.unlimited_dimension == Some(axis) {
                    *extent = end;
                } else {
                    return Err(NexusError::RangeError(format!(
                        "slab {subset} exceeds extent {extent} of dimension {axis} of dataset {path}"
                    )));
                }
            }
        }
        if shape == metadata.shape {
            return backend.write_slab(path, &subset, bytes);
        }
        debug!("extending dataset {path} from {:?} to {shape:?}", metadata.shape);
        backend.set_shape(path, &shape)?;
        let written = backend.write_slab(path, &subset, bytes);
        if written.is_err() {
            if let Err(err) = backend.set_shape(path, &metadata.shape) {
                warn!("failed to restore the shape {:?} of dataset {path}: {err}", metadata.shape);
            }
        }
        written
    }

    /// Write `values` to the slab of the open dataset at `start` with `size`.
    ///
    /// A slab beyond the extent of the unlimited dimension grows the dataset. Elements between the old extent and
    /// the slab read as zero.
    ///
    /// # Errors
    /// Returns [`NexusError::RankMismatch`] if `start` or `size` does not match the rank of the dataset or `values`
    /// does not fill `size`, [`NexusError::RangeError`] if the slab exceeds a fixed dimension or has a negative
    /// offset, or [`NexusError::TypeMismatch`] if the dataset does not store `T`.
    pub fn put_slab<T: Element>(&mut self, values: &[T], start: &[i64], size: &[i64]) -> Result<(), NexusError> {
        self.write_slab_bytes(Some(T::NUM_TYPE), &T::to_bytes(values), start, size)
    }

    /// Write little-endian bytes of the storage type to a slab of the open dataset. See [`File::put_slab`].
    ///
    /// # Errors
    /// See [`File::put_slab`].
    pub fn put_slab_bytes(&mut self, bytes: &[u8], start: &[i64], size: &[i64]) -> Result<(), NexusError> {
        self.write_slab_bytes(None, bytes, start, size)
    }

    /// Read the slab of the open dataset at `start` with `size`.
    ///
    /// # Errors
    /// Returns [`NexusError::RankMismatch`] if `start` or `size` does not match the rank of the dataset,
    /// [`NexusError::RangeError`] if the slab exceeds the current shape, or [`NexusError::TypeMismatch`] if the
    /// stored type does not widen to `T`.
    pub fn get_slab<T: Element>(&self, start: &[i64], size: &[i64]) -> Result<Vec<T>, NexusError> {
        Ok(T::from_values(self.read_values(Some(start), Some(size))?)?)
    }

    /// Read a slab of the open dataset as little-endian bytes of its storage type. See [`File::get_slab`].
    ///
    /// # Errors
    /// See [`File::get_slab`].
    pub fn get_slab_bytes(&self, start: &[i64], size: &[i64]) -> Result<Vec<u8>, NexusError> {
        Ok(self.read_values(Some(start), Some(size))?.to_bytes())
    }

    /// The storage type and current shape of the open dataset.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if no dataset is open.
    pub fn get_info(&self) -> Result<Info, NexusError> {
        let (_, _, metadata) = self.open_dataset()?;
        Ok(Info {
            data_type: metadata.data_type,
            dims: metadata.shape,
        })
    }

    /// Read the open one-dimensional `CHAR` dataset as a string, without trailing NUL padding.
    ///
    /// # Errors
    /// Returns [`NexusError::TypeMismatch`] if the dataset is not `CHAR`, or [`NexusError::RankMismatch`] if it is
    /// not one-dimensional.
    pub fn get_str_data(&self) -> Result<String, NexusError> {
        let info = self.get_info()?;
        if info.data_type != NumType::Char {
            return Err(NexusError::TypeMismatch(format!(
                "{} dataset is not text",
                info.data_type
            )));
        }
        if info.dims.len() != 1 {
            return Err(NexusError::RankMismatch(format!(
                "text dataset with {} dimensions",
                info.dims.len()
            )));
        }
        Ok(self
            .read_values(None, None)?
            .as_text()
            .unwrap_or_default())
    }

    /// Read the whole of the dataset `name` of the current group.
    ///
    /// # Errors
    /// See [`File::open_data`] and [`File::get_data`].
    pub fn read_data<T: Element>(&mut self, name: &str) -> Result<Vec<T>, NexusError> {
        self.open_data(name)?;
        let result = self.get_data_vec();
        self.close_data_after(result)
    }

    /// Read the first element of the dataset `name` of the current group.
    ///
    /// # Errors
    /// See [`File::read_data`]. Returns [`NexusError::RangeError`] if the dataset is empty.
    pub fn read_scalar<T: Element>(&mut self, name: &str) -> Result<T, NexusError> {
        self.read_data(name)?
            .into_iter()
            .next()
            .ok_or_else(|| NexusError::RangeError(format!("dataset {name} is empty")))
    }

    /// Read the text dataset `name` of the current group.
    ///
    /// # Errors
    /// See [`File::open_data`] and [`File::get_str_data`].
    pub fn read_str(&mut self, name: &str) -> Result<String, NexusError> {
        self.open_data(name)?;
        let result = self.get_str_data();
        self.close_data_after(result)
    }

    /// Allocate a zeroed buffer for every element of the dataset described by `info`.
    ///
    /// # Errors
    /// Returns [`NexusError::RangeError`] if the element count does not fit in memory.
    pub fn malloc<T: Element>(info: &Info) -> Result<Vec<T>, NexusError> {
        let too_large = || NexusError::RangeError(format!("{info} does not fit in memory"));
        let len = info
            .num_elements()
            .and_then(|len| usize::try_from(len).ok())
            .ok_or_else(too_large)?;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(len).map_err(|_| too_large())?;
        buffer.resize(len, T::default());
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{AccessMode, MemoryConnector},
        data_type::Char,
    };
    use std::{error::Error, sync::Arc};

    fn new_file() -> Result<File, Box<dyn Error>> {
        Ok(File::open_with(
            Arc::new(MemoryConnector::new()),
            "data",
            AccessMode::Create,
        )?)
    }

    #[test]
    fn data_dims() {
        assert_eq!(parse_dims(&[2, UNLIMITED]).unwrap(), (vec![2, 0], Some(1)));
        assert!(parse_dims(&[]).is_err());
        assert!(parse_dims(&[0]).is_err());
        assert!(parse_dims(&[UNLIMITED, UNLIMITED]).is_err());
        assert!(parse_dims(&[-2]).is_err());
        assert_eq!(chunk_shape(&[3, 4], None, None, 8).unwrap(), vec![3, 4]);
        assert_eq!(
            chunk_shape(&[0, 4], Some(0), Some(&[]), 8).unwrap(),
            vec![global_config().default_chunk_size(), 4]
        );
        assert!(chunk_shape(&[3, 4], None, Some(&[3]), 8).is_err());
        assert_eq!(chunk_shape(&[2, 3], None, Some(&[1, 3]), 8).unwrap(), vec![1, 3]);
    }

    #[test]
    fn data_default_chunks_are_bounded() {
        let max_bytes = global_config().default_chunk_bytes();
        for (shape, unlimited_dimension, element_size) in [
            (vec![2000, 2000], None, 8),
            (vec![0, 1 << 20], Some(0), 4),
            (vec![1 << 31, 1 << 31], None, 1),
            (vec![1 << 40], None, 2),
        ] {
            let chunk = chunk_shape(&shape, unlimited_dimension, None, element_size).unwrap();
            let bytes = checked_num_elements(&chunk).unwrap() * element_size as u64;
            assert!(bytes <= max_bytes, "{chunk:?} of {shape:?}");
            assert!(bytes > max_bytes / 4, "{chunk:?} of {shape:?}");
        }
        assert_eq!(chunk_shape(&[2000, 2000], None, None, 8).unwrap(), vec![500, 250]);
    }

    #[test]
    fn data_make() -> Result<(), Box<dyn Error>> {
        let mut file = new_file()?;
        file.make_data("x", NumType::Int16, &[2, 3], true)?;
        assert_eq!(
            file.get_info()?,
            Info {
                data_type: NumType::Int16,
                dims: vec![2, 3]
            }
        );
        assert_eq!(file.get_data_vec::<i16>()?, vec![0; 6]);
        assert!(matches!(
            file.make_data("y", NumType::Int16, &[2], false),
            Err(NexusError::InvalidState(_))
        ));
        file.close_data()?;
        assert!(matches!(
            file.make_data("x", NumType::Int16, &[2], false),
            Err(NexusError::NameConflict(_))
        ));
        assert!(matches!(
            file.make_data("y", NumType::Int16, &[2, 0], false),
            Err(NexusError::InvalidDimensions(_))
        ));
        assert!(matches!(file.get_info(), Err(NexusError::InvalidState(_))));
        Ok(())
    }

    #[test]
    fn data_put_get() -> Result<(), Box<dyn Error>> {
        let mut file = new_file()?;
        file.write_data_with_dims("x", &[1u16, 2, 3, 4, 5, 6], &[2, 3])?;
        file.open_data("x")?;
        let mut buffer = Vec::new();
        file.get_data::<u16>(&mut buffer)?;
        assert_eq!(buffer, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(file.get_data_vec::<i32>()?, vec![1, 2, 3, 4, 5, 6]);
        assert!(matches!(
            file.get_data_vec::<i16>(),
            Err(NexusError::TypeMismatch(_))
        ));
        assert!(matches!(
            file.put_data(&[1i32; 6]),
            Err(NexusError::TypeMismatch(_))
        ));
        assert!(matches!(
            file.put_data(&[1u16; 5]),
            Err(NexusError::RankMismatch(_))
        ));
        file.put_data_bytes(&[1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0])?;
        assert_eq!(file.get_slab::<u16>(&[1, 1], &[1, 2])?, vec![5, 6]);
        assert_eq!(file.get_slab_bytes(&[0, 2], &[1, 1])?, vec![3, 0]);
        assert!(file.is_data_int()?);
        Ok(())
    }

    #[test]
    fn data_slabs() -> Result<(), Box<dyn Error>> {
        let mut file = new_file()?;
        file.make_data("fixed", NumType::Float32, &[4], true)?;
        file.put_slab(&[1.0f32, 2.0], &[1], &[2])?;
        assert_eq!(file.get_data_vec::<f32>()?, vec![0.0, 1.0, 2.0, 0.0]);
        assert!(matches!(
            file.put_slab(&[1.0f32, 2.0], &[3], &[2]),
            Err(NexusError::RangeError(_))
        ));
        assert!(matches!(
            file.put_slab(&[1.0f32], &[-1], &[1]),
            Err(NexusError::RangeError(_))
        ));
        assert!(matches!(
            file.put_slab(&[1.0f32], &[0, 0], &[1, 1]),
            Err(NexusError::RankMismatch(_))
        ));
        assert!(matches!(
            file.get_slab::<f32>(&[2], &[3]),
            Err(NexusError::RangeError(_))
        ));
        file.close_data()?;

        file.make_data("grow", NumType::Int64, &[UNLIMITED, 2], true)?;
        file.put_slab(&[1i64, 2, 3, 4], &[1, 0], &[2, 2])?;
        assert_eq!(file.get_info()?.dims, vec![3, 2]);
        assert_eq!(file.get_data_vec::<i64>()?, vec![0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            file.put_slab(&[1i64, 2, 3], &[0, 0], &[1, 3]),
            Err(NexusError::RangeError(_))
        ));
        Ok(())
    }

    #[test]
    fn data_strings() -> Result<(), Box<dyn Error>> {
        let mut file = new_file()?;
        file.write_str("title", "run 42")?;
        file.write_str("empty", "")?;
        file.write_data_with_dims("grid", &[Char(b'a'), Char(b'b'), Char(b'c'), Char(b'd')], &[2, 2])?;
        file.write_data("bytes", &[b'a', b'b'])?;
        assert_eq!(file.read_str("title")?, "run 42");
        assert_eq!(file.read_str("empty")?, " ");
        assert!(matches!(
            file.read_str("grid"),
            Err(NexusError::RankMismatch(_))
        ));
        assert!(matches!(
            file.read_str("bytes"),
            Err(NexusError::TypeMismatch(_))
        ));
        assert!(!file.is_data_set_open());
        Ok(())
    }

    #[test]
    fn data_convenience() -> Result<(), Box<dyn Error>> {
        let mut file = new_file()?;
        file.write_scalar("count", 7u32)?;
        assert_eq!(file.read_scalar::<u32>("count")?, 7);
        assert_eq!(file.read_scalar::<u64>("count")?, 7);

        file.write_comp_data("packed", &[5i8; 8], &[8], Compression::Rle, &[4])?;
        assert_eq!(file.read_data::<i8>("packed")?, vec![5; 8]);

        file.write_extendible_data("log", &[1.5f64, 2.5], Some(2))?;
        file.write_updated_data("log", &[1.0f64, 2.0, 3.0])?;
        assert_eq!(file.read_data::<f64>("log")?, vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            file.write_updated_data("log", &[1i32, 2, 3]),
            Err(NexusError::TypeMismatch(_))
        ));
        assert!(matches!(
            file.write_updated_data("packed", &[1i8; 4]),
            Err(NexusError::NotExtendible(_))
        ));
        assert!(!file.is_data_set_open());

        file.write_extendible_data_with_dims("frames", &[1u8, 2, 3, 4, 5, 6], &[2, 3], &[1, 3])?;
        file.open_data("frames")?;
        let info = file.get_info()?;
        assert_eq!(info.dims, vec![2, 3]);
        assert_eq!(File::malloc::<u8>(&info)?, vec![0; 6]);
        assert_eq!(file.get_data_vec::<u8>()?, vec![1, 2, 3, 4, 5, 6]);
        Ok(())
    }

    #[test]
    fn data_coerce() -> Result<(), Box<dyn Error>> {
        let mut file = new_file()?;
        file.write_data("u16", &[1u16, 65535])?;
        file.write_data("f64", &[1.5f64, 2.0])?;
        file.write_data("u32", &[u32::MAX])?;

        file.open_data("u16")?;
        assert_eq!(file.get_data_coerce_int()?, vec![1, 65535]);
        assert_eq!(file.get_data_coerce_double()?, vec![1.0, 65535.0]);
        file.close_data()?;

        file.open_data("f64")?;
        assert!(!file.is_data_int()?);
        assert!(matches!(
            file.get_data_coerce_int(),
            Err(NexusError::CoercionError(_))
        ));
        assert_eq!(file.get_data_coerce_double()?, vec![1.5, 2.0]);
        file.close_data()?;

        file.open_data("u32")?;
        assert!(matches!(
            file.get_data_coerce_int(),
            Err(NexusError::CoercionError(_))
        ));
        Ok(())
    }
}
