use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::debug;

use crate::{
    array_subset::{checked_num_elements, ArraySubset},
    config::global_config,
    data_type::Compression,
    node::{
        AttributeMetadata, ChunkEncoding, DataMetadata, ExternalMetadata, GroupMetadata,
        LinkMetadata, NodeMetadata, NodePath,
    },
    storage::{
        discover_children, erase_chunk, erase_node, node_exists, retrieve_chunk,
        retrieve_metadata, store_chunk, store_metadata, ReadableWritableListableStorageTraits,
        StorageError,
    },
    NexusError,
};

use super::{
    chunk_codec::{decode_chunk, encode_chunk},
    AccessMode, Backend,
};

/// A [`Backend`] laid out on a key/value store.
///
/// Each node has a JSON metadata document at `<path>/.nexus.json` and the chunks of a dataset live at
/// `<path>/c/<i>/<j>/...`. Chunks that were never written read as zeros.
pub struct StoreBackend<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    identifier: String,
    access: AccessMode,
    closed: AtomicBool,
}

impl<TStorage: ?Sized> std::fmt::Debug for StoreBackend<TStorage> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBackend")
            .field("identifier", &self.identifier)
            .field("access", &self.access)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn subset_error(err: impl std::fmt::Display) -> NexusError {
    NexusError::RankMismatch(err.to_string())
}

/// The byte length of an array of `shape` with `element_size`, if a buffer of that length can exist.
fn byte_len(shape: &[u64], element_size: usize) -> Option<usize> {
    checked_num_elements(shape)?
        .checked_mul(element_size as u64)
        .and_then(|len| usize::try_from(len).ok())
        .filter(|&len| isize::try_from(len).is_ok())
}

/// Allocate a zeroed buffer of `len` bytes, failing instead of aborting if it cannot be allocated.
fn zeroed(len: usize) -> Result<Vec<u8>, NexusError> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|err| NexusError::RangeError(format!("{len} bytes: {err}")))?;
    bytes.resize(len, 0);
    Ok(bytes)
}

/// The chunk encoding realising a compression hint.
fn chunk_encoding(compression: Compression) -> ChunkEncoding {
    let config = global_config();
    match compression {
        Compression::None | Compression::Chunk => ChunkEncoding::Raw,
        #[cfg(feature = "gzip")]
        Compression::Lzw if config.compression_enabled() => ChunkEncoding::Gzip {
            level: config.compression_level(),
        },
        compression => {
            debug!("ignoring unsupported compression {compression}");
            ChunkEncoding::Raw
        }
    }
}

impl<TStorage: ?Sized + ReadableWritableListableStorageTraits> StoreBackend<TStorage> {
    /// Open the container in `storage` with `access`. `identifier` names the container in messages and link ids.
    ///
    /// # Errors
    /// Returns [`NexusError::OpenError`] if:
    ///  - `access` is [`AccessMode::Read`] or [`AccessMode::ReadWrite`] and there is no container,
    ///  - `access` is [`AccessMode::Create`] and a container already exists, or
    ///  - the store cannot be accessed.
    pub fn new(
        storage: Arc<TStorage>,
        identifier: impl Into<String>,
        access: AccessMode,
    ) -> Result<Self, NexusError> {
        let identifier = identifier.into();
        let open_error = |message: String| NexusError::OpenError(format!("{identifier}: {message}"));
        let root = NodePath::root();
        let exists = node_exists(&*storage, &root).map_err(|err| open_error(err.to_string()))?;
        match access {
            AccessMode::Read | AccessMode::ReadWrite => {
                match retrieve_metadata(&*storage, &root).map_err(|err| open_error(err.to_string()))? {
                    Some(NodeMetadata::Group(_)) => {}
                    Some(_) => return Err(open_error("the root node is not a group".to_string())),
                    None => return Err(open_error("no container".to_string())),
                }
            }
            AccessMode::Create | AccessMode::CreateOverwrite => {
                if exists {
                    if access == AccessMode::Create {
                        return Err(open_error("container already exists".to_string()));
                    }
                    erase_node(&*storage, &root).map_err(|err| open_error(err.to_string()))?;
                }
                store_metadata(&*storage, &root, &NodeMetadata::Group(GroupMetadata::new("")))
                    .map_err(|err| open_error(err.to_string()))?;
            }
        }
        debug!("opened {identifier} ({access})");
        Ok(Self {
            storage,
            identifier,
            access,
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<TStorage> {
        &self.storage
    }

    fn check_open(&self) -> Result<(), NexusError> {
        if self.closed.load(Ordering::Acquire) {
            Err(NexusError::InvalidState(format!(
                "container {} is closed",
                self.identifier
            )))
        } else {
            Ok(())
        }
    }

    fn check_writable(&self) -> Result<(), NexusError> {
        self.check_open()?;
        if self.access.is_writable() {
            Ok(())
        } else {
            Err(StorageError::ReadOnly.into())
        }
    }

    /// Check that a node can be created at `path`.
    fn prepare_create(&self, path: &NodePath) -> Result<(), NexusError> {
        self.check_writable()?;
        let parent = path
            .parent()
            .ok_or_else(|| NexusError::NameConflict(path.to_string()))?;
        match retrieve_metadata(&*self.storage, &parent)? {
            Some(NodeMetadata::Group(_)) => {}
            _ => return Err(NexusError::NotFound(format!("group {parent}"))),
        }
        if node_exists(&*self.storage, path)? {
            return Err(NexusError::NameConflict(path.to_string()));
        }
        Ok(())
    }

    fn data_metadata(&self, path: &NodePath) -> Result<DataMetadata, NexusError> {
        match retrieve_metadata(&*self.storage, path)? {
            Some(NodeMetadata::Data(data)) => Ok(data),
            Some(_) => Err(NexusError::TypeMismatch(format!("{path} is not a dataset"))),
            None => Err(NexusError::NotFound(format!("dataset {path}"))),
        }
    }

    fn chunk_len(metadata: &DataMetadata) -> Result<usize, NexusError> {
        byte_len(&metadata.chunk_shape, metadata.data_type.size()).ok_or_else(|| {
            NexusError::RangeError(format!("chunk shape {:?} is too large", metadata.chunk_shape))
        })
    }

    fn retrieve_decoded_chunk(
        &self,
        path: &NodePath,
        metadata: &DataMetadata,
        chunk_indices: &[u64],
    ) -> Result<Option<Vec<u8>>, NexusError> {
        let Some(encoded) = retrieve_chunk(&*self.storage, path, chunk_indices)? else {
            return Ok(None);
        };
        let decoded = decode_chunk(metadata.chunk_encoding, encoded, Self::chunk_len(metadata)?)?;
        Ok(Some(decoded))
    }

    fn store_decoded_chunk(
        &self,
        path: &NodePath,
        metadata: &DataMetadata,
        chunk_indices: &[u64],
        decoded: Vec<u8>,
    ) -> Result<(), NexusError> {
        let encoded = encode_chunk(metadata.chunk_encoding, decoded)?;
        store_chunk(&*self.storage, path, chunk_indices, &encoded)?;
        Ok(())
    }

    fn check_subset(
        path: &NodePath,
        metadata: &DataMetadata,
        subset: &ArraySubset,
    ) -> Result<(), NexusError> {
        if subset.dimensionality() != metadata.shape.len() {
            return Err(NexusError::RankMismatch(format!(
                "subset {subset} of dataset {path} with {} dimensions",
                metadata.shape.len()
            )));
        }
        if !subset.inbounds(&metadata.shape) {
            return Err(NexusError::RangeError(format!(
                "subset {subset} of dataset {path} with shape {:?}",
                metadata.shape
            )));
        }
        Ok(())
    }
}

impl<TStorage: ?Sized + ReadableWritableListableStorageTraits> Backend for StoreBackend<TStorage> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn access(&self) -> AccessMode {
        self.access
    }

    fn node(&self, path: &NodePath) -> Result<Option<NodeMetadata>, NexusError> {
        self.check_open()?;
        Ok(retrieve_metadata(&*self.storage, path)?)
    }

    fn children(&self, path: &NodePath) -> Result<Vec<(String, NodeMetadata)>, NexusError> {
        self.check_open()?;
        match retrieve_metadata(&*self.storage, path)? {
            Some(NodeMetadata::Group(_)) => {}
            Some(_) => return Err(NexusError::TypeMismatch(format!("{path} is not a group"))),
            None => return Err(NexusError::NotFound(format!("group {path}"))),
        }
        let mut children = Vec::new();
        for child in discover_children(&*self.storage, path)? {
            if let Some(metadata) = retrieve_metadata(&*self.storage, &child)? {
                children.push((child.name().to_string(), metadata));
            }
        }
        Ok(children)
    }

    fn create_group(&self, path: &NodePath, nx_class: &str) -> Result<(), NexusError> {
        self.prepare_create(path)?;
        store_metadata(
            &*self.storage,
            path,
            &NodeMetadata::Group(GroupMetadata::new(nx_class)),
        )?;
        debug!("created group {path}:{nx_class} in {}", self.identifier);
        Ok(())
    }

    fn create_data(&self, path: &NodePath, mut metadata: DataMetadata) -> Result<DataMetadata, NexusError> {
        if metadata.chunk_shape.len() != metadata.shape.len()
            || metadata.chunk_shape.contains(&0)
            || metadata
                .unlimited_dimension
                .is_some_and(|dim| dim >= metadata.shape.len())
            || byte_len(&metadata.chunk_shape, metadata.data_type.size()).is_none()
            || checked_num_elements(&metadata.shape)
                .and_then(|count| count.checked_mul(metadata.data_type.size() as u64))
                .is_none()
        {
            return Err(NexusError::InvalidDimensions(format!(
                "shape {:?} chunk shape {:?} unlimited dimension {:?}",
                metadata.shape, metadata.chunk_shape, metadata.unlimited_dimension
            )));
        }
        self.prepare_create(path)?;
        metadata.chunk_encoding = chunk_encoding(metadata.compression);
        store_metadata(&*self.storage, path, &NodeMetadata::Data(metadata.clone()))?;
        debug!(
            "created dataset {path} {} {:?} in {}",
            metadata.data_type, metadata.shape, self.identifier
        );
        Ok(metadata)
    }

    fn create_link(&self, path: &NodePath, target: &NodePath) -> Result<(), NexusError> {
        self.prepare_create(path)?;
        store_metadata(
            &*self.storage,
            path,
            &NodeMetadata::Link(LinkMetadata {
                target: target.clone(),
            }),
        )?;
        debug!("created link {path} -> {target} in {}", self.identifier);
        Ok(())
    }

    fn create_external(&self, path: &NodePath, nx_class: &str, url: &str) -> Result<(), NexusError> {
        self.prepare_create(path)?;
        store_metadata(
            &*self.storage,
            path,
            &NodeMetadata::External(ExternalMetadata {
                nx_class: nx_class.to_string(),
                url: url.to_string(),
            }),
        )?;
        debug!("created external link {path} -> {url} in {}", self.identifier);
        Ok(())
    }

    fn put_attribute(&self, path: &NodePath, attribute: AttributeMetadata) -> Result<(), NexusError> {
        self.check_writable()?;
        let mut metadata = retrieve_metadata(&*self.storage, path)?
            .ok_or_else(|| NexusError::NotFound(path.to_string()))?;
        let attributes = metadata
            .attributes_mut()
            .ok_or_else(|| NexusError::NotFound(format!("attributes of {path}")))?;
        if let Some(existing) = attributes.iter_mut().find(|a| a.name == attribute.name) {
            *existing = attribute;
        } else {
            attributes.push(attribute);
        }
        store_metadata(&*self.storage, path, &metadata)?;
        Ok(())
    }

    fn read_slab(&self, path: &NodePath, subset: &ArraySubset) -> Result<Vec<u8>, NexusError> {
        self.check_open()?;
        let metadata = self.data_metadata(path)?;
        Self::check_subset(path, &metadata, subset)?;
        let element_size = metadata.data_type.size();
        let len = byte_len(subset.shape(), element_size).ok_or_else(|| {
            NexusError::RangeError(format!("subset {subset} of dataset {path} is too large"))
        })?;
        let mut bytes = zeroed(len)?;
        for (chunk_indices, chunk_subset) in subset.iter_chunks(&metadata.chunk_shape)? {
            let Some(overlap) = subset.overlap(&chunk_subset) else {
                continue;
            };
            let Some(chunk_bytes) = self.retrieve_decoded_chunk(path, &metadata, &chunk_indices)?
            else {
                continue;
            };
            let overlap_bytes = overlap
                .relative_to(chunk_subset.start())
                .extract_bytes(&chunk_bytes, chunk_subset.shape(), element_size)
                .map_err(subset_error)?;
            overlap
                .relative_to(subset.start())
                .store_bytes(&overlap_bytes, &mut bytes, subset.shape(), element_size)
                .map_err(subset_error)?;
        }
        Ok(bytes)
    }

    fn write_slab(&self, path: &NodePath, subset: &ArraySubset, bytes: &[u8]) -> Result<(), NexusError> {
        self.check_writable()?;
        let metadata = self.data_metadata(path)?;
        Self::check_subset(path, &metadata, subset)?;
        let element_size = metadata.data_type.size();
        if byte_len(subset.shape(), element_size) != Some(bytes.len()) {
            return Err(NexusError::RankMismatch(format!(
                "{} bytes for subset {subset} of dataset {path}",
                bytes.len()
            )));
        }
        let chunk_len = Self::chunk_len(&metadata)?;
        for (chunk_indices, chunk_subset) in subset.iter_chunks(&metadata.chunk_shape)? {
            let Some(overlap) = subset.overlap(&chunk_subset) else {
                continue;
            };
            let overlap_bytes = overlap
                .relative_to(subset.start())
                .extract_bytes(bytes, subset.shape(), element_size)
                .map_err(subset_error)?;
            let mut chunk_bytes = if overlap == chunk_subset {
                zeroed(chunk_len)?
            } else {
                match self.retrieve_decoded_chunk(path, &metadata, &chunk_indices)? {
                    Some(chunk_bytes) => chunk_bytes,
                    None => zeroed(chunk_len)?,
                }
            };
            overlap
                .relative_to(chunk_subset.start())
                .store_bytes(&overlap_bytes, &mut chunk_bytes, chunk_subset.shape(), element_size)
                .map_err(subset_error)?;
            self.store_decoded_chunk(path, &metadata, &chunk_indices, chunk_bytes)?;
        }
        Ok(())
    }

    fn set_shape(&self, path: &NodePath, shape: &[u64]) -> Result<(), NexusError> {
        self.check_writable()?;
        let mut metadata = self.data_metadata(path)?;
        if shape.len() != metadata.shape.len() {
            return Err(NexusError::RankMismatch(format!(
                "shape {shape:?} for dataset {path} with shape {:?}",
                metadata.shape
            )));
        }
        if shape == metadata.shape.as_slice() {
            return Ok(());
        }
        if checked_num_elements(shape)
            .and_then(|count| count.checked_mul(metadata.data_type.size() as u64))
            .is_none()
        {
            return Err(NexusError::RangeError(format!(
                "shape {shape:?} of dataset {path} is too large"
            )));
        }

        // Discard elements beyond the new extent so that a later growth reads zeros
        if std::iter::zip(shape, &metadata.shape).any(|(new, old)| new < old) {
            let element_size = metadata.data_type.size();
            let new_subset = ArraySubset::new_with_shape(shape.to_vec());
            let old_subset = ArraySubset::new_with_shape(metadata.shape.clone());
            for (chunk_indices, chunk_subset) in old_subset.iter_chunks(&metadata.chunk_shape)? {
                match chunk_subset.overlap(&new_subset) {
                    None => {
                        erase_chunk(&*self.storage, path, &chunk_indices)?;
                    }
                    Some(kept) if kept != chunk_subset => {
                        let Some(chunk_bytes) =
                            self.retrieve_decoded_chunk(path, &metadata, &chunk_indices)?
                        else {
                            continue;
                        };
                        let kept = kept.relative_to(chunk_subset.start());
                        let kept_bytes = kept
                            .extract_bytes(&chunk_bytes, chunk_subset.shape(), element_size)
                            .map_err(subset_error)?;
                        let mut trimmed = vec![0; chunk_bytes.len()];
                        kept.store_bytes(&kept_bytes, &mut trimmed, chunk_subset.shape(), element_size)
                            .map_err(subset_error)?;
                        self.store_decoded_chunk(path, &metadata, &chunk_indices, trimmed)?;
                    }
                    Some(_) => {}
                }
            }
        }

        debug!("resized dataset {path} from {:?} to {shape:?}", metadata.shape);
        metadata.shape = shape.to_vec();
        store_metadata(&*self.storage, path, &NodeMetadata::Data(metadata))?;
        Ok(())
    }

    fn flush(&self) -> Result<(), NexusError> {
        self.check_open()?;
        debug!("flushed {}", self.identifier);
        Ok(())
    }

    fn close(&self) -> Result<(), NexusError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("closed {}", self.identifier);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data_type::NumType, storage::store::MemoryStore};
    use std::error::Error;

    fn int32_dataset(shape: Vec<u64>, chunk_shape: Vec<u64>) -> DataMetadata {
        DataMetadata::new(NumType::Int32, shape, Some(0), chunk_shape, Compression::None)
    }

    fn int32_bytes(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn store_backend_access_modes() -> Result<(), Box<dyn Error>> {
        let store = Arc::new(MemoryStore::new());
        assert!(matches!(
            StoreBackend::new(store.clone(), "m", AccessMode::Read),
            Err(NexusError::OpenError(_))
        ));
        let backend = StoreBackend::new(store.clone(), "m", AccessMode::Create)?;
        backend.create_group(&NodePath::new("/entry")?, "NXentry")?;
        assert!(matches!(
            StoreBackend::new(store.clone(), "m", AccessMode::Create),
            Err(NexusError::OpenError(_))
        ));

        let reader = StoreBackend::new(store.clone(), "m", AccessMode::Read)?;
        assert_eq!(reader.children(&NodePath::root())?.len(), 1);
        assert!(matches!(
            reader.create_group(&NodePath::new("/other")?, "NXentry"),
            Err(NexusError::StorageError(StorageError::ReadOnly))
        ));

        let overwritten = StoreBackend::new(store, "m", AccessMode::CreateOverwrite)?;
        assert!(overwritten.children(&NodePath::root())?.is_empty());
        Ok(())
    }

    #[test]
    fn store_backend_create() -> Result<(), Box<dyn Error>> {
        let backend = StoreBackend::new(Arc::new(MemoryStore::new()), "m", AccessMode::Create)?;
        let entry = NodePath::new("/entry")?;
        backend.create_group(&entry, "NXentry")?;
        assert!(matches!(
            backend.create_group(&entry, "NXdata"),
            Err(NexusError::NameConflict(_))
        ));
        assert!(matches!(
            backend.create_group(&NodePath::new("/missing/child")?, "NXdata"),
            Err(NexusError::NotFound(_))
        ));
        assert!(matches!(
            backend.create_data(&entry.child("x")?, int32_dataset(vec![4], vec![0])),
            Err(NexusError::InvalidDimensions(_))
        ));
        backend.create_data(&entry.child("x")?, int32_dataset(vec![4], vec![2]))?;
        backend.create_link(&NodePath::new("/x")?, &entry.child("x")?)?;

        let children = backend.children(&NodePath::root())?;
        let names: Vec<_> = children.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["entry", "x"]);
        assert!(matches!(children[1].1, NodeMetadata::Link(_)));
        Ok(())
    }

    #[test]
    fn store_backend_attributes() -> Result<(), Box<dyn Error>> {
        let backend = StoreBackend::new(Arc::new(MemoryStore::new()), "m", AccessMode::Create)?;
        let root = NodePath::root();
        let values = crate::data_type::ArrayValues::from("v1");
        backend.put_attribute(&root, AttributeMetadata::new("a", &values, vec![2]))?;
        backend.put_attribute(&root, AttributeMetadata::new("b", &values, vec![2]))?;
        let values = crate::data_type::ArrayValues::from("v22");
        backend.put_attribute(&root, AttributeMetadata::new("a", &values, vec![3]))?;
        let attributes = backend.attributes(&root)?;
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].name, "a");
        assert_eq!(attributes[0].values()?.as_text().as_deref(), Some("v22"));
        Ok(())
    }

    #[test]
    fn store_backend_slabs() -> Result<(), Box<dyn Error>> {
        let backend = StoreBackend::new(Arc::new(MemoryStore::new()), "m", AccessMode::Create)?;
        let path = NodePath::new("/x")?;
        backend.create_data(&path, int32_dataset(vec![3, 4], vec![2, 3]))?;

        let whole = ArraySubset::new_with_shape(vec![3, 4]);
        assert_eq!(backend.read_slab(&path, &whole)?, vec![0; 48]);

        let subset = ArraySubset::new_with_start_shape(vec![1, 1], vec![2, 3])?;
        backend.write_slab(&path, &subset, &int32_bytes(&[1, 2, 3, 4, 5, 6]))?;
        assert_eq!(
            backend.read_slab(&path, &whole)?,
            int32_bytes(&[0, 0, 0, 0, 0, 1, 2, 3, 0, 4, 5, 6])
        );
        assert_eq!(
            backend.read_slab(&path, &ArraySubset::new_with_start_shape(vec![2, 2], vec![1, 2])?)?,
            int32_bytes(&[5, 6])
        );

        assert!(matches!(
            backend.read_slab(&path, &ArraySubset::new_with_start_shape(vec![2, 2], vec![2, 2])?),
            Err(NexusError::RangeError(_))
        ));
        assert!(matches!(
            backend.write_slab(&path, &subset, &[0; 4]),
            Err(NexusError::RankMismatch(_))
        ));
        assert!(matches!(
            backend.read_slab(&path, &ArraySubset::new_with_shape(vec![3])),
            Err(NexusError::RankMismatch(_))
        ));
        Ok(())
    }

    #[test]
    fn store_backend_set_shape() -> Result<(), Box<dyn Error>> {
        let backend = StoreBackend::new(Arc::new(MemoryStore::new()), "m", AccessMode::Create)?;
        let path = NodePath::new("/x")?;
        backend.create_data(&path, int32_dataset(vec![6], vec![4]))?;
        backend.write_slab(&path, &ArraySubset::new_with_shape(vec![6]), &int32_bytes(&[1, 2, 3, 4, 5, 6]))?;

        backend.set_shape(&path, &[3])?;
        backend.set_shape(&path, &[8])?;
        assert_eq!(
            backend.read_slab(&path, &ArraySubset::new_with_shape(vec![8]))?,
            int32_bytes(&[1, 2, 3, 0, 0, 0, 0, 0])
        );
        assert!(matches!(
            backend.set_shape(&path, &[8, 1]),
            Err(NexusError::RankMismatch(_))
        ));
        Ok(())
    }

    #[test]
    fn store_backend_large_extents() -> Result<(), Box<dyn Error>> {
        let backend = StoreBackend::new(Arc::new(MemoryStore::new()), "m", AccessMode::Create)?;
        assert!(matches!(
            backend.create_data(&NodePath::new("/x")?, int32_dataset(vec![1 << 32, 1 << 32], vec![1, 1])),
            Err(NexusError::InvalidDimensions(_))
        ));
        assert!(matches!(
            backend.create_data(&NodePath::new("/x")?, int32_dataset(vec![1 << 32, 4], vec![1 << 32, 1 << 32])),
            Err(NexusError::InvalidDimensions(_))
        ));

        let path = NodePath::new("/y")?;
        backend.create_data(&path, int32_dataset(vec![1 << 31, 1 << 30], vec![16, 16]))?;
        let corner = ArraySubset::new_with_start_shape(vec![(1 << 31) - 1, (1 << 30) - 1], vec![1, 1])?;
        backend.write_slab(&path, &corner, &int32_bytes(&[9]))?;
        assert_eq!(backend.read_slab(&path, &corner)?, int32_bytes(&[9]));
        assert!(matches!(
            backend.read_slab(&path, &ArraySubset::new_with_shape(vec![1 << 31, 1 << 30])),
            Err(NexusError::RangeError(_))
        ));
        assert!(matches!(
            backend.set_shape(&path, &[1 << 40, 1 << 40]),
            Err(NexusError::RangeError(_))
        ));
        Ok(())
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn store_backend_gzip() -> Result<(), Box<dyn Error>> {
        let store = Arc::new(MemoryStore::new());
        let backend = StoreBackend::new(store.clone(), "m", AccessMode::Create)?;
        let path = NodePath::new("/x")?;
        let metadata = DataMetadata::new(NumType::Int32, vec![64], None, vec![64], Compression::Lzw);
        let metadata = backend.create_data(&path, metadata)?;
        assert!(!metadata.chunk_encoding.is_raw());

        let values: Vec<i32> = (0..64).collect();
        let subset = ArraySubset::new_with_shape(vec![64]);
        backend.write_slab(&path, &subset, &int32_bytes(&values))?;
        assert_eq!(backend.read_slab(&path, &subset)?, int32_bytes(&values));
        let encoded = retrieve_chunk(&*store, &path, &[0])?.unwrap();
        assert_ne!(encoded, int32_bytes(&values));

        let rle = DataMetadata::new(NumType::Int32, vec![4], None, vec![4], Compression::Rle);
        assert!(backend.create_data(&NodePath::new("/y")?, rle)?.chunk_encoding.is_raw());
        Ok(())
    }

    #[test]
    fn store_backend_close() -> Result<(), Box<dyn Error>> {
        let backend = StoreBackend::new(Arc::new(MemoryStore::new()), "m", AccessMode::Create)?;
        backend.close()?;
        backend.close()?;
        assert!(backend.is_closed());
        assert!(matches!(
            backend.node(&NodePath::root()),
            Err(NexusError::InvalidState(_))
        ));
        Ok(())
    }
}
