use crate::node::{NodeMetadata, NodePath};

use super::{
    data_key, data_prefix, meta_key, MaybeBytes, StorageError, StoreKey, StoreKeys,
    StoreKeysPrefixes, StorePrefix,
};

/// Readable storage traits.
pub trait ReadableStorageTraits: Send + Sync {
    /// Retrieve the value (bytes) associated with a given [`StoreKey`].
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;

    /// Return the size in bytes of the value at `key`.
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError>;
}

/// Listable storage traits.
pub trait ListableStorageTraits: Send + Sync {
    /// Retrieve all [`StoreKeys`] in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn list(&self) -> Result<StoreKeys, StorageError>;

    /// Retrieve all [`StoreKeys`] with a given [`StorePrefix`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the prefix is not a directory or there is an underlying error with the store.
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError>;

    /// Retrieve all [`StoreKeys`] and [`StorePrefix`] which are direct children of [`StorePrefix`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the prefix is not a directory or there is an underlying error with the store.
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError>;

    /// Return the size in bytes of all keys under `prefix`.
    ///
    /// # Errors
    /// Returns a `StorageError` if there is an underlying error with the store.
    fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError>;

    /// Return the total size in bytes of the storage.
    ///
    /// # Errors
    /// Returns a `StorageError` if there is an underlying error with the store.
    fn size(&self) -> Result<u64, StorageError> {
        self.size_prefix(&StorePrefix::root())
    }
}

/// Writable storage traits.
pub trait WritableStorageTraits: Send + Sync {
    /// Store bytes at a [`StoreKey`], replacing any existing value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError>;

    /// Erase a [`StoreKey`].
    ///
    /// Returns true if the key existed and was erased, or false if the key did not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError>;

    /// Erase all [`StoreKey`] under [`StorePrefix`].
    ///
    /// Returns true if any key was erased.
    ///
    /// # Errors
    /// Returns a [`StorageError`] is the prefix is not in the store, or the erase otherwise fails.
    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError>;
}

/// A supertrait of [`ReadableStorageTraits`], [`WritableStorageTraits`], and [`ListableStorageTraits`].
pub trait ReadableWritableListableStorageTraits:
    ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits
{
}

impl<T> ReadableWritableListableStorageTraits for T where
    T: ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits
{
}

/// Retrieve the metadata document of the node at `path`.
///
/// Returns [`None`] if there is no node at `path`.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying error with the store or the document is not valid.
pub fn retrieve_metadata<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<Option<NodeMetadata>, StorageError> {
    let key = meta_key(path);
    match storage.get(&key)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| StorageError::InvalidMetadata(key, err.to_string())),
        None => Ok(None),
    }
}

/// Store the metadata document of the node at `path`.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn store_metadata<TStorage: ?Sized + WritableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
    metadata: &NodeMetadata,
) -> Result<(), StorageError> {
    let key = meta_key(path);
    let json = serde_json::to_vec_pretty(metadata)
        .map_err(|err| StorageError::InvalidMetadata(key.clone(), err.to_string()))?;
    storage.set(&key, &json)
}

/// Check if a node exists at `path`.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn node_exists<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<bool, StorageError> {
    Ok(storage.size_key(&meta_key(path))?.is_some())
}

/// Return the paths of the direct children of the group at `path`, in lexicographic order.
///
/// A child is any sub-prefix holding a node metadata document.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn discover_children<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<Vec<NodePath>, StorageError> {
    let prefix = StorePrefix::from(path);
    let mut children = Vec::new();
    for child_prefix in storage.list_dir(&prefix)?.prefixes() {
        let name = child_prefix
            .as_str()
            .strip_prefix(prefix.as_str())
            .unwrap_or(child_prefix.as_str())
            .trim_end_matches('/');
        let child_path = path.child(name)?;
        if node_exists(storage, &child_path)? {
            children.push(child_path);
        }
    }
    children.sort();
    Ok(children)
}

/// Retrieve the encoded chunk at `chunk_indices` of the dataset at `path`.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn retrieve_chunk<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
    chunk_indices: &[u64],
) -> Result<MaybeBytes, StorageError> {
    storage.get(&data_key(path, chunk_indices))
}

/// Store an encoded chunk at `chunk_indices` of the dataset at `path`.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn store_chunk<TStorage: ?Sized + WritableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
    chunk_indices: &[u64],
    encoded_chunk_bytes: &[u8],
) -> Result<(), StorageError> {
    storage.set(&data_key(path, chunk_indices), encoded_chunk_bytes)
}

/// Erase the chunk at `chunk_indices` of the dataset at `path`.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn erase_chunk<TStorage: ?Sized + WritableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
    chunk_indices: &[u64],
) -> Result<bool, StorageError> {
    storage.erase(&data_key(path, chunk_indices))
}

/// Erase every key of the node at `path`, including its chunks and descendants.
///
/// The root node erases the whole store.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn erase_node<TStorage: ?Sized + WritableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<bool, StorageError> {
    storage.erase_prefix(&StorePrefix::from(path))
}

/// Erase every chunk of the dataset at `path`.
pub(crate) fn erase_chunks<TStorage: ?Sized + WritableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<bool, StorageError> {
    storage.erase_prefix(&data_prefix(path))
}
