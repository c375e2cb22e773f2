//! Key/value storage underneath the reference backend.
//!
//! A [store] maps [`StoreKey`]s to byte values. Keys are `/` separated and a [`StorePrefix`] names a "directory" of keys.
//! The [`StoreBackend`](crate::backend::StoreBackend) lays a NeXus hierarchy out on any store implementing the
//! [readable](ReadableStorageTraits), [writable](WritableStorageTraits) and [listable](ListableStorageTraits) traits:
//!  - every node has a JSON metadata document at `<path>/.nexus.json`, and
//!  - every chunk of a dataset lives at `<path>/c/<i>/<j>/...`.
//!
//! A [storage adapter](storage_adapter) wraps a store and has the same interface as a store.

pub mod storage_adapter;
mod storage_sync;
pub mod store;
mod store_key;
mod store_prefix;

use std::sync::Arc;

use thiserror::Error;

use crate::node::{NodeNameError, NodePath, NodePathError};

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

pub use self::storage_sync::{
    discover_children, erase_chunk, erase_node, node_exists, retrieve_chunk, retrieve_metadata,
    store_chunk, store_metadata, ListableStorageTraits, ReadableStorageTraits,
    ReadableWritableListableStorageTraits, WritableStorageTraits,
};

/// Bytes held by a store.
pub type Bytes = Vec<u8>;

/// Bytes which may be absent from a store.
pub type MaybeBytes = Option<Bytes>;

/// [`Arc`] wrapped readable, writable, and listable storage.
pub type ReadableWritableListableStorage = Arc<dyn ReadableWritableListableStorageTraits>;

/// The name of the metadata document of each node.
pub const NODE_METADATA_NAME: &str = ".nexus.json";

/// [`StoreKeys`] and [`StorePrefixes`].
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StoreKeysPrefixes {
    keys: StoreKeys,
    prefixes: StorePrefixes,
}

impl StoreKeysPrefixes {
    /// Create a new [`StoreKeysPrefixes`].
    #[must_use]
    pub const fn new(keys: StoreKeys, prefixes: StorePrefixes) -> Self {
        Self { keys, prefixes }
    }

    /// Returns the keys.
    #[must_use]
    pub const fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Returns the prefixes.
    #[must_use]
    pub const fn prefixes(&self) -> &StorePrefixes {
        &self.prefixes
    }
}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An error parsing the metadata for a key.
    #[error("error parsing metadata for {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// An invalid store prefix.
    #[error("invalid store prefix {0}")]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
    /// An invalid node path.
    #[error("invalid node path {0}")]
    NodePathError(#[from] NodePathError),
    /// An invalid node name.
    #[error("invalid node name {0}")]
    NodeNameError(#[from] NodeNameError),
    /// The requested method is not supported.
    #[error("{0}")]
    Unsupported(String),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// Return the metadata key (`.nexus.json`) given a node path.
#[must_use]
pub fn meta_key(path: &NodePath) -> StoreKey {
    let prefix = StorePrefix::from(path);
    unsafe { StoreKey::new_unchecked(format!("{prefix}{NODE_METADATA_NAME}")) }
}

/// Return the prefix holding the chunks of the dataset at `path`.
#[must_use]
pub fn data_prefix(path: &NodePath) -> StorePrefix {
    let prefix = StorePrefix::from(path);
    unsafe { StorePrefix::new_unchecked(format!("{prefix}c/")) }
}

/// Return the data key given a node path and chunk grid indices.
///
/// Chunk indices are joined with `/` after a `c` component, so chunk `[1, 23]` of `/entry/data` is `entry/data/c/1/23`.
#[must_use]
pub fn data_key(path: &NodePath, chunk_grid_indices: &[u64]) -> StoreKey {
    let mut key = data_prefix(path).as_str().to_string();
    if chunk_grid_indices.is_empty() {
        key.push('0');
    } else {
        key.push_str(
            &chunk_grid_indices
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("/"),
        );
    }
    unsafe { StoreKey::new_unchecked(key) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_keys() {
        assert_eq!(meta_key(&NodePath::root()).as_str(), ".nexus.json");
        assert_eq!(
            meta_key(&NodePath::new("/entry/data").unwrap()).as_str(),
            "entry/data/.nexus.json"
        );
    }

    #[test]
    fn chunk_keys() {
        let path = NodePath::new("/entry/data").unwrap();
        assert_eq!(data_key(&path, &[1, 23]).as_str(), "entry/data/c/1/23");
        assert_eq!(data_key(&path, &[]).as_str(), "entry/data/c/0");
        assert_eq!(data_prefix(&path).as_str(), "entry/data/c/");
        assert_eq!(data_key(&NodePath::root(), &[4]).as_str(), "c/4");
    }
}
