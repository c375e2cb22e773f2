//! A storage adapter which logs store calls.

use std::sync::Arc;

use itertools::Itertools;

use crate::storage::{
    Bytes, ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey,
    StoreKeys, StoreKeysPrefixes, StorePrefix, WritableStorageTraits,
};

/// The usage log storage adapter. Logs storage method calls through [`log`] at the `trace` level.
///
/// It is intended to aid in debugging by revealing the storage access pattern of a [`File`](crate::File).
///
/// ### Example
/// ```rust
/// # use std::sync::Arc;
/// # use nexusfile::storage::{store::MemoryStore, storage_adapter::UsageLogStorageAdapter};
/// # use nexusfile::backend::{AccessMode, StoreBackend};
/// let store = Arc::new(UsageLogStorageAdapter::new(Arc::new(MemoryStore::new())));
/// let backend = StoreBackend::new(store, "memory", AccessMode::Create)?;
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
///
/// Creating a group and a dataset then logs lines such as:
/// ```text
/// size_key(.nexus.json) -> Ok(None)
/// set(.nexus.json, len=61) -> Ok(())
/// get(entry/.nexus.json) -> len=Ok(79)
/// set(entry/counts/c/0, len=40) -> Ok(())
/// list_dir(entry/) -> (keys:[entry/.nexus.json], prefixes:[entry/counts/])
/// ```
#[derive(Debug)]
pub struct UsageLogStorageAdapter<TStorage: ?Sized> {
    storage: Arc<TStorage>,
}

impl<TStorage: ?Sized> UsageLogStorageAdapter<TStorage> {
    /// Create a new usage log storage adapter wrapping `storage`.
    #[must_use]
    pub const fn new(storage: Arc<TStorage>) -> Self {
        Self { storage }
    }

    /// Returns the wrapped storage.
    #[must_use]
    pub fn inner(&self) -> &Arc<TStorage> {
        &self.storage
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> ReadableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let result = self.storage.get(key);
        log::trace!(
            "get({key}) -> len={:?}",
            result.as_ref().map(|v| v.as_ref().map_or(0, Bytes::len))
        );
        result
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let result = self.storage.size_key(key);
        log::trace!("size_key({key}) -> {result:?}");
        result
    }
}

impl<TStorage: ?Sized + ListableStorageTraits> ListableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let result = self.storage.list();
        log::trace!(
            "list() -> [{}]",
            result.as_ref().map_or(String::new(), |keys| keys.iter().format(", ").to_string())
        );
        result
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let result = self.storage.list_prefix(prefix);
        log::trace!(
            "list_prefix({prefix}) -> [{}]",
            result.as_ref().map_or(String::new(), |keys| keys.iter().format(", ").to_string())
        );
        result
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let result = self.storage.list_dir(prefix);
        log::trace!(
            "list_dir({prefix}) -> (keys:[{}], prefixes:[{}])",
            result.as_ref().map_or(String::new(), |skp| skp
                .keys()
                .iter()
                .format(", ")
                .to_string()),
            result.as_ref().map_or(String::new(), |skp| skp
                .prefixes()
                .iter()
                .format(", ")
                .to_string()),
        );
        result
    }

    fn size_prefix(&self, prefix: &StorePrefix) -> Result<u64, StorageError> {
        let result = self.storage.size_prefix(prefix);
        log::trace!("size_prefix({prefix}) -> {result:?}");
        result
    }
}

impl<TStorage: ?Sized + WritableStorageTraits> WritableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        let result = self.storage.set(key, value);
        log::trace!("set({key}, len={}) -> {result:?}", value.len());
        result
    }

    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError> {
        let result = self.storage.erase(key);
        log::trace!("erase({key}) -> {result:?}");
        result
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError> {
        let result = self.storage.erase_prefix(prefix);
        log::trace!("erase_prefix({prefix}) -> {result:?}");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::MemoryStore;
    use std::error::Error;

    #[test]
    fn usage_log_passes_through() -> Result<(), Box<dyn Error>> {
        let inner = Arc::new(MemoryStore::new());
        let store = UsageLogStorageAdapter::new(inner.clone());
        let key: StoreKey = "a/b".try_into()?;
        store.set(&key, &[1, 2, 3])?;
        assert_eq!(inner.get(&key)?, Some(vec![1, 2, 3]));
        assert_eq!(store.get(&key)?, Some(vec![1, 2, 3]));
        assert_eq!(store.size_key(&key)?, Some(3));
        assert_eq!(store.list()?, vec![key.clone()]);
        assert_eq!(store.list_dir(&"a/".try_into()?)?.keys(), &[key.clone()]);
        assert!(store.erase_prefix(&"a/".try_into()?)?);
        assert!(inner.is_empty());
        assert!(Arc::ptr_eq(store.inner(), &inner));
        Ok(())
    }
}
