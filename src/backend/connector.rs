use std::{collections::HashMap, path::Path, sync::Arc};

use parking_lot::Mutex;

use crate::{
    storage::store::{FilesystemStore, MemoryStore},
    NexusError,
};

use super::{AccessMode, BackendRef, StoreBackend};

/// Opens containers from target strings.
///
/// A [`File`](crate::File) keeps its connector to open the containers of external links.
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Open the container identified by `target` with `access`.
    ///
    /// # Errors
    /// Returns [`NexusError::OpenError`] if the container cannot be opened.
    fn connect(&self, target: &str, access: AccessMode) -> Result<BackendRef, NexusError>;
}

/// Opens containers stored as directory trees with a [`FilesystemStore`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemConnector;

impl Connector for FilesystemConnector {
    fn connect(&self, target: &str, access: AccessMode) -> Result<BackendRef, NexusError> {
        if matches!(access, AccessMode::Read | AccessMode::ReadWrite) && !Path::new(target).is_dir() {
            return Err(NexusError::OpenError(format!("{target}: no container")));
        }
        let store = FilesystemStore::new(target)
            .map_err(|err| NexusError::OpenError(format!("{target}: {err}")))?
            .sorted();
        Ok(Arc::new(StoreBackend::new(Arc::new(store), target, access)?))
    }
}

/// Opens named in-memory containers.
///
/// The containers live as long as the connector (or any clone of it), so several files and external links can
/// reach the same container by name.
#[derive(Debug, Default, Clone)]
pub struct MemoryConnector {
    stores: Arc<Mutex<HashMap<String, Arc<MemoryStore>>>>,
}

impl MemoryConnector {
    /// Create a connector with no containers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of the containers, sorted.
    #[must_use]
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.stores.lock().keys().cloned().collect();
        targets.sort();
        targets
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, target: &str, access: AccessMode) -> Result<BackendRef, NexusError> {
        let store = {
            let mut stores = self.stores.lock();
            match access {
                AccessMode::Read | AccessMode::ReadWrite => stores
                    .get(target)
                    .cloned()
                    .ok_or_else(|| NexusError::OpenError(format!("{target}: no container")))?,
                AccessMode::Create | AccessMode::CreateOverwrite => stores
                    .entry(target.to_string())
                    .or_insert_with(|| Arc::new(MemoryStore::new()))
                    .clone(),
            }
        };
        Ok(Arc::new(StoreBackend::new(store, target, access)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodePath;
    use std::error::Error;

    #[test]
    fn memory_connector() -> Result<(), Box<dyn Error>> {
        let connector = MemoryConnector::new();
        assert!(matches!(
            connector.connect("a", AccessMode::Read),
            Err(NexusError::OpenError(_))
        ));
        let backend = connector.connect("a", AccessMode::Create)?;
        backend.create_group(&NodePath::new("/entry")?, "NXentry")?;
        backend.close()?;

        let shared = connector.clone();
        let backend = shared.connect("a", AccessMode::Read)?;
        assert_eq!(backend.children(&NodePath::root())?.len(), 1);
        assert_eq!(connector.targets(), vec!["a".to_string()]);
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem_connector() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::TempDir::new()?;
        let target = dir.path().join("container");
        let target = target.to_string_lossy();
        assert!(FilesystemConnector.connect(&target, AccessMode::ReadWrite).is_err());
        let backend = FilesystemConnector.connect(&target, AccessMode::Create)?;
        backend.create_group(&NodePath::new("/entry")?, "NXentry")?;
        let backend = FilesystemConnector.connect(&target, AccessMode::ReadWrite)?;
        assert_eq!(backend.identifier(), target);
        assert_eq!(backend.children(&NodePath::root())?.len(), 1);
        Ok(())
    }
}
