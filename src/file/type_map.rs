use std::collections::BTreeMap;

use derive_more::Deref;
use log::{debug, warn};

use crate::{
    backend::Backend,
    node::{NodeMetadata, NodePath, DATA_CLASS},
};

use super::{
    navigation::{resolved_children, PathTarget},
    File, NexusError,
};

/// An ordered multimap from a key to the paths of the entities with that key.
///
/// Built by a walk of the hierarchy, see [`File::walk_file_for_type_map`]. It is not updated by later changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deref)]
pub struct TypeMap(BTreeMap<String, Vec<String>>);

impl TypeMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path` under `key`.
    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(path.into());
    }

    /// The paths under `key`, in walk order.
    #[must_use]
    pub fn paths(&self, key: &str) -> &[String] {
        self.0.get(key).map_or(&[], Vec::as_slice)
    }

    /// The number of paths in the map.
    #[must_use]
    pub fn num_paths(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Unwrap the inner map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

/// What a walk indexes.
#[derive(Copy, Clone, PartialEq, Eq)]
enum MapKey {
    /// Datasets by storage type name.
    Type,
    /// Groups by class and datasets under `SDS`.
    Class,
}

fn join(parent: &str, name: &str) -> String {
    format!("{}/{name}", parent.trim_end_matches('/'))
}

/// Walk the group at `path`, known as `logical`, in pre-order.
///
/// External links are not followed. A link back to a group being walked is skipped.
fn walk(
    backend: &dyn Backend,
    logical: &str,
    path: &NodePath,
    ancestors: &mut Vec<NodePath>,
    key: MapKey,
    map: &mut TypeMap,
) -> Result<(), NexusError> {
    ancestors.push(path.clone());
    for (name, child_path, metadata) in resolved_children(backend, path)? {
        let child_logical = join(logical, &name);
        match metadata {
            NodeMetadata::Data(data) => match key {
                MapKey::Type => map.insert(data.data_type.name(), child_logical),
                MapKey::Class => map.insert(DATA_CLASS, child_logical),
            },
            NodeMetadata::Group(group) => {
                if ancestors.contains(&child_path) {
                    debug!("not walking {child_logical}, a link to {child_path}");
                    continue;
                }
                if key == MapKey::Class {
                    map.insert(group.nx_class, child_logical.clone());
                }
                walk(backend, &child_logical, &child_path, ancestors, key, map)?;
            }
            NodeMetadata::External(_) | NodeMetadata::Link(_) => {}
        }
    }
    ancestors.pop();
    Ok(())
}

impl File {
    /// Add every dataset below the group at `path` to `map`, keyed by the name of its storage type.
    ///
    /// `path` uses the syntax of [`File::open_path`]. A non-empty `nx_class` must match the class of the group at
    /// `path`. The position is unchanged.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if `path` does not resolve to a group, or [`NexusError::TypeMismatch`] if
    /// the group is not of class `nx_class`.
    pub fn walk_file_for_type_map(
        &self,
        path: &str,
        nx_class: &str,
        map: &mut TypeMap,
    ) -> Result<(), NexusError> {
        self.walk_from(path, nx_class, MapKey::Type, map)
    }

    /// Map every storage type name to the paths of the datasets of that type.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn get_type_map(&self) -> Result<TypeMap, NexusError> {
        let mut map = TypeMap::new();
        self.walk_from("/", "", MapKey::Type, &mut map)?;
        Ok(map)
    }

    /// Map every group class to the paths of the groups of that class, and `SDS` to the paths of the datasets.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn get_class_map(&self) -> Result<TypeMap, NexusError> {
        let mut map = TypeMap::new();
        self.walk_from("/", "", MapKey::Class, &mut map)?;
        Ok(map)
    }

    fn walk_from(&self, path: &str, nx_class: &str, key: MapKey, map: &mut TypeMap) -> Result<(), NexusError> {
        self.ensure_open()?;
        let mut chain = self.chain.clone();
        let result = self
            .resolve_path(&mut chain, path, PathTarget::GroupOrData)
            .and_then(|data| {
                let top = chain.top();
                if data.is_some() {
                    return Err(NexusError::NotFound(format!("group {path}")));
                }
                if !nx_class.is_empty() && !chain.levels.is_empty() && top.nx_class != nx_class {
                    return Err(NexusError::TypeMismatch(format!(
                        "group {path} has class {}, not {nx_class}",
                        top.nx_class
                    )));
                }
                walk(&*top.backend, &chain.path(), &top.path, &mut Vec::new(), key, map)
            });
        if let Err(err) = chain.release_except(&self.chain.frames) {
            warn!("failed to close a container after walking {path}: {err}");
        }
        result
    }
}
