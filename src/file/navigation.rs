use std::collections::BTreeMap;

use log::warn;

use crate::{
    backend::{AccessMode, Backend, BackendRef},
    config::global_config,
    node::{NodeMetadata, NodePath, DATA_CLASS},
};

use super::{links::parse_external_url, Chain, Cursor, Entry, File, Level, NexusError, OpenData};

/// Follow links from the node at `path` until a node that is not a link.
///
/// `depth` counts the links followed while resolving one path.
pub(super) fn follow_links(
    backend: &dyn Backend,
    mut path: NodePath,
    mut metadata: NodeMetadata,
    depth: &mut usize,
) -> Result<(NodePath, NodeMetadata), NexusError> {
    while let NodeMetadata::Link(link) = &metadata {
        *depth += 1;
        if *depth > global_config().max_link_depth() {
            return Err(NexusError::InvalidState(format!(
                "too many levels of links resolving {path}"
            )));
        }
        let target = link.target.clone();
        (path, metadata) = resolve_absolute(backend, &target, depth)?;
    }
    Ok((path, metadata))
}

/// Resolve the absolute `target` path in `backend`, following links along the way.
pub(super) fn resolve_absolute(
    backend: &dyn Backend,
    target: &NodePath,
    depth: &mut usize,
) -> Result<(NodePath, NodeMetadata), NexusError> {
    let mut path = NodePath::root();
    let mut metadata = backend
        .node(&path)?
        .ok_or_else(|| NexusError::NotFound("/".to_string()))?;
    for segment in target.segments() {
        if !matches!(metadata, NodeMetadata::Group(_)) {
            return Err(NexusError::NotFound(target.to_string()));
        }
        let child = path.child(segment)?;
        let child_metadata = backend
            .node(&child)?
            .ok_or_else(|| NexusError::NotFound(target.to_string()))?;
        (path, metadata) = follow_links(backend, child, child_metadata, depth)?;
    }
    Ok((path, metadata))
}

/// Look up the child `name` of the group at `parent`, following links.
pub(super) fn lookup_child(
    backend: &dyn Backend,
    parent: &NodePath,
    name: &str,
) -> Result<Option<(NodePath, NodeMetadata)>, NexusError> {
    let path = parent.child(name)?;
    match backend.node(&path)? {
        Some(metadata) => follow_links(backend, path, metadata, &mut 0).map(Some),
        None => Ok(None),
    }
}

/// The children of the group at `parent` in name order, with links followed.
pub(super) fn resolved_children(
    backend: &dyn Backend,
    parent: &NodePath,
) -> Result<Vec<(String, NodePath, NodeMetadata)>, NexusError> {
    backend
        .children(parent)?
        .into_iter()
        .map(|(name, metadata)| {
            let path = parent.child(&name)?;
            let (path, metadata) = follow_links(backend, path, metadata, &mut 0)?;
            Ok((name, path, metadata))
        })
        .collect()
}

fn check_class(name: &str, nx_class: &str, requested: &str) -> Result<(), NexusError> {
    if requested.is_empty() || requested == nx_class {
        Ok(())
    } else {
        Err(NexusError::TypeMismatch(format!(
            "group {name} has class {nx_class}, not {requested}"
        )))
    }
}

/// What the last segment of a path may resolve to.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(super) enum PathTarget {
    /// A group or a dataset. A dataset is opened.
    GroupOrData,
    /// A group. A dataset leaves the position at its group.
    Group,
}

impl File {
    /// Create a group named `name` of class `nx_class` in the current group, and open it if `open`.
    ///
    /// # Errors
    /// Returns [`NexusError::NameConflict`] if a sibling named `name` exists, [`NexusError::InvalidState`] if a
    /// dataset is open, or [`NexusError::InvalidName`] if `name` is not a valid node name.
    pub fn make_group(&mut self, name: &str, nx_class: &str, open: bool) -> Result<(), NexusError> {
        self.ensure_no_data()?;
        let top = self.chain.top();
        top.backend.create_group(&top.path.child(name)?, nx_class)?;
        if open {
            self.open_group(name, nx_class)?;
        }
        Ok(())
    }

    /// Open the child group `name` of the current group.
    ///
    /// An empty `nx_class` matches any class. Links are followed, and an external group opens its container.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no child `name`, [`NexusError::TypeMismatch`] if it is a dataset
    /// or its class is not `nx_class`, or [`NexusError::InvalidState`] if a dataset is open.
    pub fn open_group(&mut self, name: &str, nx_class: &str) -> Result<(), NexusError> {
        self.ensure_no_data()?;
        let top = self.chain.top();
        let (path, metadata) = lookup_child(&*top.backend, &top.path, name)?
            .ok_or_else(|| NexusError::NotFound(format!("group {name} in {}", self.chain.path())))?;
        self.navigate(|file, chain| {
            file.descend(chain, name, path, metadata, nx_class)?;
            Ok(None)
        })
    }

    /// Close the current group and return to its parent.
    ///
    /// Closing an external group closes its container.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] at the root group or if a dataset is open.
    pub fn close_group(&mut self) -> Result<(), NexusError> {
        self.ensure_no_data()?;
        if self.chain.levels.is_empty() {
            return Err(NexusError::InvalidState(
                "cannot close the root group".to_string(),
            ));
        }
        let mut chain = self.chain.clone();
        chain.pop();
        self.commit(chain)
    }

    /// Open the dataset `name` of the current group.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no child `name`, [`NexusError::TypeMismatch`] if it is a group,
    /// or [`NexusError::InvalidState`] if a dataset is already open.
    pub fn open_data(&mut self, name: &str) -> Result<(), NexusError> {
        self.ensure_no_data()?;
        let top = self.chain.top();
        match lookup_child(&*top.backend, &top.path, name)? {
            Some((path, NodeMetadata::Data(_))) => {
                self.data = Some(OpenData {
                    name: name.to_string(),
                    path,
                });
                self.attr_cursor = None;
                Ok(())
            }
            Some(_) => Err(NexusError::TypeMismatch(format!(
                "{name} is a group, not a dataset"
            ))),
            None => Err(NexusError::NotFound(format!(
                "dataset {name} in {}",
                self.chain.path()
            ))),
        }
    }

    /// Close the open dataset.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if no dataset is open.
    pub fn close_data(&mut self) -> Result<(), NexusError> {
        self.open_data_ref()?;
        self.data = None;
        self.attr_cursor = None;
        Ok(())
    }

    /// Returns true if a dataset is open.
    #[must_use]
    pub fn is_data_set_open(&self) -> bool {
        !self.closed && self.data.is_some()
    }

    /// Open the group or dataset at `path`.
    ///
    /// `path` is absolute (from the root group) or relative to the current group. Each segment is `name` or
    /// `name:class`, where the class `SDS` selects a dataset. `..` is the parent group. The last segment may name a
    /// dataset, which is opened. An open dataset is closed first.
    ///
    /// The position is unchanged on failure.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if a segment does not resolve.
    pub fn open_path(&mut self, path: &str) -> Result<(), NexusError> {
        self.navigate_path(path, PathTarget::GroupOrData)
    }

    /// Open the group at `path`, or the group holding the dataset at `path`.
    ///
    /// See [`File::open_path`] for the path syntax.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if a segment does not resolve.
    pub fn open_group_path(&mut self, path: &str) -> Result<(), NexusError> {
        self.navigate_path(path, PathTarget::Group)
    }

    /// The absolute path of the current group, and of the open dataset if any.
    ///
    /// The path is the one navigated through, so a group opened by a link or an external link appears under the
    /// name of the link.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed, or [`NexusError::NotFound`] if a group along the
    /// path no longer exists.
    pub fn get_path(&self) -> Result<String, NexusError> {
        self.ensure_open()?;
        let mut path = String::new();
        let mut parent = &self.chain.root;
        let data = self
            .data
            .as_ref()
            .map(|data| (data.name.as_str(), DATA_CLASS));
        let levels = self
            .chain
            .levels
            .iter()
            .map(|level| (level.name.as_str(), level.nx_class.as_str()));
        for (index, (name, nx_class)) in levels.chain(data).enumerate() {
            if parent.backend.node(&parent.path.child(name)?)?.is_none() {
                return Err(NexusError::NotFound(format!("{path}/{name}:{nx_class}")));
            }
            path.push('/');
            path.push_str(name);
            if let Some(level) = self.chain.levels.get(index) {
                parent = level;
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }

    /// Return the next child of the current group, or [`None`] once every child has been returned.
    ///
    /// The children are a snapshot taken by the first call after opening the file, navigating, or
    /// [`File::init_group_dir`].
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn get_next_entry(&mut self) -> Result<Option<Entry>, NexusError> {
        self.ensure_open()?;
        if self.entry_cursor.is_none() {
            self.entry_cursor = Some(Cursor::new(self.entries()?));
        }
        Ok(self.entry_cursor.as_mut().and_then(Cursor::advance))
    }

    /// Restart the enumeration of [`File::get_next_entry`].
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn init_group_dir(&mut self) -> Result<(), NexusError> {
        self.ensure_open()?;
        self.entry_cursor = None;
        Ok(())
    }

    /// Return every child of the current group as a name to class map.
    ///
    /// The enumeration of [`File::get_next_entry`] is not affected.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn get_entries(&self) -> Result<BTreeMap<String, String>, NexusError> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|entry| (entry.name, entry.nx_class))
            .collect())
    }

    fn entries(&self) -> Result<Vec<Entry>, NexusError> {
        self.ensure_open()?;
        let top = self.chain.top();
        Ok(resolved_children(&*top.backend, &top.path)?
            .into_iter()
            .map(|(name, _, metadata)| Entry {
                name,
                nx_class: metadata.nx_class().unwrap_or_default().to_string(),
            })
            .collect())
    }

    /// Push the group `name` at `path` onto `chain`, opening the container of an external group.
    fn descend(
        &self,
        chain: &mut Chain,
        name: &str,
        path: NodePath,
        metadata: NodeMetadata,
        nx_class: &str,
    ) -> Result<(), NexusError> {
        let level = match metadata {
            NodeMetadata::Group(group) => {
                check_class(name, &group.nx_class, nx_class)?;
                Level {
                    name: name.to_string(),
                    nx_class: group.nx_class,
                    backend: chain.top().backend.clone(),
                    path,
                }
            }
            NodeMetadata::External(external) => {
                check_class(name, &external.nx_class, nx_class)?;
                let (backend, path) = self.mount(&chain.top().backend, &external.url)?;
                Level {
                    name: name.to_string(),
                    nx_class: external.nx_class,
                    backend,
                    path,
                }
            }
            NodeMetadata::Data(_) => {
                return Err(NexusError::TypeMismatch(format!(
                    "{name} is a dataset, not a group"
                )))
            }
            NodeMetadata::Link(link) => {
                return Err(NexusError::InvalidState(format!(
                    "unresolved link {name} to {}",
                    link.target
                )))
            }
        };
        chain.push(level);
        Ok(())
    }

    /// Open the container of an external link and resolve the group it points to.
    fn mount(&self, current: &BackendRef, url: &str) -> Result<(BackendRef, NodePath), NexusError> {
        let (target, path) = parse_external_url(url)?;
        let access = if current.access().is_writable() {
            AccessMode::ReadWrite
        } else {
            AccessMode::Read
        };
        let backend = self.connector.connect(&target, access)?;
        let resolved = match resolve_absolute(&*backend, &path, &mut 0) {
            Ok((path, NodeMetadata::Group(_))) => Ok(path),
            Ok((path, _)) => Err(NexusError::TypeMismatch(format!(
                "{url}: {path} is not a group"
            ))),
            Err(err) => Err(err),
        };
        match resolved {
            Ok(path) => Ok((backend, path)),
            Err(err) => {
                if let Err(close_err) = backend.close() {
                    warn!("failed to close {target}: {close_err}");
                }
                Err(err)
            }
        }
    }

    fn navigate_path(&mut self, path: &str, path_target: PathTarget) -> Result<(), NexusError> {
        self.ensure_open()?;
        self.navigate(|file, chain| file.resolve_path(chain, path, path_target))
    }

    /// Move `chain` along `path`, returning the dataset at the end of the path if it is to be opened.
    pub(super) fn resolve_path(
        &self,
        chain: &mut Chain,
        path: &str,
        path_target: PathTarget,
    ) -> Result<Option<OpenData>, NexusError> {
        if path.starts_with('/') {
            chain.truncate_to_root();
        }
        let segments: Vec<&str> = path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        let mut data = None;
        for (index, &segment) in segments.iter().enumerate() {
            let terminal = index + 1 == segments.len();
            if segment == ".." {
                if chain.pop() {
                    continue;
                }
                return Err(NexusError::NotFound(format!("parent of the root group in {path}")));
            }
            let (name, nx_class) = segment.split_once(':').unwrap_or((segment, ""));
            let top = chain.top();
            let Some((child_path, metadata)) = lookup_child(&*top.backend, &top.path, name)?
                .filter(|(_, metadata)| nx_class.is_empty() || metadata.nx_class() == Some(nx_class))
            else {
                return Err(NexusError::NotFound(format!("{segment} in {path}")));
            };
            match metadata {
                NodeMetadata::Data(_) if terminal => {
                    if path_target == PathTarget::GroupOrData {
                        data = Some(OpenData {
                            name: name.to_string(),
                            path: child_path,
                        });
                    }
                }
                NodeMetadata::Data(_) => {
                    return Err(NexusError::NotFound(format!("group {segment} in {path}")));
                }
                metadata => self.descend(chain, name, child_path, metadata, "")?,
            }
        }
        Ok(data)
    }

    /// Run `navigate` on a copy of the chain and make the result the position if it succeeds.
    ///
    /// Containers opened by a failed navigation are closed.
    fn navigate<F>(&mut self, navigate: F) -> Result<(), NexusError>
    where
        F: FnOnce(&Self, &mut Chain) -> Result<Option<OpenData>, NexusError>,
    {
        let mut chain = self.chain.clone();
        match navigate(self, &mut chain) {
            Ok(data) => {
                self.data = data;
                self.commit(chain)
            }
            Err(err) => {
                if let Err(close_err) = chain.release_except(&self.chain.frames) {
                    warn!("failed to close a container after failed navigation: {close_err}");
                }
                Err(err)
            }
        }
    }

    /// Make `chain` the position, closing the containers it no longer needs.
    fn commit(&mut self, chain: Chain) -> Result<(), NexusError> {
        let previous = std::mem::replace(&mut self.chain, chain);
        self.reset_cursors();
        previous.release_except(&self.chain.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryConnector;
    use std::{error::Error, sync::Arc};

    fn sample() -> Result<File, Box<dyn Error>> {
        let mut file = File::open_with(Arc::new(MemoryConnector::new()), "a", AccessMode::Create)?;
        file.make_group("entry", "NXentry", true)?;
        file.make_group("data", "NXdata", true)?;
        file.write_data("x", &[1.0f64, 2.0])?;
        file.close_group()?;
        file.close_group()?;
        Ok(file)
    }

    #[test]
    fn navigation_groups() -> Result<(), Box<dyn Error>> {
        let mut file = sample()?;
        assert!(matches!(
            file.open_group("entry", "NXdata"),
            Err(NexusError::TypeMismatch(_))
        ));
        assert!(matches!(
            file.open_group("missing", ""),
            Err(NexusError::NotFound(_))
        ));
        file.open_group("entry", "")?;
        assert_eq!(file.get_path()?, "/entry");
        assert!(matches!(
            file.make_group("data", "NXdata", false),
            Err(NexusError::NameConflict(_))
        ));
        file.close_group()?;
        assert!(matches!(
            file.close_group(),
            Err(NexusError::InvalidState(_))
        ));
        Ok(())
    }

    #[test]
    fn navigation_paths() -> Result<(), Box<dyn Error>> {
        let mut file = sample()?;
        file.open_path("/entry/data/x")?;
        assert!(file.is_data_set_open());
        assert_eq!(file.get_path()?, "/entry/data/x");

        file.open_path("..")?;
        assert!(!file.is_data_set_open());
        assert_eq!(file.get_path()?, "/entry");

        file.open_group_path("/entry:NXentry/data/x")?;
        assert!(!file.is_data_set_open());
        assert_eq!(file.get_path()?, "/entry/data");

        file.open_path("x:SDS")?;
        assert!(file.is_data_set_open());

        assert!(matches!(
            file.open_path("/entry:NXdata"),
            Err(NexusError::NotFound(_))
        ));
        assert!(matches!(
            file.open_path("/entry/data/x/y"),
            Err(NexusError::NotFound(_))
        ));
        assert!(matches!(file.open_path("/.."), Err(NexusError::NotFound(_))));
        // failed navigation leaves the position unchanged
        assert_eq!(file.get_path()?, "/entry/data/x");

        file.open_path("/")?;
        assert_eq!(file.get_path()?, "/");
        Ok(())
    }

    #[test]
    fn navigation_entries() -> Result<(), Box<dyn Error>> {
        let mut file = sample()?;
        file.open_group("entry", "NXentry")?;
        file.make_group("a", "NXsample", false)?;
        let entries = file.get_entries()?;
        assert_eq!(entries.get("a").map(String::as_str), Some("NXsample"));
        assert_eq!(entries.get("data").map(String::as_str), Some("NXdata"));

        let first = file.get_next_entry()?;
        assert_eq!(first.as_ref().map(|e| e.name.as_str()), Some("a"));
        file.open_group("data", "NXdata")?;
        assert_eq!(
            file.get_next_entry()?,
            Some(Entry {
                name: "x".to_string(),
                nx_class: "SDS".to_string()
            })
        );
        assert_eq!(file.get_next_entry()?, None);
        assert_eq!(file.get_next_entry()?, None);
        Ok(())
    }
}
