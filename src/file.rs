//! The stateful [`File`] handle.
//!
//! A [`File`] owns an open container and a position in its hierarchy: the chain of open groups and, optionally, one
//! open dataset. Navigation calls move the position. Data and attribute calls act on the entity at the position.
//!
//! ```rust
//! # use nexusfile::{backend::{AccessMode, MemoryConnector}, File, NumType, Position};
//! # use std::sync::Arc;
//! let mut file = File::open_with(Arc::new(MemoryConnector::new()), "scan", AccessMode::Create)?;
//! file.make_group("entry", "NXentry", true)?;
//! file.write_data("counts", &[1u32, 5, 2])?;
//! file.put_attr_str("title", "calibration")?;
//!
//! file.open_path("/entry/counts")?;
//! assert_eq!(file.get_info()?.data_type, NumType::UInt32);
//! assert_eq!(file.get_data_vec::<u64>()?, vec![1, 5, 2]);
//! assert_eq!(
//!     file.position(),
//!     Position::AtGroupWithDataOpen { path: "/entry".to_string(), data: "counts".to_string() }
//! );
//! file.close()?;
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod attributes;
mod data;
mod file_errors;
mod info;
mod links;
mod navigation;
mod type_map;

pub use file_errors::NexusError;
pub use info::{AttrInfo, Entry, Info, Position};
pub use links::{LinkId, LinkKind};
pub use type_map::TypeMap;

use std::{path::Path, sync::Arc};

use log::warn;

use crate::{
    backend::{AccessMode, BackendRef, Connector, FilesystemConnector},
    node::NodePath,
};

/// The extent that marks the unlimited dimension of an extendible dataset.
pub const UNLIMITED: i64 = -1;

/// A container opened by the file, and whether closing the file closes it.
#[derive(Clone, Debug)]
struct Frame {
    backend: BackendRef,
    owns: bool,
}

/// An open group.
#[derive(Clone, Debug)]
struct Level {
    /// The name the group was opened by, which differs from the last segment of `path` for a linked group.
    name: String,
    nx_class: String,
    backend: BackendRef,
    /// The path of the group in `backend`, with links resolved.
    path: NodePath,
}

/// The open groups, from the root group to the current group, and the containers they live in.
#[derive(Clone, Debug)]
struct Chain {
    frames: Vec<Frame>,
    root: Level,
    levels: Vec<Level>,
}

impl Chain {
    fn new(backend: BackendRef, owns: bool) -> Self {
        Self {
            frames: vec![Frame {
                backend: backend.clone(),
                owns,
            }],
            root: Level {
                name: String::new(),
                nx_class: String::new(),
                backend,
                path: NodePath::root(),
            },
            levels: Vec::new(),
        }
    }

    fn top(&self) -> &Level {
        self.levels.last().unwrap_or(&self.root)
    }

    fn parent_of_top(&self) -> Option<&Level> {
        match self.levels.len() {
            0 => None,
            1 => Some(&self.root),
            len => self.levels.get(len - 2),
        }
    }

    fn push(&mut self, level: Level) {
        if !Arc::ptr_eq(&level.backend, &self.top().backend) {
            self.frames.push(Frame {
                backend: level.backend.clone(),
                owns: true,
            });
        }
        self.levels.push(level);
    }

    /// Pop the current group. Returns false at the root group.
    fn pop(&mut self) -> bool {
        let Some(level) = self.levels.pop() else {
            return false;
        };
        if !Arc::ptr_eq(&level.backend, &self.top().backend) {
            self.frames.pop();
        }
        true
    }

    fn truncate_to_root(&mut self) {
        while self.pop() {}
    }

    /// The logical path of the current group.
    fn path(&self) -> String {
        if self.levels.is_empty() {
            "/".to_string()
        } else {
            self.levels
                .iter()
                .map(|level| format!("/{}", level.name))
                .collect()
        }
    }

    /// Close the owned containers of this chain that are not in `keep`.
    fn release_except(&self, keep: &[Frame]) -> Result<(), NexusError> {
        let mut result = Ok(());
        for frame in self.frames.iter().rev() {
            let kept = keep
                .iter()
                .any(|kept| Arc::ptr_eq(&kept.backend, &frame.backend));
            if frame.owns && !kept {
                if let Err(err) = frame.backend.close() {
                    result = result.and(Err(err));
                }
            }
        }
        result
    }
}

/// The dataset open at the current group.
#[derive(Clone, Debug)]
struct OpenData {
    name: String,
    /// The path of the dataset in the backend of the current group, with links resolved.
    path: NodePath,
}

/// A restartable cursor over a snapshot.
#[derive(Debug)]
struct Cursor<T> {
    items: Vec<T>,
    next: usize,
}

impl<T: Clone> Cursor<T> {
    fn new(items: Vec<T>) -> Self {
        Self { items, next: 0 }
    }

    fn advance(&mut self) -> Option<T> {
        let item = self.items.get(self.next).cloned();
        if item.is_some() {
            self.next += 1;
        }
        item
    }
}

/// A handle to an open hierarchical container.
///
/// A file is not safe for concurrent use. Independent files may open the same container.
/// Dropping a file closes it, logging any failure.
#[derive(Debug)]
pub struct File {
    chain: Chain,
    data: Option<OpenData>,
    entry_cursor: Option<Cursor<Entry>>,
    attr_cursor: Option<Cursor<AttrInfo>>,
    connector: Arc<dyn Connector>,
    closed: bool,
}

impl File {
    /// Open the container in the directory `path` with `access`.
    ///
    /// # Errors
    /// Returns [`NexusError::OpenError`] if the container cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, access: AccessMode) -> Result<Self, NexusError> {
        let target = path.as_ref().to_string_lossy().into_owned();
        Self::open_with(Arc::new(FilesystemConnector), &target, access)
    }

    /// Open the container `target` of `connector` with `access`.
    ///
    /// The file keeps `connector` to open the containers of external links.
    ///
    /// # Errors
    /// Returns [`NexusError::OpenError`] if the container cannot be opened.
    pub fn open_with(
        connector: Arc<dyn Connector>,
        target: &str,
        access: AccessMode,
    ) -> Result<Self, NexusError> {
        let backend = connector.connect(target, access)?;
        Ok(Self::from_backend(backend, true).with_connector(connector))
    }

    /// Create a file positioned at the root group of an open `backend`.
    ///
    /// If `close_on_drop` is false, closing the file detaches from `backend` without closing it.
    #[must_use]
    pub fn from_backend(backend: BackendRef, close_on_drop: bool) -> Self {
        Self {
            chain: Chain::new(backend, close_on_drop),
            data: None,
            entry_cursor: None,
            attr_cursor: None,
            connector: Arc::new(FilesystemConnector),
            closed: false,
        }
    }

    /// Use `connector` to open the containers of external links.
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Close the file. Closing a closed file does nothing.
    ///
    /// Every container opened by the file is closed, except a backend passed to [`File::from_backend`] without
    /// `close_on_drop`.
    ///
    /// # Errors
    /// Returns the first error from closing a container. The file is closed regardless.
    pub fn close(&mut self) -> Result<(), NexusError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.data = None;
        self.reset_cursors();
        let result = self.chain.release_except(&[]);
        self.chain.truncate_to_root();
        result
    }

    /// Flush every open container.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed, or the error of a failed flush.
    pub fn flush(&self) -> Result<(), NexusError> {
        self.ensure_open()?;
        for frame in &self.chain.frames {
            frame.backend.flush()?;
        }
        Ok(())
    }

    /// Returns true until the file is closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// The current position.
    #[must_use]
    pub fn position(&self) -> Position {
        if self.closed {
            return Position::Closed;
        }
        let path = self.chain.path();
        match &self.data {
            Some(data) => Position::AtGroupWithDataOpen {
                path,
                data: data.name.clone(),
            },
            None => Position::AtGroup { path },
        }
    }

    /// The identifier of the container holding the current group.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn inquire_file(&self) -> Result<String, NexusError> {
        self.ensure_open()?;
        Ok(self.chain.top().backend.identifier().to_string())
    }

    fn ensure_open(&self) -> Result<(), NexusError> {
        if self.closed {
            Err(NexusError::InvalidState("the file is closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn ensure_no_data(&self) -> Result<(), NexusError> {
        self.ensure_open()?;
        match &self.data {
            Some(data) => Err(NexusError::InvalidState(format!(
                "dataset {} is open",
                data.name
            ))),
            None => Ok(()),
        }
    }

    fn open_data_ref(&self) -> Result<&OpenData, NexusError> {
        self.ensure_open()?;
        self.data
            .as_ref()
            .ok_or_else(|| NexusError::InvalidState("no dataset is open".to_string()))
    }

    /// The backend and path of the open dataset, or of the current group if no dataset is open.
    fn current_entity(&self) -> Result<(&BackendRef, &NodePath), NexusError> {
        self.ensure_open()?;
        let top = self.chain.top();
        Ok((
            &top.backend,
            self.data.as_ref().map_or(&top.path, |data| &data.path),
        ))
    }

    fn reset_cursors(&mut self) {
        self.entry_cursor = None;
        self.attr_cursor = None;
    }
}

impl Drop for File {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("failed to close file: {err}");
        }
    }
}
