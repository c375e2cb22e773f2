//! The storage backend contract.
//!
//! A [`File`](crate::File) drives a [`Backend`]: a hierarchical container of groups, datasets and links addressed by
//! absolute [`NodePath`]s. Backends do not resolve links, they store them. Navigation state and link resolution
//! belong to the [`File`](crate::File).
//!
//! A [`Connector`] opens a container from a target string and an [`AccessMode`].
//! The crate provides [`StoreBackend`], which lays a container out on any [store](crate::storage::store), and two
//! connectors for it:
//!  - [`FilesystemConnector`] opens a directory, and
//!  - [`MemoryConnector`] opens a named in-memory container.

mod chunk_codec;
mod connector;
mod store_backend;

pub use connector::{Connector, FilesystemConnector, MemoryConnector};
pub use store_backend::StoreBackend;

use std::sync::Arc;

use derive_more::Display;

use crate::{
    array_subset::ArraySubset,
    node::{AttributeMetadata, DataMetadata, NodeMetadata, NodePath},
    NexusError,
};

/// How a container is opened.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum AccessMode {
    /// Open an existing container for reading.
    #[display("read")]
    Read,
    /// Open an existing container for reading and writing.
    #[display("read-write")]
    ReadWrite,
    /// Create a new container. Fails if one already exists.
    #[display("create")]
    Create,
    /// Create a new container, erasing any existing one.
    #[display("create-overwrite")]
    CreateOverwrite,
}

impl AccessMode {
    /// Returns true if the mode permits writes.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// A shared backend.
pub type BackendRef = Arc<dyn Backend>;

/// The operations a [`File`](crate::File) needs from a hierarchical container.
///
/// Every method fails with [`NexusError::InvalidState`] after [`Backend::close`].
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// The target the container was opened from.
    fn identifier(&self) -> &str;

    /// The access mode the container was opened with.
    fn access(&self) -> AccessMode;

    /// Return the metadata of the node at `path`, or [`None`] if there is no such node.
    ///
    /// # Errors
    /// Returns a [`NexusError`] on a storage failure or corrupt metadata.
    fn node(&self, path: &NodePath) -> Result<Option<NodeMetadata>, NexusError>;

    /// Return the names and metadata of the children of the group at `path`, ordered by name.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no group at `path`.
    fn children(&self, path: &NodePath) -> Result<Vec<(String, NodeMetadata)>, NexusError>;

    /// Create a group of class `nx_class` at `path`.
    ///
    /// # Errors
    /// Returns [`NexusError::NameConflict`] if a node exists at `path`, or [`NexusError::NotFound`] if the parent is
    /// not a group.
    fn create_group(&self, path: &NodePath, nx_class: &str) -> Result<(), NexusError>;

    /// Create a dataset at `path` and return the metadata actually stored.
    ///
    /// The backend decides the chunk encoding from the compression hint. Hints it does not support are ignored.
    ///
    /// # Errors
    /// Returns [`NexusError::NameConflict`] if a node exists at `path`, or [`NexusError::NotFound`] if the parent is
    /// not a group.
    fn create_data(&self, path: &NodePath, metadata: DataMetadata) -> Result<DataMetadata, NexusError>;

    /// Create a link at `path` to the node at `target`.
    ///
    /// # Errors
    /// Returns [`NexusError::NameConflict`] if a node exists at `path`, or [`NexusError::NotFound`] if the parent is
    /// not a group.
    fn create_link(&self, path: &NodePath, target: &NodePath) -> Result<(), NexusError>;

    /// Create an external link at `path` to a group of class `nx_class` located by `url`.
    ///
    /// # Errors
    /// Returns [`NexusError::NameConflict`] if a node exists at `path`, or [`NexusError::NotFound`] if the parent is
    /// not a group.
    fn create_external(&self, path: &NodePath, nx_class: &str, url: &str) -> Result<(), NexusError>;

    /// Store `attribute` on the group or dataset at `path`, replacing an attribute of the same name.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no group or dataset at `path`.
    fn put_attribute(&self, path: &NodePath, attribute: AttributeMetadata) -> Result<(), NexusError>;

    /// Return the attributes of the group or dataset at `path`, in creation order.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no group or dataset at `path`.
    fn attributes(&self, path: &NodePath) -> Result<Vec<AttributeMetadata>, NexusError> {
        self.node(path)?
            .as_ref()
            .and_then(NodeMetadata::attributes)
            .map(<[AttributeMetadata]>::to_vec)
            .ok_or_else(|| NexusError::NotFound(path.to_string()))
    }

    /// Read the elements of `subset` of the dataset at `path` as little-endian bytes in C order.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no dataset at `path`, or [`NexusError::RangeError`] if `subset`
    /// is outside of its current shape.
    fn read_slab(&self, path: &NodePath, subset: &ArraySubset) -> Result<Vec<u8>, NexusError>;

    /// Write little-endian `bytes` to `subset` of the dataset at `path`.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no dataset at `path`, [`NexusError::RangeError`] if `subset` is
    /// outside of its current shape, or [`NexusError::RankMismatch`] if `bytes` does not hold the subset.
    fn write_slab(&self, path: &NodePath, subset: &ArraySubset, bytes: &[u8]) -> Result<(), NexusError>;

    /// Change the shape of the dataset at `path`.
    ///
    /// Elements outside of the old shape read as zero. Elements outside of the new shape are discarded.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no dataset at `path`, or [`NexusError::RankMismatch`] if the
    /// dimensionality changes.
    fn set_shape(&self, path: &NodePath, shape: &[u64]) -> Result<(), NexusError>;

    /// Flush pending writes.
    ///
    /// # Errors
    /// Returns a [`NexusError`] if the flush fails.
    fn flush(&self) -> Result<(), NexusError>;

    /// Close the container. Closing a closed container does nothing.
    ///
    /// # Errors
    /// Returns a [`NexusError`] if pending writes cannot be flushed.
    fn close(&self) -> Result<(), NexusError>;

    /// Returns true if the container has been closed.
    fn is_closed(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_mode() {
        assert!(!AccessMode::Read.is_writable());
        assert!(AccessMode::ReadWrite.is_writable());
        assert!(AccessMode::CreateOverwrite.is_writable());
        assert_eq!(AccessMode::CreateOverwrite.to_string(), "create-overwrite");
    }
}
