//! Hierarchy nodes.
//!
//! A node is a group, a dataset, or a link to another node. Every node is identified by a [`NodePath`] and described
//! by a [`NodeMetadata`] document.

mod node_metadata;
mod node_name;
mod node_path;

pub use node_metadata::{
    AttributeMetadata, ChunkEncoding, DataMetadata, ExternalMetadata, GroupMetadata, LinkMetadata, NodeMetadata,
};
pub use node_name::{NodeName, NodeNameError};
pub use node_path::{NodePath, NodePathError};

/// The class tag reported for datasets.
pub const DATA_CLASS: &str = "SDS";
