use derive_more::Display;

use crate::{array_subset::checked_num_elements, data_type::NumType, node::AttributeMetadata};

/// The storage type and current shape of a dataset.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
#[display("{data_type} {dims:?}")]
pub struct Info {
    /// The storage type.
    pub data_type: NumType,
    /// The current extent of each dimension.
    pub dims: Vec<u64>,
}

impl Info {
    /// The number of elements, or [`None`] if it overflows [`u64`].
    #[must_use]
    pub fn num_elements(&self) -> Option<u64> {
        checked_num_elements(&self.dims)
    }
}

/// Describes one attribute. Returned by attribute enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrInfo {
    /// The attribute name.
    pub name: String,
    /// The storage type.
    pub data_type: NumType,
    /// The number of elements.
    pub length: usize,
    /// The shape of the value.
    pub shape: Vec<u64>,
}

impl From<&AttributeMetadata> for AttrInfo {
    fn from(attribute: &AttributeMetadata) -> Self {
        Self {
            name: attribute.name.clone(),
            data_type: attribute.data_type,
            length: attribute.len(),
            shape: attribute.shape.clone(),
        }
    }
}

/// A child of a group.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("{name}:{nx_class}")]
pub struct Entry {
    /// The child name.
    pub name: String,
    /// The class of a group, `SDS` for a dataset.
    pub nx_class: String,
}

/// The position of a [`File`](crate::File) in the hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Position {
    /// The file is closed.
    Closed,
    /// At a group.
    AtGroup {
        /// The path of the group.
        path: String,
    },
    /// At a group with one of its datasets open.
    AtGroupWithDataOpen {
        /// The path of the group.
        path: String,
        /// The name of the open dataset.
        data: String,
    },
}
