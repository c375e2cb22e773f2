use serde::{Deserialize, Serialize};

use crate::{
    array_subset::checked_num_elements,
    data_type::{ArrayValues, Compression, DataTypeError, NumType},
};

use super::NodePath;

/// The metadata document of a node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "node_type", rename_all = "lowercase")]
pub enum NodeMetadata {
    /// A group.
    Group(GroupMetadata),
    /// A dataset.
    Data(DataMetadata),
    /// A link to another node in the same container.
    Link(LinkMetadata),
    /// A link to a group in another container.
    External(ExternalMetadata),
}

/// Group metadata.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct GroupMetadata {
    /// The class tag of the group, e.g. `NXentry`.
    pub nx_class: String,
    /// Attributes, in creation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeMetadata>,
}

/// Dataset metadata.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DataMetadata {
    /// The storage type.
    pub data_type: NumType,
    /// The current extent of each dimension.
    pub shape: Vec<u64>,
    /// The dimension which may grow, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlimited_dimension: Option<usize>,
    /// The shape of each chunk of the regular chunk grid.
    pub chunk_shape: Vec<u64>,
    /// The compression hint.
    #[serde(default)]
    pub compression: Compression,
    /// How chunks are actually encoded, decided by the backend when the dataset is created.
    #[serde(default, skip_serializing_if = "ChunkEncoding::is_raw")]
    pub chunk_encoding: ChunkEncoding,
    /// Attributes, in creation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeMetadata>,
}

/// The encoding of stored chunks.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum ChunkEncoding {
    /// Little-endian elements.
    #[default]
    Raw,
    /// Little-endian elements in a gzip container.
    Gzip {
        /// The compression level (0-9).
        level: u32,
    },
}

impl ChunkEncoding {
    /// Returns true for [`ChunkEncoding::Raw`].
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        matches!(self, Self::Raw)
    }
}

/// Link metadata.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LinkMetadata {
    /// The path of the linked node.
    pub target: NodePath,
}

/// External link metadata.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ExternalMetadata {
    /// The class tag of the linked group.
    pub nx_class: String,
    /// The location of the linked group, `nxfile://<container>#<path>`.
    pub url: String,
}

/// The metadata of one attribute.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AttributeMetadata {
    /// The attribute name.
    pub name: String,
    /// The storage type.
    pub data_type: NumType,
    /// The shape of the value.
    pub shape: Vec<u64>,
    /// The value, see [`ArrayValues::to_json`].
    pub value: serde_json::Value,
}

impl GroupMetadata {
    /// Create group metadata with class `nx_class` and no attributes.
    #[must_use]
    pub fn new(nx_class: &str) -> Self {
        Self {
            nx_class: nx_class.to_string(),
            attributes: Vec::new(),
        }
    }
}

impl DataMetadata {
    /// Create dataset metadata without attributes and with raw chunks.
    #[must_use]
    pub fn new(
        data_type: NumType,
        shape: Vec<u64>,
        unlimited_dimension: Option<usize>,
        chunk_shape: Vec<u64>,
        compression: Compression,
    ) -> Self {
        Self {
            data_type,
            shape,
            unlimited_dimension,
            chunk_shape,
            compression,
            chunk_encoding: ChunkEncoding::Raw,
            attributes: Vec::new(),
        }
    }

    /// Returns true if the dataset has an unlimited dimension.
    #[must_use]
    pub const fn is_extendible(&self) -> bool {
        self.unlimited_dimension.is_some()
    }

    /// The number of elements in the dataset, saturating at [`u64::MAX`].
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        checked_num_elements(&self.shape).unwrap_or(u64::MAX)
    }

    /// The shape of the chunk grid, the number of chunks along each dimension.
    #[must_use]
    pub fn chunk_grid_shape(&self) -> Vec<u64> {
        std::iter::zip(&self.shape, &self.chunk_shape)
            .map(|(&extent, &chunk)| extent.div_ceil(chunk.max(1)))
            .collect()
    }
}

impl AttributeMetadata {
    /// Create attribute metadata holding `values` with `shape`.
    #[must_use]
    pub fn new(name: &str, values: &ArrayValues, shape: Vec<u64>) -> Self {
        Self {
            name: name.to_string(),
            data_type: values.num_type(),
            shape,
            value: values.to_json(),
        }
    }

    /// The number of elements in the attribute.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from(self.shape.iter().product::<u64>()).unwrap_or(usize::MAX)
    }

    /// Returns true if the attribute holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the value.
    ///
    /// # Errors
    /// Returns a [`DataTypeError`] if the stored value is not valid for the stored type.
    pub fn values(&self) -> Result<ArrayValues, DataTypeError> {
        ArrayValues::from_json(self.data_type, &self.value)
    }
}

impl NodeMetadata {
    /// The class tag of the node. Datasets have the class `SDS` and links have none.
    #[must_use]
    pub fn nx_class(&self) -> Option<&str> {
        match self {
            Self::Group(group) => Some(&group.nx_class),
            Self::Data(_) => Some(super::DATA_CLASS),
            Self::External(external) => Some(&external.nx_class),
            Self::Link(_) => None,
        }
    }

    /// The attributes of a group or dataset.
    #[must_use]
    pub fn attributes(&self) -> Option<&[AttributeMetadata]> {
        match self {
            Self::Group(group) => Some(&group.attributes),
            Self::Data(data) => Some(&data.attributes),
            Self::Link(_) | Self::External(_) => None,
        }
    }

    /// The mutable attributes of a group or dataset.
    pub fn attributes_mut(&mut self) -> Option<&mut Vec<AttributeMetadata>> {
        match self {
            Self::Group(group) => Some(&mut group.attributes),
            Self::Data(data) => Some(&mut data.attributes),
            Self::Link(_) | Self::External(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_metadata_json() {
        let metadata = NodeMetadata::Group(GroupMetadata::new("NXentry"));
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"node_type":"group","nx_class":"NXentry"}"#);
        assert_eq!(
            serde_json::from_str::<NodeMetadata>(&json).unwrap(),
            metadata
        );
    }

    #[test]
    fn data_metadata_json() {
        let json = r#"{
            "node_type": "data",
            "data_type": "INT32",
            "shape": [0, 3],
            "unlimited_dimension": 0,
            "chunk_shape": [4096, 3],
            "compression": "LZW",
            "attributes": [
                {"name": "units", "data_type": "CHAR", "shape": [6], "value": "counts"}
            ]
        }"#;
        let NodeMetadata::Data(data) = serde_json::from_str::<NodeMetadata>(json).unwrap() else {
            panic!("expected data metadata")
        };
        assert_eq!(data.data_type, NumType::Int32);
        assert!(data.is_extendible());
        assert_eq!(data.num_elements(), 0);
        assert_eq!(data.compression, Compression::Lzw);
        assert_eq!(data.chunk_grid_shape(), vec![0, 1]);
        assert!(data.chunk_encoding.is_raw());
        assert_eq!(
            data.attributes[0].values().unwrap().as_text().unwrap(),
            "counts"
        );
    }

    #[test]
    fn chunk_encoding_json() {
        let mut data = DataMetadata::new(NumType::UInt8, vec![4], None, vec![4], Compression::Lzw);
        let json = serde_json::to_value(NodeMetadata::Data(data.clone())).unwrap();
        assert!(json.get("chunk_encoding").is_none());
        data.chunk_encoding = ChunkEncoding::Gzip { level: 6 };
        let json = serde_json::to_value(NodeMetadata::Data(data.clone())).unwrap();
        assert_eq!(json["chunk_encoding"], serde_json::json!({"name": "gzip", "level": 6}));
        assert_eq!(
            serde_json::from_value::<NodeMetadata>(json).unwrap(),
            NodeMetadata::Data(data)
        );
    }

    #[test]
    fn link_metadata_json() {
        let json = r#"{"node_type":"link","target":"/entry/data"}"#;
        let metadata = serde_json::from_str::<NodeMetadata>(json).unwrap();
        assert_eq!(
            metadata,
            NodeMetadata::Link(LinkMetadata {
                target: NodePath::new("/entry/data").unwrap()
            })
        );
        assert_eq!(metadata.nx_class(), None);
        assert!(metadata.attributes().is_none());
        assert!(serde_json::from_str::<NodeMetadata>(r#"{"node_type":"link","target":"x"}"#).is_err());
    }

    #[test]
    fn attribute_metadata() {
        let attribute = AttributeMetadata::new("v", &ArrayValues::Int16(vec![1, 2, 3]), vec![3]);
        assert_eq!(attribute.len(), 3);
        assert_eq!(attribute.data_type, NumType::Int16);
        assert_eq!(attribute.values().unwrap(), ArrayValues::Int16(vec![1, 2, 3]));
    }
}
