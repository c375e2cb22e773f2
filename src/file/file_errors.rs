use thiserror::Error;

use crate::{
    array_subset::IncompatibleDimensionalityError,
    data_type::DataTypeError,
    node::{NodeNameError, NodePathError},
    storage::StorageError,
};

/// A [`File`](crate::File) or [`Backend`](crate::backend::Backend) error.
#[derive(Debug, Error)]
pub enum NexusError {
    /// The container could not be opened or created.
    #[error("failed to open {0}")]
    OpenError(String),
    /// A node, attribute or path segment does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// A sibling with the same name already exists.
    #[error("{0} already exists")]
    NameConflict(String),
    /// The requested type or class differs from the stored one.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// A buffer or index has the wrong number of dimensions or elements.
    #[error("rank mismatch: {0}")]
    RankMismatch(String),
    /// A slab lies outside a fixed dimension.
    #[error("out of range: {0}")]
    RangeError(String),
    /// A dataset shape is invalid.
    #[error("invalid dimensions {0}")]
    InvalidDimensions(String),
    /// A navigation precondition is violated.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A resize is required but the dataset has no unlimited dimension.
    #[error("dataset {0} is not extendible")]
    NotExtendible(String),
    /// Stored values cannot be coerced to the requested representation.
    #[error("coercion error: {0}")]
    CoercionError(String),
    /// A type is outside the supported set.
    #[error("unsupported type {0}")]
    UnsupportedType(String),
    /// A node name or path is not valid.
    #[error("invalid name {0}")]
    InvalidName(String),
    /// A metadata document or attribute value is corrupt.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    /// An underlying storage error.
    #[error(transparent)]
    StorageError(StorageError),
}

impl From<StorageError> for NexusError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidMetadata(key, message) => {
                Self::InvalidMetadata(format!("{key}: {message}"))
            }
            StorageError::NodePathError(err) => Self::InvalidName(err.to_string()),
            StorageError::NodeNameError(err) => Self::InvalidName(err.to_string()),
            err => Self::StorageError(err),
        }
    }
}

impl From<DataTypeError> for NexusError {
    fn from(err: DataTypeError) -> Self {
        match err {
            DataTypeError::Unsupported(_) => Self::UnsupportedType(err.to_string()),
            DataTypeError::Mismatch { .. } => Self::TypeMismatch(err.to_string()),
            DataTypeError::Coercion { .. } => Self::CoercionError(err.to_string()),
            DataTypeError::InvalidBytesLength { .. } => Self::RankMismatch(err.to_string()),
            DataTypeError::InvalidValue { .. } => Self::InvalidMetadata(err.to_string()),
        }
    }
}

impl From<NodeNameError> for NexusError {
    fn from(err: NodeNameError) -> Self {
        Self::InvalidName(err.to_string())
    }
}

impl From<NodePathError> for NexusError {
    fn from(err: NodePathError) -> Self {
        Self::InvalidName(err.to_string())
    }
}

impl From<IncompatibleDimensionalityError> for NexusError {
    fn from(err: IncompatibleDimensionalityError) -> Self {
        Self::RankMismatch(err.to_string())
    }
}
