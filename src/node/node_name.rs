use derive_more::Display;
use thiserror::Error;

use crate::storage::StorePrefix;

/// A hierarchy node name.
///
/// The name of a group, dataset or link within its parent group.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub struct NodeName(String);

/// An invalid node name.
#[derive(Debug, Error)]
#[error("invalid node name {0}")]
pub struct NodeNameError(String);

impl NodeName {
    /// Create a new node name from `name`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeNameError`] if `name` is not valid according to [`NodeName::validate`()].
    pub fn new(name: &str) -> Result<Self, NodeNameError> {
        if Self::validate(name) && !name.is_empty() {
            Ok(Self(name.to_string()))
        } else {
            Err(NodeNameError(name.to_string()))
        }
    }

    /// The root node.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Extracts a string slice containing the node name `String`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a node name:
    /// - The root node does not have a name and is the empty string "". Otherwise,
    /// - must not include the characters "/" or ":" (the latter separates a name from its class in a path), and
    /// - must not start with "." (reserved for metadata documents, and excludes "." and "..").
    #[must_use]
    pub fn validate(node_name: &str) -> bool {
        node_name.is_empty()
            || (!node_name.contains(['/', ':']) && !node_name.starts_with('.'))
    }

    /// Indicates if a node has the root node name ("").
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&StorePrefix> for NodeName {
    fn from(prefix: &StorePrefix) -> Self {
        let name = prefix
            .as_str()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        Self(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_name() {
        assert!(NodeName::new("entry").is_ok());
        assert!(NodeName::new("entry_1.x").is_ok());
        assert!(NodeName::new("").is_err());
        assert!(NodeName::new("a/b").is_err());
        assert!(NodeName::new("a:NXentry").is_err());
        assert!(NodeName::new(".").is_err());
        assert!(NodeName::new("..").is_err());
        assert!(NodeName::new(".nexus.json").is_err());
        assert_eq!(
            NodeName::new("a/b").unwrap_err().to_string(),
            "invalid node name a/b"
        );
        assert!(NodeName::root().is_root());
    }

    #[test]
    fn node_name_from_prefix() {
        let prefix = StorePrefix::new("entry/data/").unwrap();
        assert_eq!(NodeName::from(&prefix).as_str(), "data");
        assert!(NodeName::from(&StorePrefix::root()).is_root());
    }
}
