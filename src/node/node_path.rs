use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorePrefix;

use super::{NodeName, NodeNameError};

/// A hierarchy node path.
///
/// An absolute, `/` separated sequence of [`NodeName`]s. The root group is `/`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Debug, Error)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NodePathError`] if `path` is not valid according to [`NodePath::validate`()].
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if Self::validate(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// The root node.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Extracts a string slice containing the node path `String`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a path:
    /// - A path always starts with `/`,
    /// - a non-root path cannot end with `/`, and
    /// - every segment is a valid, non-empty [`NodeName`].
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path.eq("/")
            || path.strip_prefix('/').is_some_and(|rest| {
                rest.split('/')
                    .all(|name| !name.is_empty() && NodeName::validate(name))
            })
    }

    /// Returns true if this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// The names of the nodes along the path, excluding the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// The number of segments in the path. The root has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The name of the node at the path.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// The path of the parent, or [`None`] for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(index) => Some(Self(self.0[..index].to_string())),
        }
    }

    /// The path of the child named `name`.
    ///
    /// # Errors
    /// Returns [`NodeNameError`] if `name` is not a valid node name.
    pub fn child(&self, name: &str) -> Result<Self, NodeNameError> {
        let name = NodeName::new(name)?;
        Ok(if self.is_root() {
            Self(format!("/{name}"))
        } else {
            Self(format!("{}/{name}", self.0))
        })
    }

    /// Returns true if `self` is `ancestor` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, ancestor: &Self) -> bool {
        ancestor.is_root()
            || self.0 == ancestor.0
            || self
                .0
                .strip_prefix(ancestor.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Returns the path of `self` relative to `ancestor`, or [`None`] if `self` is not beneath `ancestor`.
    #[must_use]
    pub fn strip_prefix(&self, ancestor: &Self) -> Option<Vec<&str>> {
        if !self.starts_with(ancestor) {
            return None;
        }
        Some(self.segments().skip(ancestor.depth()).collect())
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl TryFrom<String> for NodePath {
    type Error = NodePathError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Self::new(&path)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.0
    }
}

impl TryFrom<&StorePrefix> for NodePath {
    type Error = NodePathError;

    fn try_from(prefix: &StorePrefix) -> Result<Self, Self::Error> {
        let path = "/".to_string() + prefix.as_str().trim_end_matches('/');
        Self::new(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path() {
        assert!(NodePath::new("/").is_ok());
        assert!(NodePath::new("/a/b").is_ok());
        assert_eq!(NodePath::new("/a/b").unwrap().to_string(), "/a/b");
        assert!(NodePath::new("/a/b/").is_err());
        assert_eq!(
            NodePath::new("/a/b/").unwrap_err().to_string(),
            "invalid node path /a/b/"
        );
        assert!(NodePath::new("/a//b").is_err());
        assert!(NodePath::new("a/b").is_err());
        assert!(NodePath::new("/a/..").is_err());
        assert!(NodePath::new("/a:NXentry").is_err());
    }

    #[test]
    fn node_path_navigation() {
        let path = NodePath::new("/entry/data").unwrap();
        assert_eq!(path.name(), "data");
        assert_eq!(path.depth(), 2);
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["entry", "data"]);
        assert_eq!(path.parent(), Some(NodePath::new("/entry").unwrap()));
        assert_eq!(
            NodePath::new("/entry").unwrap().parent(),
            Some(NodePath::root())
        );
        assert_eq!(NodePath::root().parent(), None);
        assert_eq!(NodePath::root().child("entry").unwrap().as_str(), "/entry");
        assert_eq!(path.child("x").unwrap().as_str(), "/entry/data/x");
        assert!(path.child("..").is_err());
    }

    #[test]
    fn node_path_ancestry() {
        let path = NodePath::new("/entry/data").unwrap();
        let entry = NodePath::new("/entry").unwrap();
        assert!(path.starts_with(&entry));
        assert!(path.starts_with(&NodePath::root()));
        assert!(path.starts_with(&path));
        assert!(!NodePath::new("/entry2").unwrap().starts_with(&entry));
        assert_eq!(path.strip_prefix(&entry), Some(vec!["data"]));
        assert_eq!(entry.strip_prefix(&path), None);
    }

    #[test]
    fn node_path_serde() {
        let path = NodePath::new("/entry/data").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#""/entry/data""#);
        assert_eq!(serde_json::from_str::<NodePath>(&json).unwrap(), path);
        assert!(serde_json::from_str::<NodePath>(r#""entry""#).is_err());
    }
}
