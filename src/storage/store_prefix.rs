use derive_more::{Display, From};
use thiserror::Error;

use crate::node::NodePath;

/// A prefix of store keys, the directory of a node or of the chunks of a dataset.
///
/// A prefix is empty (the root) or ends with `/` and does not start with one.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StorePrefix(String);

/// An invalid store prefix.
#[derive(Debug, Error, From)]
#[error("invalid store prefix {0}")]
pub struct StorePrefixError(String);

/// A list of [`StorePrefix`].
pub type StorePrefixes = Vec<StorePrefix>;

impl StorePrefix {
    /// Create a store prefix.
    ///
    /// # Errors
    /// Returns [`StorePrefixError`] if `prefix` is not empty and does not end with `/`, or starts with `/`.
    pub fn new(prefix: impl Into<String>) -> Result<Self, StorePrefixError> {
        let prefix = prefix.into();
        if Self::validate(&prefix) {
            Ok(Self(prefix))
        } else {
            Err(StorePrefixError(prefix))
        }
    }

    /// Create a store prefix without validation.
    ///
    /// # Safety
    /// `prefix` must satisfy [`StorePrefix::validate`].
    #[must_use]
    pub unsafe fn new_unchecked(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        debug_assert!(Self::validate(&prefix));
        Self(prefix)
    }

    /// The prefix of every key, the directory of the root group.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// The prefix as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `prefix` is a valid store prefix.
    #[must_use]
    pub fn validate(prefix: &str) -> bool {
        prefix.is_empty() || (prefix.ends_with('/') && !prefix.starts_with('/'))
    }
}

impl TryFrom<&str> for StorePrefix {
    type Error = StorePrefixError;

    fn try_from(prefix: &str) -> Result<Self, StorePrefixError> {
        Self::new(prefix)
    }
}

impl From<&NodePath> for StorePrefix {
    fn from(path: &NodePath) -> Self {
        if path.is_root() {
            Self::root()
        } else {
            let relative = path.as_str().trim_start_matches('/');
            unsafe { Self::new_unchecked(format!("{relative}/")) }
        }
    }
}
