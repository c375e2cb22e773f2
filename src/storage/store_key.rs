use derive_more::{Display, From};
use thiserror::Error;

use super::StorePrefix;

/// A key addressing one value of a store: a node metadata document or a dataset chunk.
///
/// A key is a non-empty `/` separated string without a leading or trailing `/`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StoreKey(String);

/// An invalid store key.
#[derive(Debug, From, Error)]
#[error("invalid store key {0}")]
pub struct StoreKeyError(String);

/// A list of [`StoreKey`].
pub type StoreKeys = Vec<StoreKey>;

impl StoreKey {
    /// Create a store key.
    ///
    /// # Errors
    /// Returns [`StoreKeyError`] if `key` is empty or starts or ends with `/`.
    pub fn new(key: impl Into<String>) -> Result<Self, StoreKeyError> {
        let key = key.into();
        if Self::validate(&key) {
            Ok(Self(key))
        } else {
            Err(StoreKeyError(key))
        }
    }

    /// Create a store key without validation.
    ///
    /// # Safety
    /// `key` must satisfy [`StoreKey::validate`].
    #[must_use]
    pub unsafe fn new_unchecked(key: impl Into<String>) -> Self {
        let key = key.into();
        debug_assert!(Self::validate(&key));
        Self(key)
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `key` is a valid store key.
    #[must_use]
    pub fn validate(key: &str) -> bool {
        !key.is_empty() && !key.starts_with('/') && !key.ends_with('/')
    }

    /// Returns true if the key lies under `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &StorePrefix) -> bool {
        self.0.starts_with(prefix.as_str())
    }
}

impl TryFrom<&str> for StoreKey {
    type Error = StoreKeyError;

    fn try_from(key: &str) -> Result<Self, Self::Error> {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_key() {
        assert_eq!(StoreKey::new("entry/.nexus.json").unwrap().to_string(), "entry/.nexus.json");
        for invalid in ["", "/entry", "entry/"] {
            assert!(StoreKey::new(invalid).is_err());
        }
        assert_eq!(
            StoreKey::new("c/").unwrap_err().to_string(),
            "invalid store key c/"
        );
        let chunk = StoreKey::new("entry/data/c/0/1").unwrap();
        assert!(chunk.has_prefix(&StorePrefix::new("entry/data/c/").unwrap()));
        assert!(chunk.has_prefix(&StorePrefix::root()));
        assert!(!chunk.has_prefix(&StorePrefix::new("entry/monitor/").unwrap()));
    }
}
