//! Storage adapters.
//!
//! An adapter wraps another store and has the same interface as a store.

mod usage_log;

pub use usage_log::UsageLogStorageAdapter;
