//! Stores.
//!
//! - [`MemoryStore`] holds every key in process memory. It is the store of the [`MemoryConnector`](crate::backend::MemoryConnector).
//! - [`FilesystemStore`] maps keys onto a directory tree. It is the store of the [`FilesystemConnector`](crate::backend::FilesystemConnector).

mod filesystem_store;
mod memory_store;

pub use filesystem_store::{FilesystemStore, FilesystemStoreCreateError};
pub use memory_store::MemoryStore;
