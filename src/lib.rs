//! Stateful access to hierarchical NeXus-style containers of typed multidimensional arrays.
//!
//! A container is a tree of class-tagged groups holding datasets: named N-dimensional arrays of one primitive
//! [`NumType`], which may be chunked, compressed and extendible along one unlimited dimension. Groups and datasets
//! carry typed attributes. Groups and datasets can be shared with links, and groups of other containers can be
//! mounted with external links.
//!
//! A [`File`] is the handle to an open container. It tracks a position (the open group and, optionally, one open
//! dataset) and scopes data and attribute calls to that position.
//!
//! ## Getting Started
//! - [`File::open`] opens a container in a directory. [`File::open_with`] takes any [`backend::Connector`], such as
//!   the in-memory [`backend::MemoryConnector`].
//! - [`storage`] holds the key-value stores that back the reference [`backend::StoreBackend`].
//! - [`config`] holds global settings such as the default chunk size.
//!
//! ## Example
//! ```rust
//! # use nexusfile::{backend::{AccessMode, MemoryConnector}, File, NumType, UNLIMITED};
//! # use std::sync::Arc;
//! let mut file = File::open_with(Arc::new(MemoryConnector::new()), "run", AccessMode::Create)?;
//! file.make_group("entry", "NXentry", true)?;
//! file.make_data("frames", NumType::Int32, &[UNLIMITED, 2], true)?;
//! file.put_slab(&[1i32, 2, 3, 4], &[0, 0], &[2, 2])?;
//! file.put_slab(&[5i32, 6], &[2, 0], &[1, 2])?;
//! assert_eq!(file.get_info()?.dims, vec![3, 2]);
//! assert_eq!(file.get_data_coerce_double()?, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! file.close_data()?;
//!
//! let types = file.get_type_map()?;
//! assert_eq!(types.paths("INT32"), ["/entry/frames"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## On-Disk Layout
//! Every group and dataset is a directory holding a `.nexus.json` metadata document. Dataset chunks are stored
//! under `c/` in the dataset directory, keyed by their chunk grid indices. Chunks that were never written read as
//! zero.
//!
//! ## Crate Features
//! #### Default
//!  - `gzip`: store chunks of datasets with the `LZW` compression hint as deflate streams.
//!
//! ## Licence
//! `nexusfile` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array_subset;
pub mod backend;
pub mod config;
pub mod data_type;
mod file;
pub mod node;
pub mod storage;

pub use backend::AccessMode;
pub use data_type::{type_of, ArrayValues, Compression, Element, NumType};
pub use file::{
    AttrInfo, Entry, File, Info, LinkId, LinkKind, NexusError, Position, TypeMap, UNLIMITED,
};
