//! Global configuration options.

use std::sync::OnceLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for the nexusfile crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Default Chunk Size
/// > default: `4096`
///
/// The chunk extent along an unlimited dimension when a dataset is created without an explicit chunk shape.
/// It is also the default chunk of [`File::write_extendible_data`](crate::File::write_extendible_data).
///
/// ## Default Chunk Bytes
/// > default: `1048576` (1 MiB)
///
/// The largest uncompressed chunk created without an explicit chunk shape.
/// The default chunk starts from the full extent of each fixed dimension and the default chunk size along the
/// unlimited dimension, and its largest dimension is halved until the chunk fits.
///
/// ## Compression Enabled
/// > default: [`true`]
///
/// If enabled, the store backend honours the `LZW` compression hint by deflating chunks (requires the `gzip` feature).
/// Otherwise every compression hint is ignored.
///
/// ## Compression Level
/// > default: `6`
///
/// The deflate compression level (0-9).
///
/// ## Max Link Depth
/// > default: `16`
///
/// The maximum number of links followed while resolving a single path.
/// Exceeding it is reported as an invalid state, which is how link cycles surface during navigation.
#[derive(Debug, Clone)]
pub struct Config {
    default_chunk_size: u64,
    default_chunk_bytes: u64,
    compression_enabled: bool,
    compression_level: u32,
    max_link_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_chunk_size: 4096,
            default_chunk_bytes: 1 << 20,
            compression_enabled: true,
            compression_level: 6,
            max_link_depth: 16,
        }
    }
}

impl Config {
    /// Get the [default chunk size](#default-chunk-size) configuration.
    #[must_use]
    pub fn default_chunk_size(&self) -> u64 {
        self.default_chunk_size
    }

    /// Set the [default chunk size](#default-chunk-size) configuration. Zero is treated as one.
    pub fn set_default_chunk_size(&mut self, default_chunk_size: u64) -> &mut Self {
        self.default_chunk_size = default_chunk_size.max(1);
        self
    }

    /// Get the [default chunk bytes](#default-chunk-bytes) configuration.
    #[must_use]
    pub fn default_chunk_bytes(&self) -> u64 {
        self.default_chunk_bytes
    }

    /// Set the [default chunk bytes](#default-chunk-bytes) configuration.
    pub fn set_default_chunk_bytes(&mut self, default_chunk_bytes: u64) -> &mut Self {
        self.default_chunk_bytes = default_chunk_bytes;
        self
    }

    /// Get the [compression enabled](#compression-enabled) configuration.
    #[must_use]
    pub fn compression_enabled(&self) -> bool {
        self.compression_enabled
    }

    /// Set the [compression enabled](#compression-enabled) configuration.
    pub fn set_compression_enabled(&mut self, compression_enabled: bool) -> &mut Self {
        self.compression_enabled = compression_enabled;
        self
    }

    /// Get the [compression level](#compression-level) configuration.
    #[must_use]
    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    /// Set the [compression level](#compression-level) configuration. Values above 9 are clamped.
    pub fn set_compression_level(&mut self, compression_level: u32) -> &mut Self {
        self.compression_level = compression_level.min(9);
        self
    }

    /// Get the [max link depth](#max-link-depth) configuration.
    #[must_use]
    pub fn max_link_depth(&self) -> usize {
        self.max_link_depth
    }

    /// Set the [max link depth](#max-link-depth) configuration.
    pub fn set_max_link_depth(&mut self, max_link_depth: usize) -> &mut Self {
        self.max_link_depth = max_link_depth;
        self
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global nexusfile configuration.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global nexusfile configuration.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).write()
}
