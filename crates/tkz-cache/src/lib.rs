//! Cache abstraction layer for tkz.
//!
//! Rendered diagrams are content-addressed: the caller computes a key from
//! everything that influences the rendered bytes, so a key never needs to be
//! revalidated. The [`CacheStore`] trait decouples the diagram pipeline from
//! the storage mechanism:
//!
//! - [`NullCache`]: No-op implementation (always misses), used when caching is disabled
//! - [`FileCache`]: One file per entry inside a cache directory
//!
//! Entries are never evicted or invalidated. Growth of the cache directory is
//! left to external housekeeping.
//!
//! # Example
//!
//! ```
//! use tkz_cache::{CacheStore, NullCache};
//!
//! let cache = NullCache;
//! cache.store("3f2a.svg", b"<svg/>").unwrap();
//! assert_eq!(cache.lookup("3f2a.svg"), None); // NullCache always misses
//! ```

mod file;

use std::path::PathBuf;

pub use file::{FileCache, default_cache_dir};

/// Error returned when a cache entry cannot be written.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Key is not usable as a file name.
    #[error("invalid cache key '{0}'")]
    InvalidKey(String),
    /// Filesystem failure while writing an entry.
    #[error("failed to write cache entry {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Key-value store for rendered diagram bytes.
///
/// Keys are opaque strings chosen by the caller (a content hash plus the
/// file extension of the rendered format). Two entries with the same key are
/// assumed to hold identical output.
pub trait CacheStore {
    /// Retrieve a cached value.
    ///
    /// Returns `None` on miss. Read failures are treated as misses.
    fn lookup(&self, key: &str) -> Option<Vec<u8>>;

    /// Store a value, overwriting any existing entry for the same key.
    ///
    /// Callers treat failures as warnings: caching is an optimization and a
    /// failed write must not discard the freshly rendered bytes.
    fn store(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;
}

/// No-op [`CacheStore`] that never stores or retrieves data.
///
/// Every `lookup` returns `None`; every `store` is silently discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl CacheStore for NullCache {
    fn lookup(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn store(&self, _key: &str, _value: &[u8]) -> Result<(), CacheError> {
        Ok(())
    }
}

impl<C: CacheStore + ?Sized> CacheStore for Box<C> {
    fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        (**self).lookup(key)
    }

    fn store(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        (**self).store(key, value)
    }
}
