//! File-based cache implementation.
//!
//! [`FileCache`] stores every entry as a plain file named by its key directly
//! inside the cache root:
//!
//! ```text
//! {root}/
//! +-- 9c1e...a4.svg      # rendered SVG
//! +-- 03bd...7f.pdf      # rendered PDF
//! ```
//!
//! Files hold the rendered bytes verbatim so entries can be inspected or
//! deleted by hand. The root is created on first write. Concurrent builds
//! sharing one root are not coordinated; a reader racing a writer may observe
//! a partial file.

use std::fs;
use std::path::PathBuf;

use crate::{CacheError, CacheStore};

/// Directory name used below the platform cache directory.
const CACHE_DIR_NAME: &str = "tkz";

/// Platform cache directory for tkz (e.g. `~/.cache/tkz` on Linux).
///
/// Returns `None` when the platform has no notion of a user cache directory.
#[must_use]
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(CACHE_DIR_NAME))
}

/// File-based [`CacheStore`] rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Create a cache rooted at `root`.
    ///
    /// Nothing is touched on disk until the first [`store`](CacheStore::store).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the file backing `key`, or `None` if `key` could escape the root.
    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\'])
            && key != "..";
        valid.then(|| self.root.join(key))
    }
}

impl CacheStore for FileCache {
    fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("failed to read cache entry {}: {e}", path.display());
                None
            }
        }
    }

    fn store(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let path = self
            .entry_path(key)
            .ok_or_else(|| CacheError::InvalidKey(key.to_owned()))?;

        fs::create_dir_all(&self.root).map_err(|source| CacheError::Io {
            path: self.root.clone(),
            source,
        })?;
        fs::write(&path, value).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("cached {} ({} bytes)", path.display(), value.len());
        Ok(())
    }
}
