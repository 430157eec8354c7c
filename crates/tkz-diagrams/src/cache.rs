//! Diagram cache key computation.
//!
//! Provides [`DiagramKey`] for computing content-based hashes used as cache keys.

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::consts::CACHE_KEY_VERSION;
use crate::options::EffectiveOptions;

/// Diagram parameters for cache key computation.
///
/// Contains everything that affects the rendered bytes. Placement options
/// (folder, filename, embed mode, caption, presentational size) are left out:
/// changing them must not trigger a re-render.
#[derive(Debug, Clone, Copy)]
pub struct DiagramKey<'a> {
    /// Diagram body, directive comments removed.
    pub source: &'a str,
    /// Output format ("svg" or "pdf").
    pub format: &'a str,
    pub libraries: &'a [String],
    pub additional_packages: &'a [String],
    pub header_includes: &'a [String],
    pub scale: Option<&'a str>,
    pub picture_options: &'a [(String, String)],
}

impl<'a> DiagramKey<'a> {
    /// Key for rendering `body` with `options`.
    #[must_use]
    pub fn new(options: &'a EffectiveOptions, body: &'a str) -> Self {
        Self {
            source: body,
            format: options.format.as_str(),
            libraries: &options.libraries,
            additional_packages: &options.additional_packages,
            header_includes: &options.header_includes,
            scale: options.scale.as_deref(),
            picture_options: &options.picture_options,
        }
    }

    /// Compute a content hash for this diagram key.
    ///
    /// # Hash Format
    ///
    /// Hex-encoded SHA-256 of a JSON object holding every field plus
    /// [`CACHE_KEY_VERSION`]. Object keys serialize in sorted order, so the
    /// serialization is stable.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let content = json!({
            "version": CACHE_KEY_VERSION,
            "source": self.source,
            "format": self.format,
            "libraries": self.libraries,
            "additional_packages": self.additional_packages,
            "header_includes": self.header_includes,
            "scale": self.scale,
            "picture_options": self.picture_options,
        })
        .to_string();
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Cache entry name: hash plus format extension.
    #[must_use]
    pub fn entry_name(&self) -> String {
        format!("{}.{}", self.compute_hash(), self.format)
    }
}
