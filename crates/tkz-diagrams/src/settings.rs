//! Document-wide settings derived from the `tikz` metadata map.

use std::path::{Path, PathBuf};

use tkz_config::{DocumentDefaults, Scalar, StringList};

use crate::consts::{DEFAULT_FILENAME_PREFIX, DEFAULT_SAVE_TEX_DIR};
use crate::format::ErrorPolicy;
use crate::options::{PartialOptions, split_names};

/// Settings shared by every block of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSettings {
    /// Document layer of the per-block options.
    pub options: PartialOptions,
    /// Base name for blocks without an explicit filename.
    pub filename_prefix: String,
    /// Cache directory, when caching is enabled.
    pub cache_dir: Option<PathBuf>,
    /// Directory for kept intermediate files, when enabled.
    pub save_tex_dir: Option<PathBuf>,
    /// Log wrapper documents and tool output.
    pub debug: bool,
    /// Handling of blocks that fail to render.
    pub on_error: ErrorPolicy,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            options: PartialOptions::default(),
            filename_prefix: DEFAULT_FILENAME_PREFIX.to_owned(),
            cache_dir: None,
            save_tex_dir: None,
            debug: false,
            on_error: ErrorPolicy::default(),
        }
    }
}

fn scalar(value: Option<&Scalar>) -> Option<String> {
    value.map(|s| s.as_str().trim().to_owned())
}

impl DocumentSettings {
    /// Derive settings from document defaults.
    ///
    /// `fallback_cache_dir` (from `tkz.toml` or the command line) is used when
    /// caching is enabled without a directory; otherwise the platform cache
    /// directory is used. Returns the settings and any warnings.
    #[must_use]
    pub fn from_defaults(
        defaults: &DocumentDefaults,
        fallback_cache_dir: Option<&Path>,
    ) -> (Self, Vec<String>) {
        let mut warnings: Vec<String> = defaults
            .unknown_keys()
            .map(|key| format!("unknown `tikz` metadata key '{key}' ignored"))
            .collect();

        let options = PartialOptions {
            format: scalar(defaults.format.as_ref()),
            embed_mode: scalar(defaults.embed_mode.as_ref()),
            folder: scalar(defaults.folder.as_ref()),
            filename: None,
            caption: scalar(defaults.caption.as_ref()),
            alt: None,
            width: scalar(defaults.width.as_ref()),
            height: scalar(defaults.height.as_ref()),
            scale: scalar(defaults.scale.as_ref()),
            libraries: defaults.libraries.as_ref().map(|l| split_names(l.to_vec())),
            additional_packages: defaults
                .additional_packages
                .as_ref()
                .map(|l| split_names(l.to_vec())),
            header_includes: defaults.header_includes.as_ref().map(StringList::to_vec),
            figure_attrs: Vec::new(),
            image_attrs: Vec::new(),
            picture_options: Vec::new(),
        };

        let filename_prefix = scalar(defaults.filename.as_ref())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| DEFAULT_FILENAME_PREFIX.to_owned());

        let cache_dir = match &defaults.cache {
            Some(toggle) if toggle.is_enabled() => {
                let dir = scalar(defaults.cache_dir.as_ref())
                    .map(PathBuf::from)
                    .or_else(|| toggle.path().map(PathBuf::from))
                    .or_else(|| fallback_cache_dir.map(Path::to_path_buf))
                    .or_else(tkz_cache::default_cache_dir);
                if dir.is_none() {
                    warnings.push("no cache directory available, caching disabled".to_owned());
                }
                dir
            }
            _ => None,
        };

        let mut save_tex_dir = match &defaults.save_tex {
            Some(toggle) if toggle.is_enabled() => Some(
                scalar(defaults.save_tex_dir.as_ref())
                    .map(PathBuf::from)
                    .or_else(|| toggle.path().map(PathBuf::from))
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_TEX_DIR)),
            ),
            _ => None,
        };
        if save_tex_dir.is_some() && cache_dir.is_some() {
            warnings.push(
                "save-tex and cache cannot be combined, intermediate files will not be kept"
                    .to_owned(),
            );
            save_tex_dir = None;
        }

        let on_error = match scalar(defaults.on_error.as_ref()) {
            None => ErrorPolicy::default(),
            Some(value) => ErrorPolicy::parse(&value).unwrap_or_else(|| {
                warnings.push(format!(
                    "unknown on-error value '{value}', using 'keep' (valid: {})",
                    ErrorPolicy::ALLOWED.join(", ")
                ));
                ErrorPolicy::Keep
            }),
        };

        let settings = Self {
            options,
            filename_prefix,
            cache_dir,
            save_tex_dir,
            debug: defaults.debug_enabled(),
            on_error,
        };
        (settings, warnings)
    }
}
