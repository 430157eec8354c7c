//! Internal constants for diagram rendering.

use std::time::Duration;

/// Class marking a code block as TikZ source.
pub const MARKER_CLASS: &str = "tikz";

/// Prefix of directive comment lines inside diagram source.
pub const DIRECTIVE_PREFIX: &str = "%|";

/// Default output folder for linked images.
pub const DEFAULT_FOLDER: &str = "images";

/// Default base name for generated files (a block counter is appended).
pub const DEFAULT_FILENAME_PREFIX: &str = "tikz-image";

/// Default directory for kept intermediate files.
pub const DEFAULT_SAVE_TEX_DIR: &str = "tikz-tex";

/// Bumped whenever the wrapper template changes the rendered output.
pub const CACHE_KEY_VERSION: u32 = 1;

/// Interval between exit checks of a running tool.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to keep reading tool output after the tool itself has exited or
/// been killed. Descendants that inherited the pipes are not waited for.
pub const OUTPUT_GRACE: Duration = Duration::from_millis(250);

/// Opening of a picture environment in diagram source.
pub const PICTURE_BEGIN: &str = r"\begin{tikzpicture}";

/// Tracing target of the output enabled by the document `debug` option.
pub const DEBUG_LOG_TARGET: &str = "tkz::debug";
