//! Configuration management for tkz.
//!
//! Two sources feed the filter:
//!
//! - `tkz.toml` project configuration (toolchain commands, cache directory,
//!   subprocess timeout), auto-discovered in the working directory and its
//!   parents. CLI settings are applied on top via [`CliSettings`].
//! - Per-document defaults read from the `tikz` metadata key, see
//!   [`DocumentDefaults`].
//!
//! ## Toolchain arguments
//!
//! Tool arguments are argument arrays, never shell command lines. Each element
//! may contain the placeholders [`INPUT`], [`OUTPUT`], [`OUTDIR`] and
//! [`STEM`], substituted per invocation.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `typesetter.program`
//! - `converter.program`
//! - `cache.dir`

mod defaults;
mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub use defaults::{DocumentDefaults, METADATA_KEY, Scalar, StringList, Toggle};

/// Placeholder for the tool's input file.
pub const INPUT: &str = "{input}";
/// Placeholder for the tool's output file.
pub const OUTPUT: &str = "{output}";
/// Placeholder for the working directory.
pub const OUTDIR: &str = "{outdir}";
/// Placeholder for the job name (input file name without extension).
pub const STEM: &str = "{stem}";

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tkz.toml";

/// Default subprocess timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override typesetter program.
    pub typesetter: Option<String>,
    /// Override converter program.
    pub converter: Option<String>,
    /// Override cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Override subprocess timeout.
    pub timeout_secs: Option<u64>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Typesetter section as parsed from TOML.
    typesetter: ToolRaw,
    /// Converter section as parsed from TOML.
    converter: ToolRaw,
    /// Cache section as parsed from TOML.
    cache: CacheRaw,
    /// Subprocess timeout in seconds.
    timeout_secs: Option<u64>,

    /// Resolved toolchain (set after loading).
    #[serde(skip)]
    pub toolchain: ToolchainConfig,
    /// Resolved cache directory, if configured (set after loading).
    #[serde(skip)]
    pub cache_dir: Option<PathBuf>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            typesetter: ToolRaw::default(),
            converter: ToolRaw::default(),
            cache: CacheRaw::default(),
            timeout_secs: None,
            toolchain: ToolchainConfig::default(),
            cache_dir: None,
            config_path: None,
        }
    }
}

/// Raw tool section as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ToolRaw {
    program: Option<String>,
    args: Option<Vec<String>>,
}

/// Raw cache section as parsed from TOML (path as string).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheRaw {
    dir: Option<String>,
}

/// An external program and its argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program name (looked up on `PATH`) or path.
    pub program: String,
    /// Argument template with placeholders.
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Create a command from a program and argument template.
    #[must_use]
    pub fn new<S: Into<String>>(program: impl Into<String>, args: impl IntoIterator<Item = S>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Default LaTeX typesetter: `pdflatex` in batch mode.
    #[must_use]
    pub fn default_typesetter() -> Self {
        Self::new(
            "pdflatex",
            [
                "-interaction=nonstopmode",
                "-halt-on-error",
                "-output-directory={outdir}",
                "{input}",
            ],
        )
    }

    /// Default PDF to SVG converter: poppler's `pdftocairo`.
    #[must_use]
    pub fn default_converter() -> Self {
        Self::new("pdftocairo", ["-svg", "{input}", "{output}"])
    }
}

/// Resolved external toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// LaTeX compiler producing a PDF from the wrapper document.
    pub typesetter: ToolCommand,
    /// Converter producing the final SVG from that PDF.
    pub converter: ToolCommand,
    /// Upper bound for a single subprocess run.
    pub timeout: Duration,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            typesetter: ToolCommand::default_typesetter(),
            converter: ToolCommand::default_converter(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Document metadata under the `tikz` key has the wrong shape.
    #[error("invalid `tikz` metadata: {0}")]
    Metadata(#[source] serde_json::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`cache.dir`").
        field: String,
        /// Error message (e.g., "${`TKZ_CACHE`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require an argument template to mention the input placeholder.
fn require_input_placeholder(args: &[String], field: &str) -> Result<(), ConfigError> {
    if !args.iter().any(|arg| arg.contains(INPUT)) {
        return Err(ConfigError::Validation(format!(
            "{field} must contain the {INPUT} placeholder"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `tkz.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(program) = &settings.typesetter {
            self.toolchain.typesetter.program.clone_from(program);
        }
        if let Some(program) = &settings.converter {
            self.toolchain.converter.program.clone_from(program);
        }
        if let Some(dir) = &settings.cache_dir {
            self.cache_dir = Some(dir.clone());
        }
        if let Some(secs) = settings.timeout_secs {
            self.toolchain.timeout = Duration::from_secs(secs);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ToolchainConfig {
            typesetter,
            converter,
            timeout,
        } = &self.toolchain;

        require_non_empty(&typesetter.program, "typesetter.program")?;
        require_input_placeholder(&typesetter.args, "typesetter.args")?;
        require_non_empty(&converter.program, "converter.program")?;
        require_input_placeholder(&converter.args, "converter.args")?;

        if timeout.is_zero() {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref program) = self.typesetter.program {
            self.typesetter.program = Some(expand::expand_env(program, "typesetter.program")?);
        }
        if let Some(ref program) = self.converter.program {
            self.converter.program = Some(expand::expand_env(program, "converter.program")?);
        }
        if let Some(ref dir) = self.cache.dir {
            self.cache.dir = Some(expand::expand_env(dir, "cache.dir")?);
        }
        Ok(())
    }

    /// Resolve raw sections against built-in defaults.
    ///
    /// Relative cache directories are resolved against the config directory.
    fn resolve(&mut self, config_dir: &Path) {
        let resolve_tool = |raw: &ToolRaw, default: ToolCommand| ToolCommand {
            program: raw.program.clone().unwrap_or(default.program),
            args: raw.args.clone().unwrap_or(default.args),
        };

        self.toolchain = ToolchainConfig {
            typesetter: resolve_tool(&self.typesetter, ToolCommand::default_typesetter()),
            converter: resolve_tool(&self.converter, ToolCommand::default_converter()),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        };
        self.cache_dir = self.cache.dir.as_ref().map(|dir| config_dir.join(dir));
    }
}
