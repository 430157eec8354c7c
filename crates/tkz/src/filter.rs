//! Filter invocation: pandoc JSON in on stdin, filtered JSON out on stdout.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Args;
use tkz_config::{CliSettings, Config};
use tkz_diagrams::TikzProcessor;
use tkz_pandoc::{Document, TargetFormat};

use crate::error::CliError;
use crate::output::Output;

/// Arguments of a filter run.
#[derive(Args)]
pub(crate) struct FilterArgs {
    /// Output format of the pandoc run (pandoc passes it to filters).
    #[arg(value_name = "TARGET_FORMAT")]
    target: Option<String>,

    /// Path to configuration file (default: auto-discover tkz.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output (render and cache logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Typesetter program (overrides config).
    #[arg(long)]
    typesetter: Option<String>,

    /// SVG converter program (overrides config).
    #[arg(long)]
    converter: Option<String>,

    /// Cache directory for documents that enable caching (overrides config).
    #[arg(long, env = "TKZ_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Timeout for each external program, in seconds (overrides config).
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl FilterArgs {
    /// Filter the document on stdin to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the document cannot be
    /// read or written. Diagram failures are reported but never fail the run.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            typesetter: self.typesetter,
            converter: self.converter,
            cache_dir: self.cache_dir,
            timeout_secs: self.timeout,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::info!(path = %path.display(), "loaded configuration");
        }

        let target = self
            .target
            .as_deref()
            .map_or_else(TargetFormat::default, TargetFormat::parse);
        let mut doc = Document::from_reader(io::stdin().lock())?;

        let mut processor =
            TikzProcessor::new(config.toolchain, target).cache_dir(config.cache_dir);
        processor.process_document(&mut doc);

        output.summary(processor.summary(), self.verbose);

        let mut writer = BufWriter::new(io::stdout().lock());
        doc.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
