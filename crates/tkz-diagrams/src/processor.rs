//! Code block filter rendering TikZ diagrams.
//!
//! This module provides [`TikzProcessor`], which implements the
//! [`CodeBlockFilter`] trait and replaces every diagram block of a document
//! with the rendered image.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde_json::Value;
use tkz_cache::{CacheStore, FileCache, NullCache};
use tkz_config::{DocumentDefaults, METADATA_KEY, ToolchainConfig};
use tkz_pandoc::{CodeBlock, CodeBlockFilter, Document, FilterAction, TargetFormat};

use crate::block::DiagramBlock;
use crate::cache::DiagramKey;
use crate::embed::embed;
use crate::error::DiagramError;
use crate::format::{DiagramFormat, EmbedMode, ErrorPolicy};
use crate::options::{EffectiveOptions, resolve};
use crate::output::build_node;
use crate::pipeline::{Artifact, Pipeline, WorkDir, log_tail};
use crate::settings::DocumentSettings;
use crate::toolchain::{CommandRunner, SystemRunner};

/// Configuration for diagram processing (immutable after setup).
///
/// Separated from per-document state so the runner and toolchain can be
/// borrowed while counters and warnings are updated.
struct ProcessorConfig<R> {
    runner: R,
    toolchain: ToolchainConfig,
    target: TargetFormat,
    /// Directory relative output paths are resolved against.
    base_dir: PathBuf,
    /// Cache directory used when a document enables caching without one.
    fallback_cache_dir: Option<PathBuf>,
}

/// Per-document counts of processed diagrams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Diagrams rendered by the toolchain.
    pub rendered: usize,
    /// Diagrams served from the cache.
    pub cache_hits: usize,
    /// Diagrams that failed and were kept or dropped.
    pub failed: usize,
}

/// Renders `tikz` code blocks of pandoc documents.
///
/// # Example
///
/// ```no_run
/// use tkz_config::ToolchainConfig;
/// use tkz_diagrams::TikzProcessor;
/// use tkz_pandoc::{Document, TargetFormat};
///
/// let mut doc = Document::from_reader(std::io::stdin())?;
/// let mut processor = TikzProcessor::new(ToolchainConfig::default(), TargetFormat::parse("html"));
/// processor.process_document(&mut doc);
/// for warning in processor.warnings() {
///     eprintln!("{warning}");
/// }
/// # Ok::<(), tkz_pandoc::PandocError>(())
/// ```
pub struct TikzProcessor<R: CommandRunner = SystemRunner> {
    config: ProcessorConfig<R>,
    settings: DocumentSettings,
    cache: Box<dyn CacheStore>,
    /// Whether the document's pandoc supports `Figure` blocks.
    figures: bool,
    /// 1-based index of the current diagram block.
    counter: usize,
    /// Tool availability, looked up once per program.
    tools: HashMap<String, bool>,
    /// Output file names claimed so far in the current document.
    filenames: HashSet<String>,
    warnings: Vec<String>,
    summary: RenderSummary,
}

impl TikzProcessor<SystemRunner> {
    /// Create a processor running real programs from `PATH`.
    #[must_use]
    pub fn new(toolchain: ToolchainConfig, target: TargetFormat) -> Self {
        Self::with_runner(SystemRunner, toolchain, target)
    }
}

impl<R: CommandRunner> TikzProcessor<R> {
    /// Create a processor with a custom [`CommandRunner`].
    #[must_use]
    pub fn with_runner(runner: R, toolchain: ToolchainConfig, target: TargetFormat) -> Self {
        Self {
            config: ProcessorConfig {
                runner,
                toolchain,
                target,
                base_dir: PathBuf::from("."),
                fallback_cache_dir: None,
            },
            settings: DocumentSettings::default(),
            cache: Box::new(NullCache),
            figures: true,
            counter: 0,
            tools: HashMap::new(),
            filenames: HashSet::new(),
            warnings: Vec::new(),
            summary: RenderSummary::default(),
        }
    }

    /// Set the directory that relative output folders are resolved against.
    ///
    /// Defaults to the current directory.
    #[must_use]
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = dir.into();
        self
    }

    /// Set the cache directory used when a document enables caching without
    /// naming one.
    #[must_use]
    pub fn cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.fallback_cache_dir = dir;
        self
    }

    /// Render every diagram block of `doc` in place.
    ///
    /// Failures never abort the document: each is logged, recorded in
    /// [`warnings`](Self::warnings) and handled per the `on-error` setting.
    /// Returns the number of blocks replaced or removed.
    pub fn process_document(&mut self, doc: &mut Document) -> usize {
        self.warnings.clear();
        self.summary = RenderSummary::default();
        self.counter = 0;
        self.filenames.clear();

        let defaults = match DocumentDefaults::from_metadata(doc.metadata(METADATA_KEY).as_ref()) {
            Ok(defaults) => defaults,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring `tikz` metadata");
                self.warnings.push(format!("ignoring `tikz` metadata: {e}"));
                DocumentDefaults::default()
            }
        };
        let (settings, warnings) =
            DocumentSettings::from_defaults(&defaults, self.config.fallback_cache_dir.as_deref());
        for warning in warnings {
            tracing::warn!("{warning}");
            self.warnings.push(warning);
        }
        self.settings = settings;
        self.settings.save_tex_dir = self
            .settings
            .save_tex_dir
            .take()
            .map(|dir| self.config.base_dir.join(dir));

        self.cache = match &self.settings.cache_dir {
            Some(dir) => {
                let root = self.config.base_dir.join(dir);
                tracing::debug!(dir = %root.display(), "diagram cache enabled");
                Box::new(FileCache::new(root))
            }
            None => Box::new(NullCache),
        };
        self.figures = doc.supports_figures();

        let changed = doc.filter_code_blocks(self);
        tracing::info!(
            rendered = self.summary.rendered,
            cache_hits = self.summary.cache_hits,
            failed = self.summary.failed,
            "processed diagrams"
        );
        changed
    }

    /// Warnings collected while processing the last document.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Counts for the last processed document.
    #[must_use]
    pub fn summary(&self) -> RenderSummary {
        self.summary
    }

    fn process_block(&mut self, block: &DiagramBlock<'_>) -> Result<Value, DiagramError> {
        let index = self.counter;
        let resolution = resolve(block, &self.settings, &self.config.target, index)?;
        for warning in resolution.warnings {
            tracing::warn!("diagram {index}: {warning}");
            self.warnings.push(format!("diagram {index}: {warning}"));
        }
        let options = resolution.options;
        let body = resolution.body;

        let writes_files =
            options.embed_mode == EmbedMode::Link || self.settings.save_tex_dir.is_some();
        if !self.filenames.insert(options.filename.clone()) && writes_files {
            let warning = format!(
                "diagram {index}: filename '{}' is already used by another diagram, \
                 its files will be overwritten",
                options.filename
            );
            tracing::warn!("{warning}");
            self.warnings.push(warning);
        }

        let key = DiagramKey::new(&options, &body).entry_name();
        let cached = self
            .cache
            .lookup(&key)
            .filter(|bytes| options.format.has_signature(bytes));
        let artifact = match cached {
            Some(bytes) => {
                tracing::debug!(index, key = %key, "cache hit");
                self.summary.cache_hits += 1;
                Artifact {
                    format: options.format,
                    bytes,
                }
            }
            None => {
                let artifact = self.render(&options, &body)?;
                if let Err(e) = self.cache.store(&key, &artifact.bytes) {
                    tracing::warn!(error = %e, "failed to cache diagram");
                    self.warnings.push(format!("diagram {index}: {e}"));
                }
                self.summary.rendered += 1;
                artifact
            }
        };

        let payload = embed(&artifact, &options, &self.config.base_dir)?;
        Ok(build_node(&payload, &options, block, self.figures))
    }

    fn render(&mut self, options: &EffectiveOptions, body: &str) -> Result<Artifact, DiagramError> {
        self.ensure_tools(options.format)?;

        let workdir = WorkDir::create(self.settings.save_tex_dir.as_deref(), &options.filename)?;
        tracing::info!(
            filename = %options.filename,
            format = options.format.as_str(),
            "rendering diagram"
        );
        Pipeline::new(&self.config.runner, &self.config.toolchain, self.settings.debug).render(
            options,
            body,
            workdir.path(),
        )
    }

    /// Check that the programs needed for `format` are installed.
    fn ensure_tools(&mut self, format: DiagramFormat) -> Result<(), DiagramError> {
        let toolchain = &self.config.toolchain;
        let mut needed = vec![toolchain.typesetter.program.as_str()];
        if format == DiagramFormat::Svg {
            needed.push(toolchain.converter.program.as_str());
        }

        for program in needed {
            let available = *self
                .tools
                .entry(program.to_owned())
                .or_insert_with(|| is_available(&self.config.runner, program));
            if !available {
                return Err(DiagramError::ToolUnavailable {
                    tool: program.to_owned(),
                });
            }
        }
        Ok(())
    }
}

fn is_available<R: CommandRunner>(runner: &R, program: &str) -> bool {
    let found = runner.locate(program);
    match &found {
        Some(path) => tracing::debug!(program, path = %path.display(), "found tool"),
        None => tracing::warn!(program, "tool not found on PATH"),
    }
    found.is_some()
}

impl<R: CommandRunner> CodeBlockFilter for TikzProcessor<R> {
    fn filter(&mut self, block: &CodeBlock) -> FilterAction {
        let Some(diagram) = DiagramBlock::from_code_block(block) else {
            return FilterAction::Keep;
        };
        self.counter += 1;
        let index = self.counter;

        match self.process_block(&diagram) {
            Ok(node) => FilterAction::Replace(node),
            Err(e) => {
                self.summary.failed += 1;
                match &e {
                    DiagramError::Render {
                        stage, log, diagram: text, ..
                    } => tracing::error!(
                        index,
                        stage = %stage,
                        log = %log_tail(log),
                        source = %text,
                        "{e}"
                    ),
                    _ => tracing::error!(index, "{e}"),
                }
                self.warnings.push(format!("diagram {index}: {e}"));
                match self.settings.on_error {
                    ErrorPolicy::Keep => FilterAction::Keep,
                    ErrorPolicy::Drop => FilterAction::Remove,
                }
            }
        }
    }
}
