//! TikZ diagram rendering for pandoc documents.
//!
//! This crate turns `tikz` code blocks into images:
//! - [`TikzProcessor`] implements [`CodeBlockFilter`](tkz_pandoc::CodeBlockFilter)
//!   and drives every diagram of a document through the pipeline
//! - options are layered from document metadata, `%|` directive comments and
//!   block attributes
//! - rendering runs an external typesetter and, for SVG, a converter
//! - results are cached by content hash and embedded as a linked file, a
//!   `data:` URI or raw SVG markup
//!
//! # Architecture
//!
//! - [`options`]: option layering and validation (`resolve`)
//! - [`template`]: standalone wrapper document
//! - [`pipeline`]: build, typeset, convert and read stages
//! - [`toolchain`]: external program execution behind [`CommandRunner`]
//! - [`embed`]: payload for each embed mode
//! - [`output`]: replacement pandoc nodes
//! - [`processor`]: per-document driver
//!
//! # Example
//!
//! ```no_run
//! use tkz_config::ToolchainConfig;
//! use tkz_diagrams::TikzProcessor;
//! use tkz_pandoc::{Document, TargetFormat};
//!
//! let mut doc = Document::from_json(r#"{"pandoc-api-version":[1,23],"meta":{},"blocks":[]}"#)?;
//! let mut processor = TikzProcessor::new(ToolchainConfig::default(), TargetFormat::parse("latex"))
//!     .base_dir("docs");
//! processor.process_document(&mut doc);
//! # Ok::<(), tkz_pandoc::PandocError>(())
//! ```

mod block;
mod cache;
mod consts;
mod directive;
pub mod embed;
mod error;
mod format;
pub mod options;
pub mod output;
pub mod pipeline;
mod processor;
mod settings;
pub mod template;
pub mod toolchain;

pub use block::DiagramBlock;
pub use cache::DiagramKey;
pub use consts::DEBUG_LOG_TARGET;
pub use error::{DiagramError, Stage};
pub use format::{DiagramFormat, EmbedMode, ErrorPolicy};
pub use options::{EffectiveOptions, PartialOptions, resolve};
pub use processor::{RenderSummary, TikzProcessor};
pub use settings::DocumentSettings;
pub use toolchain::{CommandRunner, SystemRunner, ToolOutput};
