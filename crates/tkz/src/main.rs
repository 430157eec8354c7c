//! tkz - TikZ diagram filter for pandoc.
//!
//! Reads a pandoc JSON document on stdin, renders every `tikz` code block
//! and writes the document back to stdout:
//!
//! ```text
//! pandoc input.md --filter tkz -o output.html
//! ```

mod error;
mod filter;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tkz_diagrams::DEBUG_LOG_TARGET;
use tracing_subscriber::EnvFilter;

use filter::FilterArgs;
use output::Output;

/// tkz - TikZ diagram filter for pandoc.
#[derive(Parser)]
#[command(name = "tkz", version, about)]
struct Cli {
    #[command(flatten)]
    filter: FilterArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN.
    // Output requested by the document `debug` option is always let through.
    let filter = if cli.filter.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("warn,{DEBUG_LOG_TARGET}=info")))
    };
    // stdout carries the document
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.filter.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}
