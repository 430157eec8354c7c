//! Colored terminal output on stderr.
//!
//! stdout is reserved for the filtered document, so everything meant for the
//! user goes through [`Output`].

use console::{Style, Term};
use tkz_diagrams::RenderSummary;

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    yellow: Style,
    red: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    /// Report diagram counts: always when something failed, otherwise only
    /// in verbose mode.
    pub(crate) fn summary(&self, summary: RenderSummary, verbose: bool) {
        if verbose {
            let _ = self.term.write_line(&format!(
                "Rendered {} diagram(s), {} from cache",
                summary.rendered, summary.cache_hits
            ));
        }
        if summary.failed > 0 {
            let msg = format!("{} diagram(s) failed to render", summary.failed);
            let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
        }
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }
}
