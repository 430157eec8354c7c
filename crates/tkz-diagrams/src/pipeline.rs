//! Render pipeline: build → typeset → convert → read.
//!
//! Each stage gates the next; the first failure aborts the run with a
//! [`DiagramError::Render`] naming the stage.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tkz_config::{INPUT, OUTDIR, OUTPUT, STEM, ToolCommand, ToolchainConfig};

use crate::consts::DEBUG_LOG_TARGET;
use crate::error::{DiagramError, Stage};
use crate::format::DiagramFormat;
use crate::options::EffectiveOptions;
use crate::template::render_wrapper;
use crate::toolchain::CommandRunner;

/// Lines of tool log kept in error diagnostics.
const LOG_TAIL_LINES: usize = 40;

/// Rendered diagram bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub format: DiagramFormat,
    pub bytes: Vec<u8>,
}

/// Working directory of one render.
///
/// Temporary directories are removed on drop; kept directories persist for
/// inspection.
#[derive(Debug)]
pub enum WorkDir {
    Temp(TempDir),
    Kept(PathBuf),
}

impl WorkDir {
    /// A fresh temporary directory, or `<keep_in>/<filename>` when intermediate
    /// files are kept.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Io`] if the directory cannot be created.
    pub fn create(keep_in: Option<&Path>, filename: &str) -> Result<Self, DiagramError> {
        match keep_in {
            Some(root) => {
                let dir = root.join(filename);
                fs::create_dir_all(&dir).map_err(|e| {
                    DiagramError::io(format!("failed to create {}", dir.display()), e)
                })?;
                Ok(Self::Kept(dir))
            }
            None => tempfile::Builder::new()
                .prefix("tkz-")
                .tempdir()
                .map(Self::Temp)
                .map_err(|e| DiagramError::io("failed to create temporary directory", e)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Temp(dir) => dir.path(),
            Self::Kept(dir) => dir,
        }
    }
}

/// File locations substituted into tool arguments.
struct Placeholders<'a> {
    input: &'a Path,
    output: &'a Path,
    outdir: &'a Path,
    stem: &'a str,
}

impl Placeholders<'_> {
    fn substitute(&self, tool: &ToolCommand) -> Vec<String> {
        tool.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT, &self.input.to_string_lossy())
                    .replace(OUTPUT, &self.output.to_string_lossy())
                    .replace(OUTDIR, &self.outdir.to_string_lossy())
                    .replace(STEM, self.stem)
            })
            .collect()
    }
}

/// Runs the external toolchain for one diagram.
pub struct Pipeline<'a, R: CommandRunner> {
    runner: &'a R,
    toolchain: &'a ToolchainConfig,
    debug: bool,
}

impl<'a, R: CommandRunner> Pipeline<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R, toolchain: &'a ToolchainConfig, debug: bool) -> Self {
        Self {
            runner,
            toolchain,
            debug,
        }
    }

    /// Render `body` with `options` inside `workdir`.
    ///
    /// For PDF output the typesetter's PDF is the artifact and the converter
    /// does not run.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Render`] tagged with the failing stage, or
    /// [`DiagramError::ToolUnavailable`] if a program vanished since the
    /// availability check.
    pub fn render(
        &self,
        options: &EffectiveOptions,
        body: &str,
        workdir: &Path,
    ) -> Result<Artifact, DiagramError> {
        let stem = options.filename.as_str();

        // build
        let wrapper = render_wrapper(options, body);
        if self.debug {
            tracing::info!(
                target: DEBUG_LOG_TARGET,
                filename = stem,
                "wrapper document:\n{wrapper}"
            );
        }
        let workdir = workdir
            .canonicalize()
            .map_err(|e| render_failure(Stage::Build, None, e.to_string(), body))?;
        let tex = workdir.join(format!("{stem}.tex"));
        fs::write(&tex, &wrapper).map_err(|e| {
            render_failure(
                Stage::Build,
                None,
                format!("failed to write {}: {e}", tex.display()),
                body,
            )
        })?;

        // typeset
        let pdf = workdir.join(format!("{stem}.pdf"));
        let typeset = Placeholders {
            input: &tex,
            output: &pdf,
            outdir: &workdir,
            stem,
        };
        let log_file = workdir.join(format!("{stem}.log"));
        self.run_stage(
            Stage::Typeset,
            &self.toolchain.typesetter,
            &typeset,
            &workdir,
            Some(&log_file),
            body,
        )?;

        // convert
        let artifact_path = match options.format {
            DiagramFormat::Pdf => pdf,
            DiagramFormat::Svg => {
                let svg = workdir.join(format!("{stem}.svg"));
                let convert = Placeholders {
                    input: &pdf,
                    output: &svg,
                    outdir: &workdir,
                    stem,
                };
                self.run_stage(
                    Stage::Convert,
                    &self.toolchain.converter,
                    &convert,
                    &workdir,
                    None,
                    body,
                )?;
                svg
            }
        };

        // read
        let bytes = fs::read(&artifact_path).map_err(|e| {
            render_failure(
                Stage::Read,
                None,
                format!("failed to read {}: {e}", artifact_path.display()),
                body,
            )
        })?;
        if bytes.is_empty() {
            return Err(render_failure(
                Stage::Read,
                None,
                format!("{} is empty", artifact_path.display()),
                body,
            ));
        }
        if !options.format.has_signature(&bytes) {
            return Err(render_failure(
                Stage::Read,
                None,
                format!(
                    "{} is not a valid {} file",
                    artifact_path.display(),
                    options.format.as_str()
                ),
                body,
            ));
        }

        Ok(Artifact {
            format: options.format,
            bytes,
        })
    }

    fn run_stage(
        &self,
        stage: Stage,
        tool: &ToolCommand,
        placeholders: &Placeholders<'_>,
        workdir: &Path,
        log_file: Option<&Path>,
        body: &str,
    ) -> Result<(), DiagramError> {
        let args = placeholders.substitute(tool);
        tracing::debug!(%stage, program = %tool.program, ?args, "running tool");

        let output = self
            .runner
            .run(&tool.program, &args, workdir, self.toolchain.timeout)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DiagramError::ToolUnavailable {
                        tool: tool.program.clone(),
                    }
                } else {
                    render_failure(
                        stage,
                        None,
                        format!("failed to run {}: {e}", tool.program),
                        body,
                    )
                }
            })?;

        if self.debug {
            tracing::info!(
                target: DEBUG_LOG_TARGET,
                %stage,
                code = ?output.code,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "tool output"
            );
        }
        if output.success() {
            return Ok(());
        }

        let mut log = log_file
            .and_then(|path| fs::read_to_string(path).ok())
            .filter(|log| !log.trim().is_empty())
            .unwrap_or_else(|| output.combined());
        if output.timed_out {
            log = format!(
                "{} timed out after {}s\n{log}",
                tool.program,
                self.toolchain.timeout.as_secs()
            );
        }
        Err(render_failure(stage, output.code, log, body))
    }
}

fn render_failure(stage: Stage, exit_code: Option<i32>, log: String, body: &str) -> DiagramError {
    DiagramError::Render {
        stage,
        exit_code,
        log,
        diagram: body.to_owned(),
    }
}

/// Last lines of a tool log, for diagnostics.
#[must_use]
pub fn log_tail(log: &str) -> String {
    let lines: Vec<&str> = log.trim_end().lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join("\n")
}
