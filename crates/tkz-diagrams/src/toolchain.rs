//! External program execution.
//!
//! The pipeline talks to the typesetter and converter through
//! [`CommandRunner`], so tests can substitute a fake toolchain. Programs are
//! always started with an argument array; no shell is involved.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use crate::consts::{OUTPUT_GRACE, POLL_INTERVAL};

/// Result of one program run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal or the timeout.
    pub code: Option<i32>,
    /// Whether the run was stopped after exceeding its timeout.
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Exit code 0 within the timeout.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }

    /// Captured stdout followed by stderr.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, _) => self.stderr.clone(),
            (false, true) => self.stdout.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Locates and runs external programs.
pub trait CommandRunner {
    /// Resolve `program` to an executable, `None` if unavailable.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Run `program` with `args` in `cwd`, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the program cannot be started or waited on.
    /// A non-zero exit is reported through [`ToolOutput`], not as an error.
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Duration,
    ) -> io::Result<ToolOutput>;
}

/// [`CommandRunner`] spawning real processes found on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Duration,
    ) -> io::Result<ToolOutput> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes concurrently so a chatty tool never blocks on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + timeout;
        let (code, timed_out) = loop {
            if let Some(status) = child.try_wait()? {
                break (status.code(), false);
            }
            if Instant::now() >= deadline {
                tracing::warn!(program, timeout_secs = timeout.as_secs(), "tool timed out, killing");
                // The child may exit between try_wait and kill.
                let _ = child.kill();
                child.wait()?;
                break (None, true);
            }
            thread::sleep(POLL_INTERVAL);
        };

        // A descendant of the tool can keep the pipes open long after the tool
        // is gone, so reading is bounded as well.
        let until = deadline.max(Instant::now()) + OUTPUT_GRACE;
        Ok(ToolOutput {
            code,
            timed_out,
            stdout: collect(stdout, until, program),
            stderr: collect(stderr, until, program),
        })
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        // A read error just truncates the captured log.
        let _ = reader.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn collect(output: Option<Receiver<String>>, until: Instant, program: &str) -> String {
    let Some(output) = output else {
        return String::new();
    };
    match output.recv_timeout(until.saturating_duration_since(Instant::now())) {
        Ok(text) => text,
        Err(_) => {
            tracing::warn!(program, "output still held open by a child process, not waiting");
            String::new()
        }
    }
}
