//! Driving the external Go toolchain: build the assembled source, run the
//! produced binary.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ToolchainConfig;

pub const SOURCE_FILE: &str = "gorepl.go";
pub const OBJECT_FILE: &str = "gorepl.o";
pub const BINARY_FILE: &str = "gorepl";

/// Infrastructure failures. Diagnostics from the Go compiler or the
/// program itself are not errors at this level; see [`RunOutcome`].
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("cannot prepare scratch directory {path}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid {step} command template: {message}")]
    Template { step: &'static str, message: String },

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' did not finish within {}s and was killed", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("i/o error while waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Result of running the linked binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Clean run; the captured standard output.
    Output(String),
    /// The program wrote to stderr; that text alone.
    Diagnostics(String),
}

/// The compile/link/run capability the session controller drives.
pub trait Toolchain {
    /// Compile and link `source`. Returns the concatenated diagnostics;
    /// an empty string means success.
    fn compile(&mut self, source: &str) -> Result<String, ToolchainError>;

    /// Run the most recently linked program.
    fn run(&mut self) -> Result<RunOutcome, ToolchainError>;
}

/// The real Go toolchain working in a fixed scratch directory.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    config: ToolchainConfig,
}

impl GoToolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    pub fn source_path(&self) -> PathBuf {
        self.config.scratch_dir.join(SOURCE_FILE)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.config.scratch_dir.join(BINARY_FILE)
    }

    fn prepare_scratch(&self, source: &str) -> Result<(), ToolchainError> {
        let scratch = &self.config.scratch_dir;
        let wrap = |source| ToolchainError::Scratch { path: scratch.clone(), source };
        fs::create_dir_all(scratch).map_err(wrap)?;
        fs::write(self.source_path(), source).map_err(wrap)
    }

    /// Expand a step template into a program and its arguments.
    fn expand(&self, step: &'static str, template: &str) -> Result<Vec<String>, ToolchainError> {
        let words = shell_words::split(template).map_err(|e| ToolchainError::Template {
            step,
            message: e.to_string(),
        })?;
        if words.is_empty() {
            return Err(ToolchainError::Template {
                step,
                message: "empty command".to_string(),
            });
        }
        let scratch = &self.config.scratch_dir;
        let go = self.config.go.to_string_lossy();
        let src = scratch.join(SOURCE_FILE);
        let obj = scratch.join(OBJECT_FILE);
        let bin = scratch.join(BINARY_FILE);
        Ok(words
            .into_iter()
            .map(|w| {
                w.replace("{go}", &go)
                    .replace("{src}", &src.to_string_lossy())
                    .replace("{obj}", &obj.to_string_lossy())
                    .replace("{bin}", &bin.to_string_lossy())
            })
            .collect())
    }

    /// Run one build step and return its diagnostics.
    fn step(&self, step: &'static str, template: &str) -> Result<String, ToolchainError> {
        let argv = self.expand(step, template)?;
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]).current_dir(&self.config.scratch_dir);

        let captured = run_captured(cmd, &argv[0], self.config.timeout)?;
        let mut diagnostics = captured.stdout;
        diagnostics.push_str(&captured.stderr);
        if diagnostics.is_empty() && !captured.status.success() {
            diagnostics = describe_status(captured.status);
        }
        Ok(diagnostics)
    }
}

impl Toolchain for GoToolchain {
    fn compile(&mut self, source: &str) -> Result<String, ToolchainError> {
        self.prepare_scratch(source)?;

        let mut diagnostics = self.step("compile", &self.config.compile)?;
        if diagnostics.is_empty() {
            if let Some(link) = &self.config.link {
                diagnostics = self.step("link", link)?;
            }
        }
        Ok(diagnostics)
    }

    fn run(&mut self) -> Result<RunOutcome, ToolchainError> {
        let bin = self.binary_path();
        let program = bin.to_string_lossy().into_owned();
        let mut cmd = Command::new(&bin);
        cmd.current_dir(&self.config.scratch_dir);

        let captured = run_captured(cmd, &program, self.config.timeout)?;
        if !captured.stderr.is_empty() {
            return Ok(RunOutcome::Diagnostics(captured.stderr));
        }
        if !captured.status.success() {
            // Exiting non-zero without a word still fails the cycle.
            return Ok(RunOutcome::Diagnostics(describe_status(captured.status)));
        }
        Ok(RunOutcome::Output(captured.stdout))
    }
}

/// Mirrors the wording Go itself uses for failed commands.
fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit status {}\n", code),
        None => format!("{}\n", status),
    }
}

struct Captured {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Spawn `cmd`, drain both pipes on reader threads and wait for it,
/// killing it once `timeout` elapses.
fn run_captured(
    mut cmd: Command,
    program: &str,
    timeout: Option<Duration>,
) -> Result<Captured, ToolchainError> {
    let started = Instant::now();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ToolchainError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let waited = match timeout {
        Some(limit) => child.wait_timeout(limit),
        None => child.wait().map(Some),
    };
    let status = match waited {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            let limit = timeout.unwrap_or_default();
            warn!(program, ?limit, "process timed out");
            return Err(ToolchainError::Timeout {
                program: program.to_string(),
                timeout: limit,
            });
        }
        Err(source) => {
            let _ = child.kill();
            return Err(ToolchainError::Wait {
                program: program.to_string(),
                source,
            });
        }
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    debug!(
        program,
        %status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "process finished"
    );
    Ok(Captured { status, stdout, stderr })
}

/// Extension trait for `std::process::Child` to support timeouts.
trait ChildExt {
    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ExitStatus>>;
}

impl ChildExt for Child {
    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ExitStatus>> {
        let start = Instant::now();
        loop {
            match self.try_wait()? {
                Some(status) => return Ok(Some(status)),
                None => {
                    if start.elapsed() >= timeout {
                        return Ok(None);
                    }
                    thread::sleep(Duration::from_millis(10));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toolchain(compile: &str, link: Option<&str>) -> GoToolchain {
        GoToolchain::new(ToolchainConfig {
            go: PathBuf::from("/opt/go/bin/go"),
            scratch_dir: PathBuf::from("/tmp/scratch"),
            compile: compile.to_string(),
            link: link.map(str::to_string),
            timeout: Some(Duration::from_secs(5)),
        })
    }

    #[test]
    fn test_expand_default_template() {
        let tc = toolchain("{go} build -o {bin} {src}", None);
        assert_eq!(
            tc.expand("compile", "{go} build -o {bin} {src}").unwrap(),
            vec![
                "/opt/go/bin/go",
                "build",
                "-o",
                "/tmp/scratch/gorepl",
                "/tmp/scratch/gorepl.go"
            ]
        );
    }

    #[test]
    fn test_expand_split_steps_with_quoting() {
        let tc = toolchain("{go} tool compile -o {obj} {src}", Some("{go} tool link -o {bin} {obj}"));
        assert_eq!(
            tc.expand("link", "{go} tool link -ldflags '-s -w' -o {bin} {obj}").unwrap(),
            vec![
                "/opt/go/bin/go",
                "tool",
                "link",
                "-ldflags",
                "-s -w",
                "-o",
                "/tmp/scratch/gorepl",
                "/tmp/scratch/gorepl.o"
            ]
        );
    }

    #[test]
    fn test_expand_rejects_bad_templates() {
        let tc = toolchain("", None);
        assert!(matches!(
            tc.expand("compile", "   "),
            Err(ToolchainError::Template { step: "compile", .. })
        ));
        assert!(matches!(
            tc.expand("compile", "go 'build"),
            Err(ToolchainError::Template { .. })
        ));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let err = run_captured(
            Command::new("/definitely/not/a/program"),
            "/definitely/not/a/program",
            None,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ToolchainError::Spawn { .. }));
        assert!(err.to_string().starts_with("failed to run '/definitely/not/a/program'"));
    }
}
