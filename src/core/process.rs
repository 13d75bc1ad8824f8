//! Process invocation seam.
//!
//! Every external program (build tool, utility binaries) is started through
//! [`ProcessRunner`]. A process that cannot be started is an [`Error`]; a
//! process that ran is an [`ExecutionResult`] whatever its exit code.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::utils::shell;

/// How arguments reach the child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arguments {
    /// Discrete arguments, passed one by one.
    List(Vec<String>),
    /// One opaque argument string. Passed as the raw command-line tail on
    /// Windows; split into words elsewhere.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub arguments: Arguments,
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            arguments: Arguments::List(Vec::new()),
            current_dir: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = Arguments::List(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn argument_string(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Arguments::Raw(arguments.into());
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Human-readable command line for logs and diagnostics.
    pub fn display(&self) -> String {
        let program = shell::quote_arg(&self.program.to_string_lossy());
        let tail = match &self.arguments {
            Arguments::List(args) => shell::quote_args(args),
            Arguments::Raw(raw) => raw.clone(),
        };

        if tail.is_empty() {
            program
        } else {
            format!("{} {}", program, tail)
        }
    }
}

/// Outcome of a process that started and ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Exit code, or -1 when the process was terminated by a signal.
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

pub trait ProcessRunner {
    /// Run to completion, blocking. Output is not captured.
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult>;
}

/// Spawns real processes with stdin/stdout/stderr inherited from the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let mut cmd = Command::new(&invocation.program);

        match &invocation.arguments {
            Arguments::List(args) => {
                cmd.args(args);
            }
            Arguments::Raw(raw) => apply_raw_arguments(&mut cmd, raw),
        }

        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }

        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| {
                Error::process_spawn_failed(
                    invocation.program.to_string_lossy(),
                    e.to_string(),
                    invocation
                        .current_dir
                        .as_ref()
                        .map(|d| d.display().to_string()),
                )
            })?;

        Ok(ExecutionResult {
            exit_code: status.code().unwrap_or(-1),
        })
    }
}

#[cfg(windows)]
fn apply_raw_arguments(cmd: &mut Command, raw: &str) {
    use std::os::windows::process::CommandExt;

    if !raw.trim().is_empty() {
        cmd.raw_arg(raw);
    }
}

#[cfg(not(windows))]
fn apply_raw_arguments(cmd: &mut Command, raw: &str) {
    cmd.args(shell::split_args(raw));
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records every invocation and answers with scripted exit codes
    /// (0 once the script runs out).
    #[derive(Default)]
    pub struct RecordingRunner {
        codes: RefCell<VecDeque<i32>>,
        calls: RefCell<Vec<Invocation>>,
        unstartable: Vec<String>,
    }

    impl RecordingRunner {
        pub fn with_codes(codes: impl IntoIterator<Item = i32>) -> Self {
            Self {
                codes: RefCell::new(codes.into_iter().collect()),
                ..Self::default()
            }
        }

        /// Programs whose file name matches `name` fail to start.
        pub fn unstartable(mut self, name: &str) -> Self {
            self.unstartable.push(name.to_string());
            self
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.borrow().clone()
        }

        pub fn programs(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .map(|c| {
                    c.program
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default()
                })
                .collect()
        }
    }

    impl ProcessRunner for RecordingRunner {
        fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
            self.calls.borrow_mut().push(invocation.clone());

            let name = invocation
                .program
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if self.unstartable.contains(&name) {
                return Err(Error::process_spawn_failed(name, "not found", None));
            }

            let exit_code = self.codes.borrow_mut().pop_front().unwrap_or(0);
            Ok(ExecutionResult { exit_code })
        }
    }
}
