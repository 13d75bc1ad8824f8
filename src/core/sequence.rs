//! Fail-fast execution of the scripted command steps.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::CommandStep;
use crate::error::{Error, Result};
use crate::locate::BinaryIndex;
use crate::process::{Invocation, ProcessRunner};

/// Result of one executed step. `step` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub step: usize,
    pub executable: String,
    pub path: PathBuf,
    pub arguments: String,
    pub exit_code: i32,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFailure {
    pub step: usize,
    pub executable: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceReport {
    pub steps: Vec<StepOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

impl SequenceReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Run `steps` in order against `index`, in `working_dir`.
///
/// A step naming an executable missing from the index stops the sequence with
/// `sequence.binary_not_found` before anything is spawned for it. A checked
/// step exiting non-zero stops the sequence; later steps never run.
pub fn run_steps(
    steps: &[CommandStep],
    index: &BinaryIndex,
    working_dir: &Path,
    runner: &dyn ProcessRunner,
) -> Result<SequenceReport> {
    let mut report = SequenceReport::default();

    for (position, step) in steps.iter().enumerate() {
        let number = position + 1;

        let path = index.get(&step.executable).ok_or_else(|| {
            Error::binary_not_found(&step.executable, number, index.to_display_map())
        })?;

        let invocation = Invocation::new(path)
            .argument_string(&step.arguments)
            .current_dir(working_dir);

        log_status!("run", "Step {}: {}", number, invocation.display());
        let result = runner.run(&invocation)?;

        report.steps.push(StepOutcome {
            step: number,
            executable: step.executable.clone(),
            path: path.to_path_buf(),
            arguments: step.arguments.clone(),
            exit_code: result.exit_code,
            checked: step.check_exit,
        });

        if result.success() {
            continue;
        }

        if !step.check_exit {
            log_status!(
                "run",
                "Step {} ({}) exited with {}; exit code not checked, continuing",
                number,
                step.executable,
                result.exit_code
            );
            continue;
        }

        log_status!(
            "run",
            "Step {} ({}) failed with exit code {}",
            number,
            step.executable,
            result.exit_code
        );
        report.failure = Some(StepFailure {
            step: number,
            executable: step.executable.clone(),
            exit_code: result.exit_code,
        });
        break;
    }

    Ok(report)
}
