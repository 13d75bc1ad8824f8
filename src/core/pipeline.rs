//! The four-stage run: purge, build, locate, sequence.

use serde::Serialize;

use crate::build::{self, BuildOutcome, BuildReport};
use crate::cleanup::{self, CleanupReport};
use crate::config::{PipelineConfig, Profile};
use crate::error::Result;
use crate::locate::{self, BinaryIndex};
use crate::process::ProcessRunner;
use crate::sequence::{self, StepOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    #[serde(rename_all = "camelCase")]
    BuildFailed { project: String, exit_code: i32 },
    #[serde(rename_all = "camelCase")]
    StepFailed {
        step: usize,
        executable: String,
        exit_code: i32,
    },
}

impl RunOutcome {
    /// Process exit code for this outcome. Failures carry the child's code
    /// unchanged.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Succeeded => 0,
            RunOutcome::BuildFailed { exit_code, .. } => *exit_code,
            RunOutcome::StepFailed { exit_code, .. } => *exit_code,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub profile: Profile,
    pub cleanup: CleanupReport,
    pub builds: BuildReport,
    /// Absent when a build failure stopped the run before discovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<BinaryIndex>,
    pub steps: Vec<StepOutcome>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == RunOutcome::Succeeded
    }
}

/// A stage that finished, handed to the caller as soon as it is known.
#[derive(Debug, Clone, Copy)]
pub enum Stage<'a> {
    Cleaned(&'a CleanupReport),
    /// One build attempt, reported before any retry of it starts.
    BuildAttempt(&'a BuildOutcome),
    Built(&'a BuildReport),
    Located(&'a BinaryIndex),
}

/// Run the whole pipeline with no stage callback.
pub fn run(config: &PipelineConfig, runner: &dyn ProcessRunner) -> Result<RunReport> {
    run_with(config, runner, |_| {})
}

/// Run the whole pipeline, reporting each completed stage to `on_stage`.
///
/// A build whose retry fails ends the run with [`RunOutcome::BuildFailed`];
/// discovery and the command sequence never happen. A failing checked step
/// ends it with [`RunOutcome::StepFailed`]. Errors (missing binary, spawn
/// failure, strict cleanup failure) abort immediately.
pub fn run_with<F>(
    config: &PipelineConfig,
    runner: &dyn ProcessRunner,
    mut on_stage: F,
) -> Result<RunReport>
where
    F: FnMut(Stage<'_>),
{
    let started_at = timestamp();
    let utilities_root = config.utilities_root_path();

    log_status!("run", "Purging artifacts in {}", config.working_dir.display());
    let cleanup = cleanup::purge(&config.working_dir, &config.cleanup)?;
    on_stage(Stage::Cleaned(&cleanup));

    let builds = build::build_all_with(
        &config.utilities,
        &utilities_root,
        &config.build,
        runner,
        &mut |attempt| on_stage(Stage::BuildAttempt(attempt)),
    )?;
    on_stage(Stage::Built(&builds));

    if let Some(failure) = &builds.failure {
        let outcome = RunOutcome::BuildFailed {
            project: failure.project.clone(),
            exit_code: failure.exit_code,
        };
        return Ok(RunReport {
            started_at,
            finished_at: timestamp(),
            profile: config.profile,
            cleanup,
            builds,
            index: None,
            steps: Vec::new(),
            outcome,
        });
    }

    let index = locate::locate(&utilities_root, &config.executable_pattern)?;
    on_stage(Stage::Located(&index));

    let sequence = sequence::run_steps(&config.steps, &index, &config.working_dir, runner)?;

    let outcome = match sequence.failure {
        Some(failure) => RunOutcome::StepFailed {
            step: failure.step,
            executable: failure.executable,
            exit_code: failure.exit_code,
        },
        None => RunOutcome::Succeeded,
    };

    log_status!("run", "Finished with exit code {}", outcome.exit_code());

    Ok(RunReport {
        started_at,
        finished_at: timestamp(),
        profile: config.profile,
        cleanup,
        builds,
        index: Some(index),
        steps: sequence.steps,
        outcome,
    })
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
