use serde::Serialize;
use std::path::Path;

use crate::config::{BuildToolConfig, UtilityProject};
use crate::error::{Error, Result};
use crate::process::{Invocation, ProcessRunner};

// === Public API ===

/// One build-tool invocation for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutcome {
    pub project: String,
    pub exit_code: i32,
    /// 1 for the initial build, 2 for the verbose retry.
    pub attempt: u8,
    pub verbose: bool,
}

impl BuildOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A project whose retry also failed. `exit_code` is the retry's code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFailure {
    pub project: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub attempts: Vec<BuildOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<BuildFailure>,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Build every project in order, stopping at the first project whose verbose
/// retry fails. Projects after a failed one are never built.
pub fn build_all(
    projects: &[UtilityProject],
    utilities_root: &Path,
    tool: &BuildToolConfig,
    runner: &dyn ProcessRunner,
) -> Result<BuildReport> {
    build_all_with(projects, utilities_root, tool, runner, &mut |_| {})
}

/// [`build_all`], handing each attempt to `on_attempt` as soon as it
/// finishes, before any retry starts.
pub fn build_all_with(
    projects: &[UtilityProject],
    utilities_root: &Path,
    tool: &BuildToolConfig,
    runner: &dyn ProcessRunner,
    on_attempt: &mut dyn FnMut(&BuildOutcome),
) -> Result<BuildReport> {
    let mut report = BuildReport::default();

    for project in projects {
        let outcomes = build_project(project, utilities_root, tool, runner, on_attempt)?;
        let last = outcomes
            .last()
            .cloned()
            .ok_or_else(|| Error::internal_unexpected("build produced no attempts"))?;
        report.attempts.extend(outcomes);

        if !last.success() {
            log_status!(
                "build",
                "{} failed again with exit code {}, aborting",
                project.name,
                last.exit_code
            );
            report.failure = Some(BuildFailure {
                project: project.name.clone(),
                exit_code: last.exit_code,
            });
            break;
        }
    }

    Ok(report)
}

/// Build one project: a normal attempt, then one verbose retry if it failed.
/// Returns the attempts in order; the last one is authoritative.
pub fn build_project(
    project: &UtilityProject,
    utilities_root: &Path,
    tool: &BuildToolConfig,
    runner: &dyn ProcessRunner,
    on_attempt: &mut dyn FnMut(&BuildOutcome),
) -> Result<Vec<BuildOutcome>> {
    let dir = project.project_directory(utilities_root);
    if !dir.is_dir() {
        return Err(Error::build_project_not_found(
            &project.name,
            dir.display().to_string(),
        ));
    }

    let first = Invocation::new(&tool.program)
        .args(tool.args.iter().cloned())
        .current_dir(&dir);

    log_status!("build", "Building {} ({})", project.name, first.display());
    let result = runner.run(&first)?;
    let first_outcome = BuildOutcome {
        project: project.name.clone(),
        exit_code: result.exit_code,
        attempt: 1,
        verbose: false,
    };
    on_attempt(&first_outcome);
    let mut outcomes = vec![first_outcome];

    if result.success() {
        return Ok(outcomes);
    }

    log_status!(
        "build",
        "{} failed with exit code {}, retrying with verbose logging",
        project.name,
        result.exit_code
    );

    let retry = Invocation::new(&tool.program)
        .args(tool.args.iter().chain(tool.verbose_args.iter()).cloned())
        .current_dir(&dir);
    let result = runner.run(&retry)?;
    let retry_outcome = BuildOutcome {
        project: project.name.clone(),
        exit_code: result.exit_code,
        attempt: 2,
        verbose: true,
    };
    on_attempt(&retry_outcome);
    outcomes.push(retry_outcome);

    Ok(outcomes)
}

/// Translate universal POSIX exit codes into a hint. Build tools differ too
/// much for anything more specific.
pub fn exit_code_hint(exit_code: i32) -> Option<&'static str> {
    match exit_code {
        127 => Some("Command not found. Check that the build tool and its dependencies are installed and in PATH."),
        126 => Some("Permission denied. Check file permissions on the build tool."),
        -1 => Some("The process was terminated by a signal."),
        _ => None,
    }
}
