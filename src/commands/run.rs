use clap::Args;

use vhdci::build::exit_code_hint;
use vhdci::pipeline::{self, RunOutcome, RunReport, Stage};
use vhdci::{Error, ErrorCode, SystemRunner};

use super::CmdResult;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Print the run report as a JSON envelope on stdout when finished
    #[arg(long)]
    pub json: bool,
}

pub fn run(_args: RunArgs, global: &super::GlobalArgs) -> CmdResult<RunReport> {
    let config = global.load_config()?;

    let report = pipeline::run_with(&config, &SystemRunner, print_stage)?;
    print_outcome(&report.outcome);

    let exit_code = report.exit_code();
    Ok((report, exit_code))
}

fn print_stage(stage: Stage<'_>) {
    match stage {
        Stage::Cleaned(report) => {
            for entry in &report.patterns {
                eprintln!("Deleted {} file(s) matching {}", entry.deleted, entry.pattern);
                for failure in &entry.failures {
                    eprintln!("  could not delete {}: {}", failure.path.display(), failure.error);
                }
            }
        }
        Stage::BuildAttempt(attempt) if !attempt.success() => {
            let label = if attempt.verbose { "verbose retry" } else { "build" };
            eprintln!(
                "{} {} failed with exit code {}",
                attempt.project, label, attempt.exit_code
            );
            if let Some(hint) = exit_code_hint(attempt.exit_code) {
                eprintln!("  hint: {}", hint);
            }
        }
        Stage::BuildAttempt(_) => {}
        Stage::Built(report) => {
            if report.succeeded() {
                let projects = report.attempts.iter().filter(|a| a.attempt == 1).count();
                eprintln!("Built {} project(s)", projects);
            }
        }
        Stage::Located(index) => {
            eprintln!("Located {} executable(s)", index.len());
        }
    }
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Succeeded => eprintln!("Pipeline succeeded"),
        RunOutcome::BuildFailed { project, exit_code } => {
            eprintln!("Build of {} failed twice (exit code {})", project, exit_code)
        }
        RunOutcome::StepFailed {
            step,
            executable,
            exit_code,
        } => eprintln!(
            "Step {} ({}) failed with exit code {}",
            step, executable, exit_code
        ),
    }
}

/// Human rendering of a fatal error. A missing binary lists every indexed
/// executable so the gap is visible.
pub fn print_error(err: &Error) {
    eprintln!("Error [{}]: {}", err.code.as_str(), err.message);

    if err.code == ErrorCode::SequenceBinaryNotFound {
        match err.details.get("index").and_then(|v| v.as_object()) {
            Some(index) if !index.is_empty() => {
                eprintln!("Binary index:");
                for (name, path) in index {
                    eprintln!("  {} -> {}", name, path.as_str().unwrap_or_default());
                }
            }
            _ => eprintln!("Binary index is empty"),
        }
    }

    for hint in &err.hints {
        eprintln!("  hint: {}", hint.message);
    }
}
