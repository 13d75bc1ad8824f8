use clap::{Parser, Subcommand};

use commands::GlobalArgs;

#[derive(Debug, Clone, Copy)]
enum ResponseMode {
    Json,
    /// Child processes stream to stdout; diagnostics go to stderr.
    Raw,
}

mod commands;
mod output;
mod tty;

use commands::{build, clean, config, errors, locate, run};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "vhdci")]
#[command(version = VERSION)]
#[command(about = "Clean, build, locate and exercise the disk-image utilities")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    // None runs the pipeline.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline: purge, build, locate, execute steps
    Run(run::RunArgs),
    /// Delete stale artifacts from the working directory
    Clean(clean::CleanArgs),
    /// Build the configured utilities
    Build(build::BuildArgs),
    /// Index executables found in the utilities' build output
    Locate(locate::LocateArgs),
    /// Show the effective configuration
    Config(config::ConfigArgs),
    /// List error codes or explain one
    Errors(errors::ErrorsArgs),
}

fn response_mode(command: &Commands) -> ResponseMode {
    match command {
        Commands::Run(args) if !args.json => ResponseMode::Raw,
        _ => ResponseMode::Json,
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Run(run::RunArgs::default()));

    let exit_code = match (response_mode(&command), command) {
        (ResponseMode::Raw, Commands::Run(args)) => commands::run_raw(args, &cli.global),
        (_, command) => {
            let (json_result, exit_code) = commands::run_json(command, &cli.global);
            if let Err(err) = output::print_json_result(json_result) {
                eprintln!("{}", err);
            }
            exit_code
        }
    };

    finish(exit_code)
}

/// Exit status handed to the OS. Windows keeps the full 32-bit code;
/// elsewhere only a byte survives.
fn os_exit_code(code: i32) -> i32 {
    if cfg!(windows) {
        code
    } else {
        i32::from(exit_code_to_u8(code))
    }
}

#[cfg(windows)]
fn finish(exit_code: i32) -> std::process::ExitCode {
    use std::io::Write;

    let _ = std::io::stdout().flush();
    std::process::exit(os_exit_code(exit_code))
}

#[cfg(not(windows))]
fn finish(exit_code: i32) -> std::process::ExitCode {
    std::process::ExitCode::from(os_exit_code(exit_code) as u8)
}

/// Clamp into a process exit status. Negative codes (signal terminations)
/// still mean failure.
fn exit_code_to_u8(code: i32) -> u8 {
    if code == 0 {
        0
    } else if code < 0 {
        1
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["vhdci"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["vhdci", "locate", "--profile", "smoke", "--workdir", "/w"])
            .unwrap();
        assert_eq!(cli.global.profile, Some(vhdci::Profile::Smoke));
        assert_eq!(cli.global.workdir.as_deref(), Some("/w"));
    }

    #[test]
    fn run_json_selects_json_mode() {
        let cli = Cli::try_parse_from(["vhdci", "run", "--json"]).unwrap();
        assert!(matches!(
            cli.command.as_ref().map(response_mode),
            Some(ResponseMode::Json)
        ));
    }

    #[test]
    fn exit_codes_clamp_into_a_byte() {
        assert_eq!(exit_code_to_u8(0), 0);
        assert_eq!(exit_code_to_u8(4), 4);
        assert_eq!(exit_code_to_u8(-1), 1);
        assert_eq!(exit_code_to_u8(1000), 255);
    }

    #[test]
    fn os_exit_code_keeps_full_width_only_on_windows() {
        // STATUS_ACCESS_VIOLATION
        let crash = -1073741819;
        if cfg!(windows) {
            assert_eq!(os_exit_code(crash), crash);
            assert_eq!(os_exit_code(1000), 1000);
        } else {
            assert_eq!(os_exit_code(crash), 1);
            assert_eq!(os_exit_code(1000), 255);
        }
        assert_eq!(os_exit_code(5), 5);
    }
}
