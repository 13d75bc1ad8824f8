use clap::Args;

use vhdci::config::{LoadOptions, PipelineConfig, Profile};

pub type CmdResult<T> = vhdci::Result<(T, i32)>;

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct GlobalArgs {
    /// Built-in pipeline variant
    #[arg(long, global = true, value_enum)]
    pub profile: Option<Profile>,

    /// JSON file overriding any subset of the built-in configuration
    #[arg(long = "config", global = true, value_name = "FILE")]
    pub config_file: Option<String>,

    /// Working directory to purge and run the command sequence in
    #[arg(long, global = true, value_name = "DIR")]
    pub workdir: Option<String>,

    /// Directory holding one subdirectory per utility project
    #[arg(long, global = true, value_name = "DIR")]
    pub utilities_root: Option<String>,
}

impl GlobalArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            profile: self.profile,
            config_file: self.config_file.clone(),
            working_dir: self.workdir.clone(),
            utilities_root: self.utilities_root.clone(),
        }
    }

    pub fn load_config(&self) -> vhdci::Result<PipelineConfig> {
        vhdci::config::load(&self.load_options())
    }
}

pub mod build;
pub mod clean;
pub mod config;
pub mod errors;
pub mod locate;
pub mod run;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args))
    };
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (vhdci::Result<serde_json::Value>, i32) {
    crate::tty::status("vhdci is working...");

    match command {
        // Commands without global context
        crate::Commands::Errors(args) => dispatch!(args, errors),

        // Commands with global context
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Clean(args) => dispatch!(args, global, clean),
        crate::Commands::Build(args) => dispatch!(args, global, build),
        crate::Commands::Locate(args) => dispatch!(args, global, locate),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}

/// Run the pipeline with human diagnostics only. Child output owns stdout,
/// so errors are rendered to stderr instead of a JSON envelope.
pub(crate) fn run_raw(args: run::RunArgs, global: &GlobalArgs) -> i32 {
    match run::run(args, global) {
        Ok((_, exit_code)) => exit_code,
        Err(err) => {
            run::print_error(&err);
            crate::output::exit_code_for_error(err.code)
        }
    }
}
