use clap::Args;

use vhdci::cleanup::{self, CleanupReport};

use super::CmdResult;

#[derive(Args, Debug, Default)]
pub struct CleanArgs {
    /// Record delete failures and keep going instead of aborting
    #[arg(long)]
    pub lenient: bool,
}

pub fn run(args: CleanArgs, global: &super::GlobalArgs) -> CmdResult<CleanupReport> {
    let mut config = global.load_config()?;
    if args.lenient {
        config.cleanup.strict = false;
    }

    let report = cleanup::purge(&config.working_dir, &config.cleanup)?;
    let exit_code = if report.total_failures() > 0 { 1 } else { 0 };

    Ok((report, exit_code))
}
