use clap::Args;

use vhdci::build::{self, BuildReport};
use vhdci::config::UtilityProject;
use vhdci::Error;

use super::CmdResult;

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Utilities to build (omit for every configured utility)
    #[arg(value_name = "UTILITY")]
    pub utilities: Vec<String>,
}

pub fn run(args: BuildArgs, global: &super::GlobalArgs) -> CmdResult<BuildReport> {
    let config = global.load_config()?;
    let projects = select_utilities(&config.utilities, &args.utilities)?;

    let report = build::build_all(
        &projects,
        &config.utilities_root_path(),
        &config.build,
        &vhdci::SystemRunner,
    )?;

    let exit_code = report.failure.as_ref().map_or(0, |f| f.exit_code);
    Ok((report, exit_code))
}

/// Keep configuration order; every requested name must be configured.
fn select_utilities(
    configured: &[UtilityProject],
    requested: &[String],
) -> vhdci::Result<Vec<UtilityProject>> {
    if requested.is_empty() {
        return Ok(configured.to_vec());
    }

    if let Some(unknown) = requested
        .iter()
        .find(|name| !configured.iter().any(|u| &u.name == *name))
    {
        return Err(Error::validation_invalid_argument(
            "utility",
            format!("'{}' is not a configured utility", unknown),
            Some(unknown.clone()),
            Some(configured.iter().map(|u| u.name.clone()).collect()),
        ));
    }

    Ok(configured
        .iter()
        .filter(|u| requested.contains(&u.name))
        .cloned()
        .collect())
}
