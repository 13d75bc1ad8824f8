use clap::Args;
use serde::Serialize;

use vhdci::config::PipelineConfig;

use super::CmdResult;

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Show only the built-in profile defaults (ignore --config and path flags)
    #[arg(long)]
    pub builtin: bool,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    config: PipelineConfig,
}

pub fn run(args: ConfigArgs, global: &super::GlobalArgs) -> CmdResult<ConfigOutput> {
    if args.builtin {
        let profile = global.profile.unwrap_or_default();
        return Ok((
            ConfigOutput {
                source: "builtin",
                file: None,
                config: PipelineConfig::for_profile(profile),
            },
            0,
        ));
    }

    let config = global.load_config()?;
    let source = if global.config_file.is_some() {
        "file"
    } else {
        "builtin"
    };

    Ok((
        ConfigOutput {
            source,
            file: global.config_file.clone(),
            config,
        },
        0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::GlobalArgs;
    use vhdci::config::Profile;

    #[test]
    fn builtin_smoke_profile_has_one_unchecked_step() {
        let global = GlobalArgs {
            profile: Some(Profile::Smoke),
            ..GlobalArgs::default()
        };

        let (output, exit_code) = run(ConfigArgs { builtin: true }, &global).unwrap();

        assert_eq!(exit_code, 0);
        assert_eq!(output.config.steps.len(), 1);
        assert!(!output.config.steps[0].check_exit);
    }
}
