use clap::Args;
use serde::Serialize;

use vhdci::error::codes;
use vhdci::error::help::{self, ErrorHelp, ErrorHelpSummary};
use vhdci::Error;

use super::CmdResult;

#[derive(Args, Debug, Default)]
pub struct ErrorsArgs {
    /// Error code to explain (omit to list every code)
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ErrorsOutput {
    List { errors: Vec<ErrorHelpSummary> },
    Explain(ErrorHelp),
}

pub fn run(args: ErrorsArgs) -> CmdResult<ErrorsOutput> {
    let Some(code) = args.code else {
        return Ok((ErrorsOutput::List { errors: help::list() }, 0));
    };

    let parsed = codes::parse_code(&code).ok_or_else(|| {
        Error::validation_invalid_argument(
            "code",
            format!("Unknown error code '{}'", code),
            Some(code.clone()),
            Some(
                codes::all_codes()
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect(),
            ),
        )
    })?;

    Ok((ErrorsOutput::Explain(help::explain(parsed)), 0))
}
