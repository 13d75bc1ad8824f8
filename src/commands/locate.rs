use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use vhdci::locate::{self, BinaryIndex};

use super::CmdResult;

#[derive(Args, Debug, Default)]
pub struct LocateArgs {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocateOutput {
    pub utilities_root: PathBuf,
    pub executable_pattern: String,
    pub count: usize,
    pub index: BinaryIndex,
}

pub fn run(_args: LocateArgs, global: &super::GlobalArgs) -> CmdResult<LocateOutput> {
    let config = global.load_config()?;
    let utilities_root = config.utilities_root_path();

    let index = locate::locate(&utilities_root, &config.executable_pattern)?;

    Ok((
        LocateOutput {
            utilities_root,
            executable_pattern: config.executable_pattern,
            count: index.len(),
            index,
        },
        0,
    ))
}
