#![allow(clippy::needless_pass_by_value)]

pub mod convert;
pub mod imc;
pub mod info;

use crate::opt::Command;
use anyhow::Result;

/// Runs a CLI command.
pub fn execute(command: Command) -> Result<()> {
    match command {
        Command::Convert(opt) => convert::command(opt),
        Command::Info(opt) => info::command(opt),
        Command::Imc(opt) => imc::command(opt),
    }
}
