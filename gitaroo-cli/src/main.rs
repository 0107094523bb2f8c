use anyhow::Result;
use clap::Parser;
use gitaroo_cli::opt::Opt;
use gitaroo_cli::{commands, terminal};
use log::error;
use std::process;

fn run_app() -> Result<()> {
    let opt = Opt::parse();
    terminal::init_logging(opt.verbose)?;
    commands::execute(opt.command)
}

fn main() {
    process::exit(match run_app() {
        Ok(()) => 0,
        Err(err) => {
            error!("Fatal: {:#}", err);
            1
        }
    });
}
