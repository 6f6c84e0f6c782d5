use anyhow::Result;
use clap::Parser;

mod check_cmd;
mod cli;
mod generate_cmd;
mod inspect_cmd;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    smartzone::logging::init(cli.verbose);

    match cli.command {
        Command::Generate(args) => generate_cmd::run_generate(args),
        Command::Check(args) => check_cmd::run_check(args),
        Command::Inspect(args) => inspect_cmd::run_inspect(args),
    }
}
