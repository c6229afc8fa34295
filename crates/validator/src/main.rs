mod cli;
mod config;
mod logging;
mod run;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use crate::cli::{Cli, Command};

const FATAL_EXIT: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = if cli.verbose {
        true
    } else {
        logging::env_flag()
    };
    logging::init(verbose);
    let result = match cli.command.unwrap_or_default() {
        Command::Run { local, format } => run::run_group(local, format),
        Command::Check { files, format } => run::run_check(files, format),
        Command::EncryptToken { key_env } => run::run_encrypt(&key_env),
        Command::GenerateKey => run::run_generate_key(),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(FATAL_EXIT)
        }
    }
}
