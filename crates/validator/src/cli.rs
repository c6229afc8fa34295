use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "bookmark-validator",
    about = "Validate bookmark registries across every project of a group"
)]
pub struct Cli {
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    Run {
        #[arg(long)]
        local: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Seal a token read from stdin with the key in `--key-env`.
    EncryptToken {
        #[arg(long, default_value = "ENCRYPTION_KEY")]
        key_env: String,
    },
    /// Print a fresh url-safe base64 key for `encrypt-token`.
    GenerateKey,
}

impl Default for Command {
    fn default() -> Self {
        Command::Run {
            local: None,
            format: ReportFormat::Text,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}
