// skymerge CLI - multi-archive observation deduplication

mod exit_codes;
mod logging;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "skymerge")]
#[command(about = "Deduplicate astronomical observations across telescope archives")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true, env = "SKYMERGE_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load archives, deduplicate, and write the catalog + elimination log
    #[command(after_help = "\
Examples:
  skymerge run catalog.skymerge.toml
  skymerge run catalog.skymerge.toml --json
  skymerge run catalog.skymerge.toml --summary run.json --out-dir /tmp/out
  skymerge -v run catalog.skymerge.toml --parallel")]
    Run {
        /// Path to the .skymerge.toml config file
        config: PathBuf,

        /// Print the JSON summary to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON summary to a file
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Output directory (overrides [output].dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Match spatial blocks in parallel (overrides [matching].parallel)
        #[arg(long)]
        parallel: bool,
    },

    /// Validate a config without loading any archive
    #[command(after_help = "\
Examples:
  skymerge validate catalog.skymerge.toml")]
    Validate {
        /// Path to the .skymerge.toml config file
        config: PathBuf,
    },

    /// Profile each archive and the merged table
    #[command(after_help = "\
Examples:
  skymerge profile catalog.skymerge.toml
  skymerge profile catalog.skymerge.toml --json | jq '.merged.rows'")]
    Profile {
        /// Path to the .skymerge.toml config file
        config: PathBuf,

        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  skymerge-dedup ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  skymerge-dedup ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = logging::init(cli.verbose, cli.log_file.as_deref()).and_then(|_guard| {
        match cli.command {
            Commands::Run { config, json, summary, out_dir, parallel } => {
                run::cmd_run(config, json, summary, out_dir, parallel)
            }
            Commands::Validate { config } => run::cmd_validate(config),
            Commands::Profile { config, json } => run::cmd_profile(config, json),
        }
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
