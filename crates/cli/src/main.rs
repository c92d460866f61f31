//! `dealias` command line tool.
//!
//! Loads an OpenAPI document, splits structurally shared schema nodes and
//! writes the result, or just reports the sharing.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use dealias_common::{Config, init_tracing};
use tracing::debug;

mod cli;

#[derive(Parser)]
#[command(
    name = "dealias",
    version,
    about = "Break structural schema aliasing in OpenAPI documents"
)]
struct Cli {
    /// Config file (defaults to ./dealias.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dealias a document and write the result
    Normalize(cli::normalize::NormalizeArgs),
    /// Report shared schema nodes without changing anything
    Check(cli::check::CheckArgs),
}

fn main() {
    std::process::exit(run_cli(std::env::args().collect()));
}

fn run_cli(args: Vec<String>) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            return code;
        }
    };

    let (config, config_path) = match Config::discover(cli.config.as_deref()) {
        Ok(found) => found,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };
    init_tracing(config.log.as_deref());
    if let Some(path) = &config_path {
        debug!(path = %path.display(), "Using config file.");
    }

    match cli.command {
        Some(Commands::Normalize(args)) => cli::normalize::run(&args, &config),
        Some(Commands::Check(args)) => cli::check::run(&args, &config),
        None => {
            let mut cmd = Cli::command();
            let _ = cmd.print_help();
            println!();
            0
        }
    }
}
