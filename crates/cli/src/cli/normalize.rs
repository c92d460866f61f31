use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use dealias_common::Config;
use dealias_core::openapi::{LoadOptions, dealias, to_json_string, to_yaml_string};
use tracing::{info, warn};

use super::common::{Format, is_stdin, load_document, read_input};
use super::run_command;

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// Input document (.json, .yaml or .yml); `-` reads stdin
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    /// Write here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// Output format (defaults to the output extension, then the config)
    #[arg(long, value_enum)]
    pub format: Option<Format>,
    /// Load identical fragments as separate nodes
    #[arg(long)]
    pub no_intern: bool,
    /// Compact JSON output
    #[arg(long)]
    pub compact: bool,
}

pub fn run(args: &NormalizeArgs, config: &Config) -> i32 {
    run_command(|| normalize(args, config).map(|()| 0))
}

fn normalize(args: &NormalizeArgs, config: &Config) -> Result<(), String> {
    let options = LoadOptions {
        intern_fragments: config.intern_fragments && !args.no_intern,
    };
    let text = read_input(&args.input)?;
    let mut document = load_document(&args.input, &text, options)?;

    let summary = dealias(&mut document).map_err(|err| err.to_string())?;
    for reference in &summary.dangling_refs {
        warn!(reference = %reference, "Reference target not found; subtree skipped.");
    }
    info!(
        input = %args.input.display(),
        clones = summary.clones,
        roots = summary.roots,
        "Normalized document."
    );

    let format = args
        .format
        .or_else(|| args.output.as_deref().and_then(Format::from_path))
        .unwrap_or_else(|| config.output_format.into());
    let pretty = config.pretty && !args.compact;
    let mut rendered = match format {
        Format::Json => to_json_string(&document, pretty),
        Format::Yaml => to_yaml_string(&document),
    }
    .map_err(|err| err.to_string())?;
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }

    match args.output.as_deref().filter(|path| !is_stdin(path)) {
        Some(path) => fs::write(path, rendered)
            .map_err(|err| format!("Failed to write {}: {err}", path.display())),
        None => std::io::stdout()
            .write_all(rendered.as_bytes())
            .map_err(|err| format!("Failed to write stdout: {err}")),
    }
}
