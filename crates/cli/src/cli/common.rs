//! Common types shared across CLI commands

use std::fs;
use std::io::Read;
use std::path::Path;

use clap::ValueEnum;
use dealias_common::OutputFormat;
use dealias_core::openapi::{Document, LoadOptions, load_json, load_yaml};

/// Document serialization formats
#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
#[value(rename_all = "lower")]
pub enum Format {
    /// JSON
    Json,
    /// YAML
    Yaml,
}

impl Format {
    /// Format implied by a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Self::Json,
            OutputFormat::Yaml => Self::Yaml,
        }
    }
}

/// Whether `path` names standard input.
pub fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Read the input document text from a file or stdin.
pub fn read_input(path: &Path) -> Result<String, String> {
    if is_stdin(path) {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| format!("Failed to read stdin: {err}"))?;
        return Ok(text);
    }
    fs::read_to_string(path).map_err(|err| format!("Failed to read {}: {err}", path.display()))
}

/// Parse `text`, choosing the syntax from the path's extension. Without one,
/// text starting with `{` is JSON and anything else YAML.
pub fn load_document(path: &Path, text: &str, options: LoadOptions) -> Result<Document, String> {
    let format = Format::from_path(path).unwrap_or_else(|| {
        if text.trim_start().starts_with('{') {
            Format::Json
        } else {
            Format::Yaml
        }
    });
    let loaded = match format {
        Format::Json => load_json(text, options),
        Format::Yaml => load_yaml(text, options),
    };
    loaded.map_err(|err| format!("Failed to load {}: {err}", path.display()))
}
