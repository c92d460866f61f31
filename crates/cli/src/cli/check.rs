use std::path::PathBuf;

use clap::Args;
use dealias_common::Config;
use dealias_core::openapi::{AliasReport, LoadOptions, PassSummary, dealias, find_aliases};
use serde_json::json;
use tracing::debug;

use super::common::{load_document, read_input};
use super::run_command;

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Input document (.json, .yaml or .yml); `-` reads stdin
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    /// Load identical fragments as separate nodes
    #[arg(long)]
    pub no_intern: bool,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Exit code 0 when no schema node is shared, 1 otherwise.
pub fn run(args: &CheckArgs, config: &Config) -> i32 {
    run_command(|| {
        let options = LoadOptions {
            intern_fragments: config.intern_fragments && !args.no_intern,
        };
        let text = read_input(&args.input)?;
        let mut document = load_document(&args.input, &text, options)?;
        let report = find_aliases(&document);
        debug!(
            positions = report.positions,
            shared = report.aliases.len(),
            "Scanned document."
        );

        // Dry run on the in-memory copy; nothing is written.
        let summary = dealias(&mut document).map_err(|err| err.to_string())?;

        if args.json {
            println!("{}", render_json(&report, &summary));
        } else {
            print!("{}", render_text(&report, &summary));
        }
        Ok(i32::from(!report.is_clean()))
    })
}

fn render_text(report: &AliasReport, summary: &PassSummary) -> String {
    let mut out = String::new();
    if report.is_clean() {
        out.push_str(&format!(
            "ok: {} schema positions, none shared\n",
            report.positions
        ));
    }
    for (id, pointers) in &report.aliases {
        out.push_str(&format!(
            "schema {id} is shared by {} positions:\n",
            pointers.len()
        ));
        for pointer in pointers {
            out.push_str(&format!("  {pointer}\n"));
        }
    }
    out.push_str(&format!(
        "normalize would make {} copies across {} roots\n",
        summary.clones, summary.roots
    ));
    for reference in &summary.dangling_refs {
        out.push_str(&format!("dangling reference: {reference}\n"));
    }
    out
}

fn render_json(report: &AliasReport, summary: &PassSummary) -> serde_json::Value {
    let shared: Vec<_> = report
        .aliases
        .iter()
        .map(|(id, pointers)| json!({ "node": id.index(), "positions": pointers }))
        .collect();
    json!({
        "clean": report.is_clean(),
        "positions": report.positions,
        "shared": shared,
        "copies": summary.clones,
        "dangling_refs": summary.dangling_refs,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SHARED_ID: &str = r#"
openapi: 3.1.0
paths: {}
components:
  schemas:
    A:
      properties:
        id: { type: string }
    B:
      properties:
        code: { type: string }
"#;

    fn write_input(temp_dir: &TempDir) -> PathBuf {
        let input = temp_dir.path().join("api.yaml");
        fs::write(&input, SHARED_ID).unwrap();
        input
    }

    #[test]
    fn test_check_reports_sharing() {
        let temp_dir = TempDir::new().unwrap();
        let args = CheckArgs {
            input: write_input(&temp_dir),
            no_intern: false,
            json: false,
        };
        assert_eq!(run(&args, &Config::default()), 1);
    }

    #[test]
    fn test_check_without_interning_is_clean() {
        let temp_dir = TempDir::new().unwrap();
        let args = CheckArgs {
            input: write_input(&temp_dir),
            no_intern: true,
            json: true,
        };
        assert_eq!(run(&args, &Config::default()), 0);
    }

    #[test]
    fn test_render_text() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_input(&temp_dir);
        let text = fs::read_to_string(&input).unwrap();
        let mut document = load_document(&input, &text, LoadOptions::default()).unwrap();
        let report = find_aliases(&document);
        let summary = dealias(&mut document).unwrap();

        let rendered = render_text(&report, &summary);
        assert!(rendered.contains("is shared by 2 positions"), "{rendered}");
        assert!(rendered.contains("  #/components/schemas/A/properties/id\n"));
        assert!(rendered.contains("  #/components/schemas/B/properties/code\n"));

        assert!(rendered.contains("normalize would make 1 copies"), "{rendered}");

        let value = render_json(&report, &summary);
        assert_eq!(value["clean"], false);
        assert_eq!(value["copies"], 1);
        assert_eq!(value["shared"][0]["positions"].as_array().unwrap().len(), 2);
    }
}
