//! Tracing subscriber setup.
//!
//! `DEALIAS_LOG` controls the level: "trace", "debug", "info", "warn", "error"
//! or a full tracing filter spec like "dealias_core=trace,dealias_cli=warn".

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "DEALIAS_LOG";

/// Crates whose events are shown for a plain level.
const TARGETS: [&str; 3] = ["dealias_core", "dealias_common", "dealias_cli"];

/// Level used when neither the environment nor the config set one.
const DEFAULT_LEVEL: &str = "info";

/// Build the filter directive from the environment value, then the configured
/// value, then the default level.
pub fn filter_spec(env: Option<&str>, configured: Option<&str>) -> String {
    let value = env
        .filter(|v| !v.trim().is_empty())
        .or(configured)
        .unwrap_or(DEFAULT_LEVEL);

    if is_plain_level(value) {
        let level = value.to_ascii_lowercase();
        TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    } else {
        value.to_string()
    }
}

/// Install a stderr fmt subscriber. `configured` is the config file's `log`
/// value; `DEALIAS_LOG` wins over it.
pub fn init_tracing(configured: Option<&str>) {
    let env = std::env::var(LOG_ENV).ok();
    let filter = filter_spec(env.as_deref(), configured);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_level_expands_to_targets() {
        assert_eq!(
            filter_spec(Some("DEBUG"), None),
            "dealias_core=debug,dealias_common=debug,dealias_cli=debug"
        );
    }

    #[test]
    fn test_full_spec_is_kept() {
        assert_eq!(
            filter_spec(Some("dealias_core=trace"), Some("warn")),
            "dealias_core=trace"
        );
    }

    #[test]
    fn test_env_beats_config_beats_default() {
        assert_eq!(
            filter_spec(None, Some("warn")),
            "dealias_core=warn,dealias_common=warn,dealias_cli=warn"
        );
        assert_eq!(
            filter_spec(Some("  "), None),
            "dealias_core=info,dealias_common=info,dealias_cli=info"
        );
    }
}
