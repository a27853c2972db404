//! Tracing subscriber setup for the CLI.
//!
//! Logs go to stderr so command output on stdout stays pipeable. The filter
//! comes from `FUTUREPROOF_LOG` (same syntax as `RUST_LOG`); without it the
//! level is `info`, or `debug` with `--verbose`.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "FUTUREPROOF_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Directive used when `FUTUREPROOF_LOG` is unset or empty.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "futureproof=debug,info"
    } else {
        "warn,futureproof=info"
    }
}

pub fn build_filter(env_value: Option<&str>, verbose: bool) -> EnvFilter {
    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            eprintln!("Ignoring invalid {}: {}", ENV_LOG, e);
            EnvFilter::new(default_directive(verbose))
        }),
        None => EnvFilter::new(default_directive(verbose)),
    }
}

/// Install the global subscriber. Safe to call once per process; a second
/// call is reported as an error rather than panicking.
pub fn init(verbose: bool, format: LogFormat) -> Result<()> {
    let env_value = std::env::var(ENV_LOG).ok();
    let filter = build_filter(env_value.as_deref(), verbose);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
