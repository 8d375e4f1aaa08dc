// Path: crates/corenet-telemetry/src/init.rs
//! Structured logging bootstrap. A node can run foregrounded in a
//! developer's terminal or backgrounded under a process manager, and those
//! two cases want different `tracing-subscriber` formatters: one-JSON-
//! object-per-line for an aggregator, ANSI-colored human text for a TTY.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Which `tracing-subscriber` formatter [`init_tracing`] installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line on stderr, for log aggregators.
    Json,
    /// ANSI-colored human-readable text on stderr, for a developer's terminal.
    Pretty,
}

impl LogFormat {
    /// Parses a `--log-format` value. Anything unrecognized falls back to
    /// [`LogFormat::Json`] rather than refusing to start.
    pub fn parse(s: &str) -> LogFormat {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" | "human" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

impl Default for LogFormat {
    fn default() -> LogFormat {
        LogFormat::Json
    }
}

/// Installs the global `tracing` subscriber and bridges the `log` crate so
/// dependencies that haven't migrated to `tracing` still surface. The level
/// filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = Registry::default().with(filter);

    tracing_log::LogTracer::init()?;

    match format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339());
            tracing::subscriber::set_global_default(registry.with(fmt_layer))?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(true)
                .with_timer(fmt::time::UtcTime::rfc_3339());
            tracing::subscriber::set_global_default(registry.with(fmt_layer))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_and_defaults_to_json() {
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("text"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("nonsense"), LogFormat::Json);
    }
}
