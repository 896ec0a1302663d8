use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LoggingConfig;

/// Connection-level crates stay at `info` unless asked for by name.
const QUIET_DEPS: &str = "hyper=info,hyper_util=info,h2=info,rustls=info";

/// Filter directive for the given `-v` count.
///
/// Without `-v` the configured level applies. `-vv` (debug) enables the
/// wire log target; `-vvv` traces everything, dependencies included.
#[must_use]
pub fn directive(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_owned(),
        1 => "info".to_owned(),
        2 => format!("debug,{QUIET_DEPS}"),
        _ => "trace".to_owned(),
    }
}

/// Install the global subscriber: stderr always, plus `config.file` when set.
///
/// `RUST_LOG`, when set, replaces the `-v`/config derived filter. The
/// returned guard flushes the file writer on drop.
///
/// # Errors
/// Returns an error if the filter is invalid, the log file cannot be
/// opened, or a subscriber is already installed.
pub fn init(config: &LoggingConfig, verbose: u8) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive(verbose, &config.level))
            .with_context(|| format!("invalid log level '{}'", config.level))?,
    };

    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn directive_follows_verbosity() {
        assert_eq!(directive(0, "warn"), "warn");
        assert_eq!(directive(0, "gateway_request=info"), "gateway_request=info");
        assert_eq!(directive(1, "warn"), "info");
        assert!(directive(2, "warn").starts_with("debug,"));
        assert_eq!(directive(3, "warn"), "trace");
        assert_eq!(directive(7, "warn"), "trace");
    }

    #[test]
    fn directives_parse() {
        for v in 0..=3 {
            EnvFilter::try_new(directive(v, "warn")).unwrap();
        }
    }
}
