#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

//! `authorized`: run one OAuth2-authenticated request against the API
//! gateway and print the outcome as JSON.

mod cli;
mod config;
mod logging;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::Cli;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed.
    let (config, _log_guard) = match bootstrap(&cli) {
        Ok(v) => v,
        Err(e) => return output::fail(&format!("{e:#}")),
    };

    let raw = match cli.raw_request() {
        Ok(raw) => raw,
        Err(e) => return output::fail(&format!("{e:#}")),
    };

    let settings = config.gateway_settings(&cli.oauth_client_secret, cli.verbose);
    let store = config.secret_store.build();

    match gateway_request::run(&settings, raw, &store).await {
        Ok(result) => output::succeed(&result),
        Err(e) => {
            tracing::error!(error = %e, "Request failed");
            output::fail(&output::failure_message(&e))
        }
    }
}

fn bootstrap(cli: &Cli) -> Result<(AppConfig, Option<WorkerGuard>)> {
    let config = AppConfig::load(cli.config.as_deref(), &cli.overrides())?;
    let guard = logging::init(&config.logging, cli.verbose)?;
    tracing::debug!(config = ?config, "Configuration loaded");
    Ok((config, guard))
}
