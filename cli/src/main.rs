//! Pacer CLI - fetch URLs through a rate-limited client.
//!
//! ```text
//! main() -> Cli::parse -> resolve config (flags > env > file > defaults)
//!        -> submit every URL up front -> await in order -> print one line each
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); results go to stdout.

mod args;

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pacer_client::{ClientError, Method, RateLimitedClient, Reply};
use pacer_config::{PacerConfig, ResolvedConfig};

use crate::args::Cli;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    tracing::info!(
        delay_ms = config.executor.delay().as_millis() as u64,
        policy = %config.executor.policy(),
        urls = cli.urls.len(),
        "Starting"
    );

    let mut stdout = io::stdout().lock();
    let all_ok = fetch_all(&cli.urls, config, &mut stdout).await?;
    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Command-line flags win over the environment, which wins over the file.
fn resolve_config(cli: &Cli) -> Result<ResolvedConfig> {
    let loaded = match &cli.config {
        Some(path) => PacerConfig::load_from(path),
        None => PacerConfig::load(),
    }
    .context("failed to load config")?;

    let mut resolved = loaded
        .unwrap_or_default()
        .resolve()
        .context("invalid configuration")?;

    if let Some(delay_ms) = cli.delay_ms {
        resolved.executor = resolved
            .executor
            .with_delay(Duration::from_millis(delay_ms));
    }
    if let Some(policy) = cli.policy {
        resolved.executor = resolved.executor.with_policy(policy);
    }
    Ok(resolved)
}

/// Submit every URL, then print each outcome in submission order.
///
/// Returns whether every request succeeded.
async fn fetch_all<W: Write>(urls: &[String], config: ResolvedConfig, out: &mut W) -> Result<bool> {
    let client = RateLimitedClient::new(config.executor, config.http)
        .context("failed to build HTTP client")?;

    let started = Instant::now();
    let pending: Vec<_> = urls
        .iter()
        .map(|url| (url, client.submit(Method::GET, url, None)))
        .collect();

    let mut all_ok = true;
    for (url, submitted) in pending {
        let outcome = match submitted {
            Ok(reply) => reply.await,
            Err(err) => Err(err),
        };
        let offset_ms = started.elapsed().as_millis();
        all_ok &= outcome.is_ok();
        writeln!(out, "{}", format_line(offset_ms, url, &outcome))
            .context("failed to write output")?;
    }
    out.flush().context("failed to write output")?;
    Ok(all_ok)
}

fn format_line(offset_ms: u128, url: &str, outcome: &Result<Reply, ClientError>) -> String {
    match outcome {
        Ok(reply) => format!("{offset_ms} {} {url}", reply.status.as_u16()),
        Err(err) => match err.status() {
            Some(status) => format!("{offset_ms} {} {url}", status.as_u16()),
            None => format!("{offset_ms} error {url}: {err}"),
        },
    }
}
