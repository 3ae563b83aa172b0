//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use pacer_types::DelayPolicy;

/// Fetch each URL in order, holding successive requests at least a fixed
/// delay apart. Prints `<offset_ms> <status|error> <url>` per URL.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "pacer", version)]
#[command(after_help = "Environment: PACER_DELAY_MS, PACER_POLICY, PACER_CONFIG, RUST_LOG")]
pub(crate) struct Cli {
    /// Minimum spacing between requests in milliseconds
    #[arg(long, value_name = "N")]
    pub(crate) delay_ms: Option<u64>,

    /// start_to_start (default) or finish_to_start
    #[arg(long, value_name = "POLICY")]
    pub(crate) policy: Option<DelayPolicy>,

    /// Config file (default: ~/.pacer/config.toml)
    #[arg(long, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,

    /// URLs to fetch, absolute or relative to `http.base_url`
    #[arg(required = true, value_name = "URL")]
    pub(crate) urls: Vec<String>,
}
