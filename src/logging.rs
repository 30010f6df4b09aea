//! Tracing setup for the binaries.

use anyhow::{anyhow, Result};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Installs a stderr fmt subscriber.
///
/// `RUST_LOG` wins when set. Otherwise only warnings are shown, or
/// `info` for this crate when `verbose` is true.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    let filter = if verbose {
        match "pdfrag=info".parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    } else {
        filter
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}
