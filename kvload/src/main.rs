//! Runs randomized `set`, `get` and `delete` traffic against a key-value service and prints
//! latency and failure statistics.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;

use kvload::HttpRemote;
use kvload::config::Config;
use kvload::observability::init_tracing;

/// Load generator for key-value services
#[derive(Debug, FromArgs)]
pub struct Args {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    /// base URL of the key-value service, overrides the configured remote
    #[argh(option, short = 'r')]
    pub remote: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_tracing();

    let config = match args.config {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    tracing::debug!(?config);

    let Some(remote) = args.remote.or(config.remote.clone()) else {
        anyhow::bail!("no remote given, pass `--remote` or set `remote` in the config file");
    };

    let remote = match config.timeout {
        Some(timeout) => HttpRemote::with_timeout(remote, timeout)?,
        None => HttpRemote::new(remote)?,
    };
    let workloads = config.workloads()?;

    kvload::run(remote, workloads, config.duration).await?;

    Ok(())
}
