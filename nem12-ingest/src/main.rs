use anyhow::{bail, Result};
use nem12_ingest::{app, config::AppConfig, metrics_server, observability};
use std::env;

/// Converts a NEM12 file into SQL insert statements on stdout.
///
/// Usage:
///   nem12-ingest <nem12_file_path>
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        bail!("usage: nem12-ingest <nem12_file_path>");
    }
    let file_path = &args[1];

    // Load configuration (NEM12_CONFIG can point to a specific file).
    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    app::run_file(&cfg, file_path, tokio::io::stdout()).await?;

    Ok(())
}
