use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout is reserved for the generated SQL.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nem12_ingest=info,nem12_client=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
