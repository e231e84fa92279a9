use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. Filter comes from `RUST_LOG`,
/// defaulting to `info`. Output goes to stderr so `--json` output on stdout
/// stays machine-readable.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
