use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "WASM_ASSET_LOG";

/// Installs the stderr subscriber. `WASM_ASSET_LOG` takes precedence over the
/// verbosity flag.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
