use tracing_subscriber::EnvFilter;

/// Initialise logging. Debug builds default to `debug`, release builds to
/// `info`. `RUST_LOG` can override the level in debug builds only — this
/// prevents accidental verbose output if the variable happens to be set in
/// the user's environment.
pub fn init() {
    let filter = if cfg!(debug_assertions) {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
