use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v` flags.
pub fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn,jr=info,jrctl=info",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}
