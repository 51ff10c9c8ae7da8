//! Tracing subscriber for the command-line front end.
//!
//! Events go to stderr so stdout carries only command output. The level is
//! taken from `RUST_LOG` and defaults to `warn`.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
