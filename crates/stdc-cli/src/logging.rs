//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Warn once when running on a big-endian host.
pub fn warn_if_big_endian() {
    if stdc_dtype::endian::HOST_NEEDS_SWAP {
        tracing::warn!(
            "big-endian host detected; safetensors payloads are little-endian and will be byte-swapped"
        );
    }
}
