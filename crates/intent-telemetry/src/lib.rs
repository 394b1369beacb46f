//! Structured logging initialization shared by every intent-layer crate.
//!
//! Mirrors the kernel's telemetry bootstrap: JSON records on stderr with an
//! RFC3339 UTC timer, level controlled by an environment variable, and the
//! `log` facade bridged into `tracing` so dependencies that still emit
//! through `log` show up in the same stream.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Either of these may set the log level; `RUST_LOG` takes precedence since
/// it is what most of the surrounding crate ecosystem already honors.
const LEVEL_ENV_VARS: [&str; 2] = ["RUST_LOG", "INTENT_LOG"];

/// Installs the global `tracing` subscriber. Safe to call more than once;
/// later calls are no-ops once a subscriber is already installed.
pub fn init_tracing() -> Result<(), anyhow::Error> {
    let fmt_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let filter = level_from_env();
    let subscriber = Registry::default().with(filter).with(fmt_layer);

    // Both of these fail if something else already installed a global
    // logger/subscriber first; that's fine for a library used inside a
    // larger host process, so we swallow the error rather than panic.
    let _ = tracing_log::LogTracer::init();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed, skipping");
    }
    Ok(())
}

fn level_from_env() -> EnvFilter {
    for var in LEVEL_ENV_VARS {
        if let Ok(value) = std::env::var(var) {
            if let Ok(filter) = EnvFilter::try_new(&value) {
                return filter;
            }
        }
    }
    EnvFilter::new("info")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_from_env_falls_back_to_info_without_env_vars() {
        for var in LEVEL_ENV_VARS {
            std::env::remove_var(var);
        }
        // EnvFilter has no public accessor for its directives, so we only
        // assert that building one from no env vars doesn't panic.
        let _ = level_from_env();
    }

    #[test]
    fn init_tracing_does_not_panic_when_called_twice() {
        assert!(init_tracing().is_ok());
        assert!(init_tracing().is_ok());
    }
}
