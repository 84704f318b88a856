//! # Structured Logging
//!
//! Library code in this workspace only emits `tracing` events: registry
//! mutations at `info`, dispatch and commits at `debug`, reverts at `warn`.
//! Whoever embeds the host decides whether and how those events are
//! rendered by installing a subscriber with one of the functions below.
//!
//! Filtering follows `RUST_LOG` when it is set, e.g.
//!
//! ```text
//! RUST_LOG=modular_contracts=debug,modular_protocol=info
//! ```

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Rendering of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines with source locations.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// `"json"` (any case) selects [`LogFormat::Json`]; anything else is
    /// [`LogFormat::Pretty`].
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `default_level` is the filter used when `RUST_LOG` is unset. Returns
/// `false` and changes nothing if a global subscriber already exists.
pub fn init_logging(default_level: &str, format: LogFormat) -> bool {
    let registry = tracing_subscriber::registry().with(filter_or(default_level));

    let result = match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
    };

    match result {
        Ok(()) => {
            tracing::info!(?format, "logging initialized");
            true
        }
        Err(_) => false,
    }
}

/// Route `tracing` output through the test harness's captured writer.
///
/// Every test may call this; only the first call installs anything.
pub fn init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(filter_or("debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

fn filter_or(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
