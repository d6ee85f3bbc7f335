//! ## brandvakt-telemetry::logging
//! **Structured logging with tracing and OpenTelemetry key/values**
//!
//! Security events are emitted inside a `security_event` span so collectors can pick
//! them out of ordinary diagnostics by span name and `event_type`.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` overrides `level` when set.
    ///
    /// Fails if a global subscriber is already installed or `level` is not a valid
    /// filter directive.
    pub fn init(level: &str) -> Result<(), InitError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(level)?,
        };
        fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE)
            .try_init()
    }

    pub fn log_event(event_type: &str, metadata: &[KeyValue]) {
        let span = info_span!(
            "security_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        let _entered = span.enter();
        tracing::info!(metadata = %render(metadata), "Security event occurred");
    }

    /// Same as [`EventLogger::log_event`], at `warn`.
    pub fn alert(event_type: &str, metadata: &[KeyValue]) {
        let span = info_span!(
            "security_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        let _entered = span.enter();
        tracing::warn!(metadata = %render(metadata), "Security alert raised");
    }
}

fn render(metadata: &[KeyValue]) -> String {
    metadata
        .iter()
        .map(|kv| format!("{}={}", kv.key.as_str(), kv.value))
        .collect::<Vec<_>>()
        .join(" ")
}
