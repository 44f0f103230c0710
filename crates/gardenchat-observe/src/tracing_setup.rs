//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! use gardenchat_observe::tracing_setup::{LogOptions, init_tracing};
//!
//! // Warnings only, no span export
//! init_tracing(&LogOptions::from_verbosity(0, false)).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use std::sync::OnceLock;

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// How the subscriber should be configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Filter directive used when `RUST_LOG` is not set.
    pub default_filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Bridge spans to OpenTelemetry (stdout exporter).
    pub otel: bool,
    /// Stdout carries machine-readable output; nothing else may write there.
    pub stdout_reserved: bool,
}

impl LogOptions {
    /// Map CLI verbosity flags to a filter.
    ///
    /// `quiet` only applies at verbosity 0.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let default_filter = match verbose {
            0 if quiet => "error",
            0 => "warn",
            1 => "info,gardenchat=debug",
            2 => "debug",
            _ => "trace",
        };
        Self {
            default_filter: default_filter.to_string(),
            json: false,
            otel: false,
            stdout_reserved: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_otel(mut self, otel: bool) -> Self {
        self.otel = otel;
        self
    }

    pub fn with_stdout_reserved(mut self, reserved: bool) -> Self {
        self.stdout_reserved = reserved;
        self
    }

    /// Whether spans go to the stdout exporter. Never while stdout is reserved.
    pub fn exports_spans(&self) -> bool {
        self.otel && !self.stdout_reserved
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Initialize the global tracing subscriber.
///
/// - Logs go to stderr so streamed chat output on stdout stays clean.
/// - `RUST_LOG` takes precedence over the verbosity-derived filter.
/// - When `otel` is set, spans (including the `gen_ai.*` chat spans) are
///   exported to stdout through OpenTelemetry, unless stdout is reserved.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(options: &LogOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = options.env_filter();
    let otel = options.exports_spans();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(otel)
        .with_span_events(if otel { FmtSpan::CLOSE } else { FmtSpan::NONE });
    let fmt_layer = if options.json {
        fmt_layer.json().boxed()
    } else {
        fmt_layer.boxed()
    };

    if otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("gardenchat");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
        if options.otel {
            tracing::warn!("OpenTelemetry export disabled: stdout carries JSON output");
        }
    }

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// No-op when OTel was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        eprintln!("Warning: OTel tracer provider shutdown error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_filter() {
        assert_eq!(LogOptions::from_verbosity(0, true).default_filter, "error");
        assert_eq!(LogOptions::from_verbosity(0, false).default_filter, "warn");
        assert_eq!(
            LogOptions::from_verbosity(1, false).default_filter,
            "info,gardenchat=debug"
        );
        assert_eq!(LogOptions::from_verbosity(3, true).default_filter, "trace");
    }

    #[test]
    fn builder_flags() {
        let options = LogOptions::from_verbosity(0, false).with_json(true).with_otel(true);
        assert!(options.json);
        assert!(options.otel);
        assert!(options.exports_spans());
    }

    #[test]
    fn reserved_stdout_disables_span_export() {
        let options = LogOptions::from_verbosity(0, false)
            .with_otel(true)
            .with_stdout_reserved(true);
        assert!(options.otel);
        assert!(!options.exports_spans());
        assert!(!LogOptions::from_verbosity(0, false).with_stdout_reserved(true).exports_spans());
    }
}
