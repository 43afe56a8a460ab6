//! Tracing subscriber and OpenTelemetry pipeline setup.
//!
//! Call [`init_tracing`] once at startup, before the first session is
//! requested.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL (e.g. `http://localhost:4318`). When set the OTLP HTTP exporter is activated. |
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `ARPLACE_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//!
//! # Example
//!
//! ```rust,no_run
//! // Hold the guard for as long as the app runs.
//! let _guard = arplace_runtime::telemetry::init_tracing("arplace");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global `tracing` subscriber, with OTLP span export when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set and plain console output otherwise.
///
/// The returned [`TracerProviderGuard`] must be held for the lifetime of the
/// app; dropping it flushes pending spans.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var("ARPLACE_LOG_FORMAT").as_deref() == Ok("json");

    let provider = build_provider(service_name);
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("arplace")));

    let registry = tracing_subscriber::registry().with(env_filter).with(otel_layer);
    if use_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    }

    TracerProviderGuard(provider)
}

// ────────────────────────────────────────────────────────────────────────────
// RAII guard
// ────────────────────────────────────────────────────────────────────────────

/// Shuts the [`SdkTracerProvider`] down on drop, flushing pending spans.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[arplace] OpenTelemetry provider shutdown error: {e}");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// `None` when the endpoint variable is absent or the exporter cannot be
/// built; the caller then logs to the console only.
fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[arplace] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Simple exporter: the host may not run an async runtime that a batch
    // exporter could spawn onto.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_provider_returns_none_without_endpoint() {
        // SAFETY: single-threaded test; no other thread reads this env-var.
        unsafe { std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
        assert!(build_provider("arplace-test").is_none());
    }

    #[test]
    fn guard_without_provider_drops_cleanly() {
        drop(TracerProviderGuard(None));
    }
}
