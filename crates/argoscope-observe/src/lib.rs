//! Observability setup for Argoscope: structured logging to stderr with an
//! optional OpenTelemetry span export.

pub mod tracing_setup;
