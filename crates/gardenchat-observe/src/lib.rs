//! Observability setup for gardenchat.

pub mod tracing_setup;
