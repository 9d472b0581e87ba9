//! # fungi-common
//!
//! Shared utilities for the Fungi client: configuration loading and telemetry.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    AuthConfig, ClientConfig, ConfigError, KEEP_ALIVE_LATENCY_MAX, KEEP_ALIVE_LATENCY_MIN,
};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
