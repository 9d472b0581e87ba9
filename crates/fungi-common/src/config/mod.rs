//! Configuration structs

mod client_config;

pub use client_config::{
    AuthConfig, ClientConfig, ConfigError, KEEP_ALIVE_LATENCY_MAX, KEEP_ALIVE_LATENCY_MIN,
};
