//! Shared library for cross-cutting concerns in auth-platform Rust services.
//!
//! This crate provides centralized implementations for:
//! - Tracing subscriber configuration (env filter, JSON or text output)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod tracing_config;

pub use tracing_config::{init_tracing, try_init_tracing, LogFormat, TracingConfig, TracingInitError};
