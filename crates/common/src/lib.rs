//! Shared configuration and logging setup for the dealias tools.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, OutputFormat};
pub use logging::{LOG_ENV, filter_spec, init_tracing};
