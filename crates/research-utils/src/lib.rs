//! Shared utilities for the company research service
//!
//! This crate provides common functionality used across the workspace,
//! including logging setup and process-level configuration.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, Environment};
pub use logging::{LogFormat, init_tracing};
