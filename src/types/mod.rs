//! Core types for the toolbox core.
//!
//! This module provides foundational types used throughout the system:
//! - **Errors**: Application error taxonomy with thiserror derives
//! - **Config**: Runtime configuration (observability, invocation defaults)

mod config;
mod errors;

pub use config::{Config, InvocationConfig, ObservabilityConfig};
pub use errors::{Error, Result, ResultExt};
