//! # Toolbox Core - Database Tool Plugin Contract
//!
//! Rust implementation of the toolbox tool layer providing:
//! - A uniform tool contract (configure, initialize, invoke, describe)
//! - An explicit kind registry mapping tool kinds to config decoders
//! - Parameterized SQL tools for SingleStore and MySQL-protocol sources
//! - Manifests for internal listing and for the tool-calling protocol
//! - A prebuilt catalog of default tool configurations per backend
//!
//! ## Architecture
//!
//! ```text
//!   tools document ─→ KindRegistry ─→ ToolConfig ─→ initialize(sources)
//!                                                        │
//!                                                        ▼
//!   caller input ──→ parse_params ──→ Arc<dyn Tool> ──→ invoke ─→ rows
//!                                          │
//!                                          └─→ manifest / protocol_manifest
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod prebuilt;
pub mod sources;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
