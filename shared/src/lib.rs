//! Shared types for the availability test harness
//!
//! Contains the scenario/context configuration model, config file loading,
//! error types and the process-aware logging helpers used by every crate.

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;

pub use config::{ScriptCatalog, ScriptEntry};
