//! Availability test orchestration
//!
//! Runs attacker, monitor, operation and result checker actors against a
//! system under test following a scenario's ordered step list, measures
//! outages with concurrent monitor workers, and rolls destructive actions
//! back in reverse order at teardown.

pub mod actors;
pub mod context;
pub mod core;
pub mod error;
pub mod registry;
pub mod services;
pub mod traits;

pub use context::HaContext;
pub use crate::core::{Director, MonitorMgr, MonitorResult, ScenarioGeneral, ScenarioState};
pub use error::{HaError, HaResult};
pub use registry::ActorRegistry;
pub use traits::*;
