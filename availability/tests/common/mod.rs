//! Common test utilities and fixtures

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{CallLog, ScenarioBuilder, TestHelpers};
