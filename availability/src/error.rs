//! Availability-core error types

use shared::SharedError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HaError {
    #[error("No such {capability} type: {actor_type}")]
    UnknownActorType { capability: String, actor_type: String },

    #[error("No such {capability} instance of key - {key}")]
    UnknownActorKey { capability: String, key: String },

    #[error("No {capability} section configured for this scenario")]
    NotConfigured { capability: String },

    #[error("Missing configuration key: {field}")]
    MissingConfigKey { field: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Unknown node reference: {node}")]
    UnknownNode { node: String },

    #[error("Command failed ({exit_code}): {command}")]
    CommandFailed { command: String, exit_code: i32, stderr: String },

    #[error("Actor setup failed for {key}: {reason}")]
    ActorSetupFailed { key: String, reason: String },

    #[error("Monitor worker {worker} did not report within {timeout:?}")]
    MonitorJoin { worker: String, timeout: Duration },

    #[error("Scenario has not been set up")]
    NotSetUp,

    #[error("Scenario failed: sla_pass = {sla_pass}")]
    ScenarioFailed { sla_pass: u8 },

    #[error("Actor panicked: {message}")]
    Panicked { message: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl HaError {
    pub fn missing(field: &str) -> Self {
        HaError::MissingConfigKey {
            field: field.to_string(),
        }
    }

    pub fn invalid(field: &str, value: impl ToString) -> Self {
        HaError::InvalidConfig {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Configuration errors abort a step or Director construction
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HaError::UnknownActorType { .. }
                | HaError::UnknownActorKey { .. }
                | HaError::NotConfigured { .. }
                | HaError::MissingConfigKey { .. }
                | HaError::InvalidConfig { .. }
                | HaError::UnknownNode { .. }
                | HaError::SharedError(_)
        )
    }
}

pub type HaResult<T> = Result<T, HaError>;
