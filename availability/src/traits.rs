//! Trait definitions with mockall annotations for testing
//!
//! The four actor capabilities driven by the director, plus the command
//! execution boundary every built-in actor talks through. Concrete actors are
//! looked up by type tag in the [`ActorRegistry`](crate::registry::ActorRegistry).

use shared::{IntermediateVariables, NodeConfig, TargetData};
use std::sync::Arc;

use crate::error::HaResult;

/// Captured result of one shell command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Fault injector acting on the system under test
#[mockall::automock]
#[async_trait::async_trait]
pub trait Attacker: Send + Sync {
    /// Prepare the attacker; may record target presence in `data`
    ///
    /// A zero entry written to `data` marks the attacked target as absent,
    /// which fails the scenario regardless of what the monitors measure.
    async fn setup(&mut self, data: &mut TargetData) -> HaResult<()>;

    /// Inject the fault
    async fn inject_fault(&mut self) -> HaResult<()>;

    /// Undo the fault; errors are logged by the caller, never propagated
    async fn recover(&mut self) -> HaResult<()>;
}

/// Probe polled repeatedly by a monitor worker
#[mockall::automock]
#[async_trait::async_trait]
pub trait Monitor: Send + Sync {
    async fn setup(&mut self) -> HaResult<()>;

    /// One probe of the target
    ///
    /// `Ok(true)` means the target answered, `Ok(false)` and `Err(_)` are both
    /// counted as an outage observation.
    async fn one_request(&mut self) -> HaResult<bool>;

    /// Label used when monitor results are stored into the run result
    fn result_label(&self) -> Option<String>;
}

/// Auxiliary, non-fault action with an undo
#[mockall::automock]
#[async_trait::async_trait]
pub trait Operation: Send + Sync {
    async fn setup(&mut self) -> HaResult<()>;

    /// Run the operation, optionally publishing values for later steps
    async fn run(&mut self, variables: &mut IntermediateVariables) -> HaResult<()>;

    async fn rollback(&mut self) -> HaResult<()>;
}

/// Post-condition evaluated against an expected value
#[mockall::automock]
#[async_trait::async_trait]
pub trait ResultChecker: Send + Sync {
    async fn setup(&mut self) -> HaResult<()>;

    async fn verify(&mut self) -> HaResult<bool>;
}

/// Shell command execution on a local or remote host
#[mockall::automock]
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` through a shell, feeding `stdin` when given
    async fn execute(&self, command: &str, stdin: Option<String>) -> HaResult<CommandOutput>;

    /// Human readable target, e.g. `local` or `root@10.20.0.5`
    fn target(&self) -> String;
}

/// Factory for command executors, one per node reference
#[mockall::automock]
pub trait Connector: Send + Sync {
    /// `None` selects local execution on the harness host
    fn connect(&self, node: Option<NodeConfig>) -> Arc<dyn CommandExecutor>;
}
