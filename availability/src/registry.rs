//! Actor registry
//!
//! Maps the declared type tag of each capability (`fault_type`,
//! `monitor_type`, `operation_type`, `checker_type`) to a constructor. The
//! built-in table is created once per process and never mutated afterwards;
//! harnesses that need extra actor types build their own registry up front.

use shared::{ActionType, ActorConfig};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::actors;
use crate::context::HaContext;
use crate::error::{HaError, HaResult};
use crate::traits::{Attacker, Monitor, Operation, ResultChecker};

pub type AttackerFactory = Arc<dyn Fn(&ActorConfig, &HaContext) -> HaResult<Box<dyn Attacker>> + Send + Sync>;
pub type MonitorFactory = Arc<dyn Fn(&ActorConfig, &HaContext) -> HaResult<Box<dyn Monitor>> + Send + Sync>;
pub type OperationFactory = Arc<dyn Fn(&ActorConfig, &HaContext) -> HaResult<Box<dyn Operation>> + Send + Sync>;
pub type ResultCheckerFactory =
    Arc<dyn Fn(&ActorConfig, &HaContext) -> HaResult<Box<dyn ResultChecker>> + Send + Sync>;

static BUILTIN: OnceLock<ActorRegistry> = OnceLock::new();

/// Type tag to constructor tables, one per capability
#[derive(Clone, Default)]
pub struct ActorRegistry {
    attackers: HashMap<String, AttackerFactory>,
    monitors: HashMap<String, MonitorFactory>,
    operations: HashMap<String, OperationFactory>,
    result_checkers: HashMap<String, ResultCheckerFactory>,
}

impl ActorRegistry {
    /// Registry without any actor types
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every built-in actor type
    pub fn builtin() -> Self {
        actors::register_builtin(Self::empty())
    }

    /// Process-wide built-in registry
    pub fn global() -> &'static ActorRegistry {
        BUILTIN.get_or_init(Self::builtin)
    }

    pub fn with_attacker<F>(mut self, tag: &str, factory: F) -> Self
    where
        F: Fn(&ActorConfig, &HaContext) -> HaResult<Box<dyn Attacker>> + Send + Sync + 'static,
    {
        self.attackers.insert(tag.to_string(), Arc::new(factory));
        self
    }

    pub fn with_monitor<F>(mut self, tag: &str, factory: F) -> Self
    where
        F: Fn(&ActorConfig, &HaContext) -> HaResult<Box<dyn Monitor>> + Send + Sync + 'static,
    {
        self.monitors.insert(tag.to_string(), Arc::new(factory));
        self
    }

    pub fn with_operation<F>(mut self, tag: &str, factory: F) -> Self
    where
        F: Fn(&ActorConfig, &HaContext) -> HaResult<Box<dyn Operation>> + Send + Sync + 'static,
    {
        self.operations.insert(tag.to_string(), Arc::new(factory));
        self
    }

    pub fn with_result_checker<F>(mut self, tag: &str, factory: F) -> Self
    where
        F: Fn(&ActorConfig, &HaContext) -> HaResult<Box<dyn ResultChecker>> + Send + Sync + 'static,
    {
        self.result_checkers.insert(tag.to_string(), Arc::new(factory));
        self
    }

    pub fn attacker(&self, tag: &str) -> HaResult<AttackerFactory> {
        self.attackers
            .get(tag)
            .cloned()
            .ok_or_else(|| unknown(ActionType::Attacker, tag))
    }

    pub fn monitor(&self, tag: &str) -> HaResult<MonitorFactory> {
        self.monitors
            .get(tag)
            .cloned()
            .ok_or_else(|| unknown(ActionType::Monitor, tag))
    }

    pub fn operation(&self, tag: &str) -> HaResult<OperationFactory> {
        self.operations
            .get(tag)
            .cloned()
            .ok_or_else(|| unknown(ActionType::Operation, tag))
    }

    pub fn result_checker(&self, tag: &str) -> HaResult<ResultCheckerFactory> {
        self.result_checkers
            .get(tag)
            .cloned()
            .ok_or_else(|| unknown(ActionType::ResultChecker, tag))
    }

    /// Registered tags for a capability, sorted
    pub fn types(&self, action: ActionType) -> Vec<String> {
        let mut tags: Vec<String> = match action {
            ActionType::Attacker => self.attackers.keys().cloned().collect(),
            ActionType::Monitor => self.monitors.keys().cloned().collect(),
            ActionType::Operation => self.operations.keys().cloned().collect(),
            ActionType::ResultChecker => self.result_checkers.keys().cloned().collect(),
        };
        tags.sort();
        tags
    }
}

fn unknown(action: ActionType, tag: &str) -> HaError {
    HaError::UnknownActorType {
        capability: action.to_string(),
        actor_type: tag.to_string(),
    }
}

/// Read the type tag an actor config declares for `action`
pub fn type_tag(action: ActionType, cfg: &ActorConfig) -> HaResult<&str> {
    cfg.str_field(action.type_field())
        .ok_or_else(|| HaError::missing(action.type_field()))
}
