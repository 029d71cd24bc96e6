//! Action players and rollbackers
//!
//! A player performs the primary action of the actor a step refers to. Only
//! attacker and operation steps get a rollbacker, which undoes that action
//! during teardown.

use async_trait::async_trait;
use shared::{process_warn, IntermediateVariables, ProcessId};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::managers::SharedSlot;
use super::monitor_mgr::SharedGroup;
use crate::error::HaResult;
use crate::traits::{Attacker, Operation, ResultChecker};

/// Intermediate variables shared by every operation of one run
pub type SharedVariables = Arc<Mutex<IntermediateVariables>>;

#[mockall::automock]
#[async_trait]
pub trait ActionPlayer: Send {
    async fn action(&mut self) -> HaResult<()>;

    /// `capability/key` of the driven actor
    fn describe(&self) -> String;
}

#[mockall::automock]
#[async_trait]
pub trait ActionRollbacker: Send {
    /// Undo the action; the director logs failures and keeps going
    async fn rollback(&mut self) -> HaResult<()>;

    fn describe(&self) -> String;
}

fn skip_unusable(description: &str) {
    process_warn!(
        ProcessId::current(),
        "⚠️ Skipping {}: actor setup failed",
        description
    );
}

pub struct AttackerPlayer {
    slot: SharedSlot<dyn Attacker>,
    key: String,
}

impl AttackerPlayer {
    pub fn new(key: &str, slot: SharedSlot<dyn Attacker>) -> Self {
        Self {
            slot,
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl ActionPlayer for AttackerPlayer {
    async fn action(&mut self) -> HaResult<()> {
        let mut slot = self.slot.lock().await;
        if !slot.usable {
            skip_unusable(&self.describe());
            return Ok(());
        }
        slot.actor.inject_fault().await
    }

    fn describe(&self) -> String {
        format!("attacker/{}", self.key)
    }
}

pub struct MonitorPlayer {
    group: SharedGroup,
    key: String,
}

impl MonitorPlayer {
    pub fn new(key: &str, group: SharedGroup) -> Self {
        Self {
            group,
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl ActionPlayer for MonitorPlayer {
    async fn action(&mut self) -> HaResult<()> {
        self.group.lock().await.start_monitor();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("monitor/{}", self.key)
    }
}

pub struct OperationPlayer {
    slot: SharedSlot<dyn Operation>,
    key: String,
    variables: SharedVariables,
}

impl OperationPlayer {
    pub fn new(key: &str, slot: SharedSlot<dyn Operation>, variables: SharedVariables) -> Self {
        Self {
            slot,
            key: key.to_string(),
            variables,
        }
    }
}

#[async_trait]
impl ActionPlayer for OperationPlayer {
    async fn action(&mut self) -> HaResult<()> {
        let mut slot = self.slot.lock().await;
        if !slot.usable {
            skip_unusable(&self.describe());
            return Ok(());
        }
        let mut variables = self.variables.lock().await;
        slot.actor.run(&mut variables).await
    }

    fn describe(&self) -> String {
        format!("operation/{}", self.key)
    }
}

/// Runs the checker and records its verdict on the slot
pub struct ResultCheckerPlayer {
    slot: SharedSlot<dyn ResultChecker>,
    key: String,
}

impl ResultCheckerPlayer {
    pub fn new(key: &str, slot: SharedSlot<dyn ResultChecker>) -> Self {
        Self {
            slot,
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl ActionPlayer for ResultCheckerPlayer {
    async fn action(&mut self) -> HaResult<()> {
        let mut slot = self.slot.lock().await;
        if !slot.usable {
            skip_unusable(&self.describe());
            slot.outcome = Some(false);
            return Ok(());
        }
        let verdict = slot.actor.verify().await;
        match verdict {
            Ok(passed) => {
                slot.outcome = Some(passed);
                Ok(())
            }
            Err(e) => {
                slot.outcome = Some(false);
                Err(e)
            }
        }
    }

    fn describe(&self) -> String {
        format!("resultchecker/{}", self.key)
    }
}

pub struct AttackerRollbacker {
    slot: SharedSlot<dyn Attacker>,
    key: String,
}

impl AttackerRollbacker {
    pub fn new(key: &str, slot: SharedSlot<dyn Attacker>) -> Self {
        Self {
            slot,
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl ActionRollbacker for AttackerRollbacker {
    async fn rollback(&mut self) -> HaResult<()> {
        let mut slot = self.slot.lock().await;
        if !slot.usable {
            return Ok(());
        }
        slot.actor.recover().await
    }

    fn describe(&self) -> String {
        format!("attacker/{}", self.key)
    }
}

pub struct OperationRollbacker {
    slot: SharedSlot<dyn Operation>,
    key: String,
}

impl OperationRollbacker {
    pub fn new(key: &str, slot: SharedSlot<dyn Operation>) -> Self {
        Self {
            slot,
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl ActionRollbacker for OperationRollbacker {
    async fn rollback(&mut self) -> HaResult<()> {
        let mut slot = self.slot.lock().await;
        if !slot.usable {
            return Ok(());
        }
        slot.actor.rollback().await
    }

    fn describe(&self) -> String {
        format!("operation/{}", self.key)
    }
}
