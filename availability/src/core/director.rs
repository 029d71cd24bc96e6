//! Director: owns every actor of one scenario run
//!
//! The director builds one manager per configured scenario section, turns
//! `(type, key)` step references into players and rollbackers, keeps the LIFO
//! stack of pending rollbacks, and combines monitor and checker verdicts.

use futures_util::FutureExt;
use shared::{
    process_debug, process_error, process_info, process_warn, ActionType, ProcessId, ScenarioConfig, TargetData,
};
use std::panic::AssertUnwindSafe;

use super::managers::{AttackerMgr, OperationMgr, ResultCheckerMgr};
use super::monitor::MonitorResult;
use super::monitor_mgr::MonitorMgr;
use super::players::{
    ActionPlayer, ActionRollbacker, AttackerPlayer, AttackerRollbacker, MonitorPlayer, OperationPlayer,
    OperationRollbacker, ResultCheckerPlayer, SharedVariables,
};
use crate::context::HaContext;
use crate::error::{HaError, HaResult};
use crate::registry::ActorRegistry;

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn not_configured(action: ActionType) -> HaError {
    HaError::NotConfigured {
        capability: action.to_string(),
    }
}

pub struct Director {
    attacker_mgr: Option<AttackerMgr>,
    monitor_mgr: Option<MonitorMgr>,
    operation_mgr: Option<OperationMgr>,
    result_checker_mgr: Option<ResultCheckerMgr>,
    data: TargetData,
    execution_steps: Vec<Box<dyn ActionRollbacker>>,
}

impl Director {
    /// Build with the built-in actor registry
    pub async fn new(scenario: &ScenarioConfig, ctx: &HaContext) -> HaResult<Self> {
        Self::with_registry(scenario, ctx, ActorRegistry::global()).await
    }

    /// Build a manager for every section present in the scenario options
    ///
    /// Unknown actor types and missing required keys abort construction.
    pub async fn with_registry(
        scenario: &ScenarioConfig,
        ctx: &HaContext,
        registry: &ActorRegistry,
    ) -> HaResult<Self> {
        let options = &scenario.options;
        let mut data = TargetData::new();

        let attacker_mgr = match &options.attackers {
            Some(configs) => Some(AttackerMgr::init_attackers(configs, ctx, registry, &mut data).await?),
            None => None,
        };
        let monitor_mgr = match &options.monitors {
            Some(configs) => Some(MonitorMgr::init_monitors(configs, ctx, registry).await?),
            None => None,
        };
        let operation_mgr = match &options.operations {
            Some(configs) => Some(OperationMgr::init_operations(configs, ctx, registry).await?),
            None => None,
        };
        let result_checker_mgr = match &options.result_checkers {
            Some(configs) => Some(ResultCheckerMgr::init_result_checkers(configs, ctx, registry).await?),
            None => None,
        };

        process_info!(
            ProcessId::current(),
            "🎬 Director ready for {} scenario",
            scenario.scenario_type
        );

        Ok(Self {
            attacker_mgr,
            monitor_mgr,
            operation_mgr,
            result_checker_mgr,
            data,
            execution_steps: Vec::new(),
        })
    }

    /// Player for a step, `None` when the action type is not recognised
    ///
    /// An unknown key, or a capability the scenario did not configure, is an
    /// error so the step loop can stop.
    pub fn create_action_player(
        &self,
        action_type: &str,
        key: &str,
        variables: SharedVariables,
    ) -> HaResult<Option<Box<dyn ActionPlayer>>> {
        let Some(action) = ActionType::parse(action_type) else {
            process_warn!(
                ProcessId::current(),
                "⚠️ Unsupported action type {} for {}, step skipped",
                action_type,
                key
            );
            return Ok(None);
        };

        let player: Box<dyn ActionPlayer> = match action {
            ActionType::Attacker => {
                let mgr = self.attacker_mgr.as_ref().ok_or_else(|| not_configured(action))?;
                Box::new(AttackerPlayer::new(key, mgr.get(key)?))
            }
            ActionType::Monitor => {
                let mgr = self.monitor_mgr.as_ref().ok_or_else(|| not_configured(action))?;
                Box::new(MonitorPlayer::new(key, mgr.get(key)?))
            }
            ActionType::Operation => {
                let mgr = self.operation_mgr.as_ref().ok_or_else(|| not_configured(action))?;
                Box::new(OperationPlayer::new(key, mgr.get(key)?, variables))
            }
            ActionType::ResultChecker => {
                let mgr = self
                    .result_checker_mgr
                    .as_ref()
                    .ok_or_else(|| not_configured(action))?;
                Box::new(ResultCheckerPlayer::new(key, mgr.get(key)?))
            }
        };
        Ok(Some(player))
    }

    /// Rollbacker for attacker and operation steps, `None` for anything else
    pub fn create_action_rollbacker(&self, action_type: &str, key: &str) -> HaResult<Option<Box<dyn ActionRollbacker>>> {
        let Some(action) = ActionType::parse(action_type).filter(ActionType::has_rollback) else {
            return Ok(None);
        };
        let rollbacker: Box<dyn ActionRollbacker> = match action {
            ActionType::Attacker => {
                let mgr = self.attacker_mgr.as_ref().ok_or_else(|| not_configured(action))?;
                Box::new(AttackerRollbacker::new(key, mgr.get(key)?))
            }
            _ => {
                let mgr = self.operation_mgr.as_ref().ok_or_else(|| not_configured(action))?;
                Box::new(OperationRollbacker::new(key, mgr.get(key)?))
            }
        };
        Ok(Some(rollbacker))
    }

    pub fn push_rollbacker(&mut self, rollbacker: Box<dyn ActionRollbacker>) {
        process_debug!(ProcessId::current(), "Rollback queued: {}", rollbacker.describe());
        self.execution_steps.push(rollbacker);
    }

    pub fn pending_rollbacks(&self) -> usize {
        self.execution_steps.len()
    }

    /// Target inventory recorded by attackers; a zero entry means absent
    pub fn data(&self) -> &TargetData {
        &self.data
    }

    pub fn monitor_mgr(&self) -> Option<&MonitorMgr> {
        self.monitor_mgr.as_ref()
    }

    /// Combined verdict: absent targets, monitor SLAs and result checkers
    ///
    /// A section that is not configured counts as passed.
    pub async fn verify(&self) -> bool {
        let mut passed = true;

        let absent: Vec<&String> = self
            .data
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(target, _)| target)
            .collect();
        if !absent.is_empty() {
            process_warn!(ProcessId::current(), "⚠️ Targets absent on their hosts: {:?}", absent);
            passed = false;
        }

        if let Some(mgr) = &self.monitor_mgr {
            passed &= mgr.verify_sla().await;
        }
        if let Some(mgr) = &self.result_checker_mgr {
            passed &= mgr.verify().await;
        }
        passed
    }

    /// Stop every monitor group and collect worker results
    pub async fn stop_monitors(&self) {
        if let Some(mgr) = &self.monitor_mgr {
            mgr.wait_monitors().await;
        }
    }

    /// Aggregated monitor result, `None` without monitors
    pub async fn monitor_result(&self) -> Option<MonitorResult> {
        match &self.monitor_mgr {
            Some(mgr) => Some(mgr.get_result().await),
            None => None,
        }
    }

    /// `capability/key` of every actor that could not be set up
    pub async fn failed_setups(&self) -> Vec<String> {
        let mut failed = Vec::new();
        if let Some(mgr) = &self.attacker_mgr {
            failed.extend(mgr.failed_setups().iter().cloned());
        }
        if let Some(mgr) = &self.monitor_mgr {
            failed.extend(mgr.failed_setups().await);
        }
        if let Some(mgr) = &self.operation_mgr {
            failed.extend(mgr.failed_setups().iter().cloned());
        }
        if let Some(mgr) = &self.result_checker_mgr {
            failed.extend(mgr.failed_setups().iter().cloned());
        }
        failed
    }

    /// Drain the rollback stack, newest first
    ///
    /// Every rollback is attempted; errors and panics are logged only.
    pub async fn knockoff(&mut self) {
        process_info!(
            ProcessId::current(),
            "🧹 Rolling back {} actions",
            self.execution_steps.len()
        );
        while let Some(mut rollbacker) = self.execution_steps.pop() {
            let description = rollbacker.describe();
            match AssertUnwindSafe(async { rollbacker.rollback().await }).catch_unwind().await {
                Ok(Ok(())) => {
                    process_debug!(ProcessId::current(), "Rolled back {}", description);
                }
                Ok(Err(e)) => {
                    process_error!(ProcessId::current(), "❌ Rollback of {} failed: {}", description, e);
                }
                Err(panic) => {
                    process_error!(
                        ProcessId::current(),
                        "❌ Rollback of {} panicked: {}",
                        description,
                        panic_message(panic.as_ref())
                    );
                }
            }
        }
    }
}
