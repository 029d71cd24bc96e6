//! General scenario runner
//!
//! Drives one scenario through `created -> setup -> running -> verified ->
//! torn-down`. Steps run strictly one after another in ascending `index`
//! order. The first failing step ends the step loop, but monitors are always
//! stopped and the verdict is always recorded.

use futures_util::FutureExt;
use serde_json::Value;
use shared::{logging, process_error, process_info, process_warn, ProcessId, RunResult, ScenarioConfig, Step};
use std::panic::AssertUnwindSafe;
use uuid::Uuid;

use super::director::{panic_message, Director};
use super::players::SharedVariables;
use crate::context::HaContext;
use crate::error::{HaError, HaResult};
use crate::registry::ActorRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Created,
    SetUp,
    Running,
    Verified,
    TornDown,
}

pub struct ScenarioGeneral {
    run_id: Uuid,
    scenario: ScenarioConfig,
    context: HaContext,
    registry: ActorRegistry,
    director: Option<Director>,
    variables: SharedVariables,
    executed: Vec<Step>,
    state: ScenarioState,
    pass_flag: bool,
}

impl ScenarioGeneral {
    pub fn new(scenario: ScenarioConfig, context: HaContext) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario,
            context,
            registry: ActorRegistry::global().clone(),
            director: None,
            variables: SharedVariables::default(),
            executed: Vec::new(),
            state: ScenarioState::Created,
            pass_flag: false,
        }
    }

    /// Use a custom actor registry (fluent API)
    pub fn with_registry(mut self, registry: ActorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn pass_flag(&self) -> bool {
        self.pass_flag
    }

    pub fn director(&self) -> Option<&Director> {
        self.director.as_ref()
    }

    /// Steps whose action completed, in execution order
    pub fn executed_steps(&self) -> &[Step] {
        &self.executed
    }

    /// Build the director; construction errors propagate
    pub async fn setup(&mut self) -> HaResult<()> {
        let director = Director::with_registry(&self.scenario, &self.context, &self.registry).await?;
        self.director = Some(director);
        self.state = ScenarioState::SetUp;
        process_info!(ProcessId::current(), "🚀 Scenario {} set up", self.run_id);
        Ok(())
    }

    /// Execute the steps and record `sla_pass` into `result`
    ///
    /// Step failures are logged and end the step loop; they are not returned.
    pub async fn run(&mut self, result: &mut RunResult) -> HaResult<()> {
        let Some(director) = self.director.as_mut() else {
            return Err(HaError::NotSetUp);
        };
        self.state = ScenarioState::Running;

        for step in self.scenario.sorted_steps() {
            logging::log_progress(
                ProcessId::current(),
                &format!("Step {}", step.index),
                &format!("{}/{}", step.action_type, step.action_key),
            );
            match run_step(director, &step, self.variables.clone()).await {
                Ok(true) => self.executed.push(step),
                Ok(false) => {}
                Err(e) => {
                    let outcome = if e.is_configuration() { "is misconfigured" } else { "failed" };
                    process_error!(
                        ProcessId::current(),
                        "❌ Step {} {}/{} {}, remaining steps skipped: {}",
                        step.index,
                        step.action_type,
                        step.action_key,
                        outcome,
                        e
                    );
                    break;
                }
            }
        }

        director.stop_monitors().await;
        let verify_result = director.verify().await;

        if let Some(mgr) = director.monitor_mgr() {
            let aggregate = mgr.get_result().await;
            result.insert("monitor".to_string(), serde_json::to_value(aggregate)?);
            mgr.store_result(result).await;
        }
        let failed = director.failed_setups().await;
        if !failed.is_empty() {
            result.insert("failed_setups".to_string(), Value::from(failed));
        }

        result.insert("sla_pass".to_string(), Value::from(u8::from(verify_result)));
        self.pass_flag = verify_result;
        self.state = ScenarioState::Verified;

        if verify_result {
            process_info!(ProcessId::current(), "✅ Scenario {} passed", self.run_id);
        } else {
            process_warn!(ProcessId::current(), "⚠️ Scenario {} failed its SLA", self.run_id);
        }
        Ok(())
    }

    /// Roll back every recorded action, then report the verdict
    ///
    /// Returns `ScenarioFailed` when `run` did not pass.
    pub async fn teardown(&mut self) -> HaResult<()> {
        if let Some(director) = self.director.as_mut() {
            director.knockoff().await;
        }
        self.state = ScenarioState::TornDown;

        if self.pass_flag {
            Ok(())
        } else {
            Err(HaError::ScenarioFailed { sla_pass: 0 })
        }
    }
}

/// Play one step and queue its rollback; `Ok(false)` when the step was skipped
async fn run_step(director: &mut Director, step: &Step, variables: SharedVariables) -> HaResult<bool> {
    let Some(mut player) = director.create_action_player(&step.action_type, &step.action_key, variables)? else {
        return Ok(false);
    };

    match AssertUnwindSafe(async { player.action().await }).catch_unwind().await {
        Ok(outcome) => outcome?,
        Err(panic) => {
            return Err(HaError::Panicked {
                message: panic_message(panic.as_ref()),
            });
        }
    }

    if let Some(rollbacker) = director.create_action_rollbacker(&step.action_type, &step.action_key)? {
        director.push_rollbacker(rollbacker);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockAttacker, MockMonitor, MockOperation};
    use shared::{ActorConfig, ScenarioOptions};
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<String>>>;

    fn registry(log: CallLog, inject_fails: bool) -> ActorRegistry {
        let attacker_log = log.clone();
        let operation_log = log;
        ActorRegistry::empty()
            .with_attacker("AttackerForTest", move |cfg, _| {
                let key = cfg.key().unwrap_or_default().to_string();
                let log = attacker_log.clone();
                let mut attacker = MockAttacker::new();
                attacker.expect_setup().returning(|_| Ok(()));
                attacker.expect_inject_fault().returning(move || {
                    log.lock().unwrap().push(format!("inject:{key}"));
                    if inject_fails {
                        Err(HaError::invalid("inject", "boom"))
                    } else {
                        Ok(())
                    }
                });
                attacker.expect_recover().returning(|| Ok(()));
                Ok(Box::new(attacker))
            })
            .with_operation("OperationForTest", move |cfg, _| {
                let key = cfg.key().unwrap_or_default().to_string();
                let log = operation_log.clone();
                let mut operation = MockOperation::new();
                operation.expect_setup().returning(|| Ok(()));
                operation.expect_run().returning(move |_| {
                    log.lock().unwrap().push(format!("run:{key}"));
                    Ok(())
                });
                operation.expect_rollback().returning(|| Ok(()));
                Ok(Box::new(operation))
            })
            .with_monitor("MonitorForTest", |_, _| {
                let mut probe = MockMonitor::new();
                probe.expect_setup().returning(|| Ok(()));
                probe.expect_one_request().returning(|| Ok(true));
                probe.expect_result_label().returning(|| None);
                Ok(Box::new(probe))
            })
    }

    fn scenario(steps: Vec<Step>) -> ScenarioConfig {
        ScenarioConfig::new(
            "general_scenario",
            ScenarioOptions {
                attackers: Some(vec![
                    ActorConfig::new().with("fault_type", "AttackerForTest").with("key", "a1"),
                    ActorConfig::new().with("fault_type", "AttackerForTest").with("key", "a2"),
                ]),
                operations: Some(vec![ActorConfig::new()
                    .with("operation_type", "OperationForTest")
                    .with("key", "op")]),
                monitors: Some(vec![ActorConfig::new()
                    .with("monitor_type", "MonitorForTest")
                    .with("key", "m")
                    .with("max_time", 0)]),
                steps,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_run_before_setup() {
        let mut runner = ScenarioGeneral::new(scenario(vec![]), HaContext::default());
        let mut result = RunResult::new();
        assert!(matches!(runner.run(&mut result).await, Err(HaError::NotSetUp)));
        assert_eq!(runner.state(), ScenarioState::Created);
    }

    #[tokio::test]
    async fn test_steps_run_in_index_order() {
        let log = CallLog::default();
        let steps = vec![
            Step::new("operation", "op", 3),
            Step::new("attacker", "a2", 2),
            Step::new("monitor", "m", 1),
            Step::new("attacker", "a1", 2),
        ];
        let mut runner = ScenarioGeneral::new(scenario(steps), HaContext::default())
            .with_registry(registry(log.clone(), false));

        runner.setup().await.unwrap();
        let mut result = RunResult::new();
        runner.run(&mut result).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["inject:a2", "inject:a1", "run:op"]);
        let executed: Vec<_> = runner.executed_steps().iter().map(|s| s.index).collect();
        assert_eq!(executed, vec![1, 2, 2, 3]);
        assert_eq!(runner.director().unwrap().pending_rollbacks(), 3);
        assert_eq!(result.get("sla_pass"), Some(&Value::from(1)));
        assert!(result.contains_key("monitor"));
        assert_eq!(runner.state(), ScenarioState::Verified);

        runner.teardown().await.unwrap();
        assert_eq!(runner.director().unwrap().pending_rollbacks(), 0);
        assert_eq!(runner.state(), ScenarioState::TornDown);
    }

    #[tokio::test]
    async fn test_failing_step_stops_remaining_steps() {
        let log = CallLog::default();
        let steps = vec![Step::new("attacker", "a1", 1), Step::new("operation", "op", 2)];
        let mut runner = ScenarioGeneral::new(scenario(steps), HaContext::default())
            .with_registry(registry(log.clone(), true));

        runner.setup().await.unwrap();
        let mut result = RunResult::new();
        runner.run(&mut result).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["inject:a1"]);
        assert_eq!(runner.director().unwrap().pending_rollbacks(), 0);
        assert!(runner.executed_steps().is_empty());
        // monitors were stopped and a verdict was still recorded
        assert!(result.contains_key("sla_pass"));
    }

    #[tokio::test]
    async fn test_unknown_step_type_is_skipped() {
        let log = CallLog::default();
        let steps = vec![Step::new("wrong_type", "a1", 1), Step::new("attacker", "a1", 2)];
        let mut runner = ScenarioGeneral::new(scenario(steps), HaContext::default())
            .with_registry(registry(log.clone(), false));

        runner.setup().await.unwrap();
        runner.run(&mut RunResult::new()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["inject:a1"]);
        assert_eq!(runner.executed_steps().len(), 1);
    }

    #[tokio::test]
    async fn test_teardown_reports_failure() {
        let mut bad = scenario(vec![]);
        bad.options.result_checkers = Some(vec![]);
        bad.options.monitors.as_mut().unwrap()[0] = ActorConfig::new()
            .with("monitor_type", "MonitorForTest")
            .with("key", "m")
            .with("max_time", 0)
            .with("sla", serde_json::json!({"max_outage_count": -1}));

        let mut runner = ScenarioGeneral::new(bad, HaContext::default()).with_registry(registry(CallLog::default(), false));
        runner.setup().await.unwrap();
        let mut result = RunResult::new();
        runner.run(&mut result).await.unwrap();

        assert_eq!(result.get("sla_pass"), Some(&Value::from(0)));
        assert!(!runner.pass_flag());
        assert!(matches!(
            runner.teardown().await,
            Err(HaError::ScenarioFailed { sla_pass: 0 })
        ));
    }
}
