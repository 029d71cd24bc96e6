//! Test helpers and builder patterns for availability tests
//!
//! Registries of recording mock actors, a recording command executor and a
//! scenario builder, so suites only describe what differs per test.

use availability::traits::{
    CommandExecutor, CommandOutput, MockAttacker, MockCommandExecutor, MockConnector, MockMonitor, MockOperation,
    MockResultChecker,
};
use availability::{ActorRegistry, HaContext, HaError, ScenarioGeneral};
use serde_json::Value;
use shared::{ActorConfig, RunResult, ScenarioConfig, ScenarioOptions, Step};
use std::io::Write;
use std::sync::{Arc, Mutex};

use super::fixtures::TestFixtures;

/// Ordered record of actor calls or executed commands
pub type CallLog = Arc<Mutex<Vec<String>>>;

fn flag(cfg: &ActorConfig, field: &str, default: bool) -> bool {
    cfg.value(field).and_then(Value::as_bool).unwrap_or(default)
}

/// Common helper functions for testing
pub struct TestHelpers;

impl TestHelpers {
    pub fn log() -> CallLog {
        CallLog::default()
    }

    pub fn entries(log: &CallLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Registry of mock actors that append `<call>:<key>` to `log`
    ///
    /// Config switches: `presence` (attacker target count, default 1),
    /// `fail_inject`, `fail_recover`, `fail_rollback`, `healthy`, `verdict`.
    pub fn recording_registry(log: CallLog) -> ActorRegistry {
        let attacker_log = log.clone();
        let operation_log = log.clone();
        let checker_log = log;

        ActorRegistry::empty()
            .with_attacker("AttackerForTest", move |cfg, _| {
                let key = cfg.key().unwrap_or_default().to_string();
                let presence = cfg.u64_field("presence").unwrap_or(1);
                let fail_inject = flag(cfg, "fail_inject", false);
                let fail_recover = flag(cfg, "fail_recover", false);
                let (inject_log, recover_log) = (attacker_log.clone(), attacker_log.clone());
                let (inject_key, recover_key) = (key.clone(), key.clone());

                let mut attacker = MockAttacker::new();
                attacker.expect_setup().returning(move |data| {
                    data.insert(key.clone(), presence);
                    Ok(())
                });
                attacker.expect_inject_fault().returning(move || {
                    inject_log.lock().unwrap().push(format!("inject:{inject_key}"));
                    if fail_inject {
                        Err(HaError::invalid("inject", "failed"))
                    } else {
                        Ok(())
                    }
                });
                attacker.expect_recover().returning(move || {
                    recover_log.lock().unwrap().push(format!("recover:{recover_key}"));
                    if fail_recover {
                        Err(HaError::invalid("recover", "failed"))
                    } else {
                        Ok(())
                    }
                });
                Ok(Box::new(attacker))
            })
            .with_monitor("MonitorForTest", |cfg, _| {
                let healthy = flag(cfg, "healthy", true);
                let mut probe = MockMonitor::new();
                probe.expect_setup().returning(|| Ok(()));
                probe.expect_one_request().returning(move || Ok(healthy));
                probe.expect_result_label().returning(|| None);
                Ok(Box::new(probe))
            })
            .with_operation("OperationForTest", move |cfg, _| {
                let key = cfg.key().unwrap_or_default().to_string();
                let fail_rollback = flag(cfg, "fail_rollback", false);
                let (run_log, rollback_log) = (operation_log.clone(), operation_log.clone());
                let run_key = key.clone();

                let mut operation = MockOperation::new();
                operation.expect_setup().returning(|| Ok(()));
                operation.expect_run().returning(move |_| {
                    run_log.lock().unwrap().push(format!("run:{run_key}"));
                    Ok(())
                });
                operation.expect_rollback().returning(move || {
                    rollback_log.lock().unwrap().push(format!("rollback:{key}"));
                    if fail_rollback {
                        Err(HaError::invalid("rollback", "failed"))
                    } else {
                        Ok(())
                    }
                });
                Ok(Box::new(operation))
            })
            .with_result_checker("CheckerForTest", move |cfg, _| {
                let key = cfg.key().unwrap_or_default().to_string();
                let verdict = flag(cfg, "verdict", true);
                let log = checker_log.clone();

                let mut checker = MockResultChecker::new();
                checker.expect_setup().returning(|| Ok(()));
                checker.expect_verify().returning(move || {
                    log.lock().unwrap().push(format!("verify:{key}"));
                    Ok(verdict)
                });
                Ok(Box::new(checker))
            })
    }

    /// Context whose every node is served by one executor that records commands
    ///
    /// Every command succeeds with `exit_code` and empty output.
    pub fn recording_context(log: CallLog, exit_code: i32) -> HaContext {
        let mut executor = MockCommandExecutor::new();
        executor.expect_execute().returning(move |command, _| {
            log.lock().unwrap().push(command.to_string());
            Ok(CommandOutput {
                exit_code,
                stdout: String::new(),
                stderr: String::new(),
            })
        });
        executor
            .expect_target()
            .returning(|| format!("root@{}", TestFixtures::NODE_IP));
        let executor: Arc<dyn CommandExecutor> = Arc::new(executor);

        let mut connector = MockConnector::new();
        connector.expect_connect().returning(move |_| executor.clone());

        HaContext::new(TestFixtures::context_config()).with_connector(Arc::new(connector))
    }

    pub fn script(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    /// Set up and run a scenario, returning the runner for teardown
    pub async fn run(scenario: ScenarioConfig, context: HaContext, registry: ActorRegistry) -> (ScenarioGeneral, RunResult) {
        let mut runner = ScenarioGeneral::new(scenario, context).with_registry(registry);
        runner.setup().await.unwrap();
        let mut result = RunResult::new();
        runner.run(&mut result).await.unwrap();
        (runner, result)
    }

    pub fn sla_pass(result: &RunResult) -> Option<u64> {
        result.get("sla_pass").and_then(Value::as_u64)
    }
}

/// Builder for scenario configs
#[derive(Default)]
pub struct ScenarioBuilder {
    options: ScenarioOptions,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attacker(mut self, cfg: ActorConfig) -> Self {
        self.options.attackers.get_or_insert_with(Vec::new).push(cfg);
        self
    }

    pub fn with_monitor(mut self, cfg: ActorConfig) -> Self {
        self.options.monitors.get_or_insert_with(Vec::new).push(cfg);
        self
    }

    pub fn with_operation(mut self, cfg: ActorConfig) -> Self {
        self.options.operations.get_or_insert_with(Vec::new).push(cfg);
        self
    }

    pub fn with_checker(mut self, cfg: ActorConfig) -> Self {
        self.options.result_checkers.get_or_insert_with(Vec::new).push(cfg);
        self
    }

    pub fn step(mut self, action_type: &str, key: &str, index: i64) -> Self {
        self.options.steps.push(Step::new(action_type, key, index));
        self
    }

    pub fn steps(mut self, steps: Vec<Step>) -> Self {
        self.options.steps.extend(steps);
        self
    }

    pub fn build(self) -> ScenarioConfig {
        TestFixtures::scenario(self.options)
    }
}
