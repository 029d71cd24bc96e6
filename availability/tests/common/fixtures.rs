//! Test fixtures and data for availability tests
//!
//! Consistent actor configs and scenarios used across all test suites.

use serde_json::json;
use shared::{ActorConfig, ContextConfig, NodeConfig, ScenarioConfig, ScenarioOptions, Step};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const NODE: &'static str = "node1";
    pub const NODE_IP: &'static str = "10.20.0.5";

    pub const ATTACKER_KEY: &'static str = "kill-process";
    pub const MONITOR_KEY: &'static str = "service-status";
    pub const OPERATION_KEY: &'static str = "create-server";
    pub const CHECKER_KEY: &'static str = "process-checker";

    pub const MONITOR_COMMAND: &'static str = "nova image-list";

    /// Node inventory with a single controller node
    pub fn context_config() -> ContextConfig {
        ContextConfig::default().with_node(Self::NODE, NodeConfig::new(Self::NODE_IP))
    }

    /// Attacker handled by the test registry
    pub fn test_attacker(key: &str) -> ActorConfig {
        ActorConfig::new()
            .with("fault_type", "AttackerForTest")
            .with("key", key)
    }

    /// Monitor handled by the test registry; `healthy` controls every probe
    pub fn test_monitor(key: &str, healthy: bool) -> ActorConfig {
        ActorConfig::from_value(json!({
            "monitor_type": "MonitorForTest",
            "key": key,
            "healthy": healthy,
            "wait_time": 0,
            "duration": 0,
            "max_time": 0
        }))
        .unwrap()
    }

    pub fn test_operation(key: &str) -> ActorConfig {
        ActorConfig::new()
            .with("operation_type", "OperationForTest")
            .with("key", key)
    }

    /// Result checker handled by the test registry with a fixed verdict
    pub fn test_checker(key: &str, verdict: bool) -> ActorConfig {
        ActorConfig::new()
            .with("checker_type", "CheckerForTest")
            .with("key", key)
            .with("verdict", verdict)
    }

    /// Built-in general attacker fed by the given script files
    pub fn general_attacker(inject_script: &str, recovery_script: &str) -> ActorConfig {
        ActorConfig::from_value(json!({
            "fault_type": "general-attacker",
            "key": Self::ATTACKER_KEY,
            "host": Self::NODE,
            "inject_script": inject_script,
            "recovery_script": recovery_script,
            "parameter": {"remote_process": "nova-api"}
        }))
        .unwrap()
    }

    /// Built-in command monitor with a zero observation window
    pub fn general_monitor() -> ActorConfig {
        ActorConfig::from_value(json!({
            "monitor_type": "general-monitor",
            "key": Self::MONITOR_KEY,
            "command_name": Self::MONITOR_COMMAND,
            "host": Self::NODE,
            "max_time": 0,
            "sla": {"max_outage_time": 5}
        }))
        .unwrap()
    }

    /// The attacker-then-monitor step plan
    pub fn attack_then_monitor() -> Vec<Step> {
        vec![
            Step::new("attacker", Self::ATTACKER_KEY, 1),
            Step::new("monitor", Self::MONITOR_KEY, 2),
        ]
    }

    pub fn scenario(options: ScenarioOptions) -> ScenarioConfig {
        ScenarioConfig::new("general_scenario", options)
    }
}
