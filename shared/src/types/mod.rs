//! Core types used throughout the availability harness

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::OnceLock;

use crate::errors::{SharedError, SharedResult};

/// Global process ID singleton - set once at startup
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

/// Identity of the process emitting log events
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// The `ha-runner` binary
    Runner,
    /// Library driven from another harness (tests, embedding runners)
    Embedded,
}

impl ProcessId {
    /// Initialize the global process ID for the runner binary
    pub fn init_runner() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Runner)
    }

    /// Get the global process ID, defaulting to `Embedded` when nobody claimed it
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Embedded)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Runner => write!(f, "ha-runner"),
            ProcessId::Embedded => write!(f, "availability"),
        }
    }
}

/// Identity of one monitor worker inside a monitor group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId {
    pub group: String,
    pub instance: u32,
}

impl WorkerId {
    pub fn new(group: impl Into<String>, instance: u32) -> Self {
        Self {
            group: group.into(),
            instance,
        }
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.group, self.instance)
    }
}

/// The four actor capabilities a step can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Attacker,
    Monitor,
    Operation,
    ResultChecker,
}

impl ActionType {
    pub const ALL: [ActionType; 4] = [
        ActionType::Attacker,
        ActionType::Monitor,
        ActionType::Operation,
        ActionType::ResultChecker,
    ];

    /// Parse the `actionType` string used in scenario steps
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "attacker" => Some(ActionType::Attacker),
            "monitor" => Some(ActionType::Monitor),
            "operation" => Some(ActionType::Operation),
            "resultchecker" => Some(ActionType::ResultChecker),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Attacker => "attacker",
            ActionType::Monitor => "monitor",
            ActionType::Operation => "operation",
            ActionType::ResultChecker => "resultchecker",
        }
    }

    /// Config field carrying the actor type tag for this capability
    pub fn type_field(&self) -> &'static str {
        match self {
            ActionType::Attacker => "fault_type",
            ActionType::Monitor => "monitor_type",
            ActionType::Operation => "operation_type",
            ActionType::ResultChecker => "checker_type",
        }
    }

    /// Only destructive capabilities get an undo entry on the rollback stack
    pub fn has_rollback(&self) -> bool {
        matches!(self, ActionType::Attacker | ActionType::Operation)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ordered entry of a scenario's action plan
///
/// `action_type` stays a raw string so an unrecognised type survives loading
/// and is skipped at dispatch time instead of failing the whole scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "actionKey")]
    pub action_key: String,
    #[serde(rename = "actionType")]
    pub action_type: String,
    pub index: i64,
}

impl Step {
    pub fn new(action_type: &str, action_key: &str, index: i64) -> Self {
        Self {
            action_key: action_key.to_string(),
            action_type: action_type.to_string(),
            index,
        }
    }

    pub fn action(&self) -> Option<ActionType> {
        ActionType::parse(&self.action_type)
    }
}

/// Free-form actor configuration with typed accessors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ActorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object value
    pub fn from_value(value: Value) -> SharedResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(SharedError::InvalidConfig {
                field: "actor".to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// Builder-style setter, mostly used by tests and fixtures
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.str_field("key")
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn require_str(&self, field: &str) -> SharedResult<&str> {
        self.str_field(field).ok_or_else(|| SharedError::MissingField {
            field: field.to_string(),
        })
    }

    /// Numeric field; numeric strings are accepted since YAML authors quote freely
    pub fn f64_field(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn u64_field(&self, field: &str) -> Option<u64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn map_field(&self, field: &str) -> Option<&Map<String, Value>> {
        self.fields.get(field).and_then(Value::as_object)
    }

    /// Nested numeric lookup such as `sla.max_outage_time`
    pub fn nested_f64(&self, outer: &str, inner: &str) -> Option<f64> {
        match self.map_field(outer)?.get(inner)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Optional actor sections plus the ordered step list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attackers: Option<Vec<ActorConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitors: Option<Vec<ActorConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<ActorConfig>>,
    #[serde(
        rename = "resultCheckers",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub result_checkers: Option<Vec<ActorConfig>>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl ScenarioOptions {
    /// Section for a capability, `None` when the scenario does not configure it
    pub fn section(&self, action: ActionType) -> Option<&[ActorConfig]> {
        match action {
            ActionType::Attacker => self.attackers.as_deref(),
            ActionType::Monitor => self.monitors.as_deref(),
            ActionType::Operation => self.operations.as_deref(),
            ActionType::ResultChecker => self.result_checkers.as_deref(),
        }
    }
}

/// Top-level scenario description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(rename = "type")]
    pub scenario_type: String,
    pub options: ScenarioOptions,
}

impl ScenarioConfig {
    pub fn new(scenario_type: &str, options: ScenarioOptions) -> Self {
        Self {
            scenario_type: scenario_type.to_string(),
            options,
        }
    }

    /// Steps in execution order: ascending `index`, ties keep declaration order
    pub fn sorted_steps(&self) -> Vec<Step> {
        let mut steps = self.options.steps.clone();
        steps.sort_by_key(|step| step.index);
        steps
    }

    /// Reject duplicate actor keys inside one section
    pub fn validate(&self) -> SharedResult<()> {
        for action in ActionType::ALL {
            let Some(section) = self.options.section(action) else {
                continue;
            };
            let mut seen = std::collections::HashSet::new();
            for cfg in section {
                if let Some(key) = cfg.key() {
                    if !seen.insert(key) {
                        return Err(SharedError::DuplicateKey {
                            key: format!("{action}/{key}"),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn default_user() -> String {
    "root".to_string()
}

/// Connection parameters for one logical node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub ip: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_filename: Option<String>,
    #[serde(default, alias = "pwd", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipmi_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipmi_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipmi_pwd: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeConfig {
    pub fn new(ip: &str) -> Self {
        Self {
            ip: ip.to_string(),
            user: default_user(),
            key_filename: None,
            password: None,
            port: None,
            ipmi_ip: None,
            ipmi_user: None,
            ipmi_pwd: None,
            extra: Map::new(),
        }
    }
}

/// Logical node name to connection parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub nodes: HashMap<String, NodeConfig>,
}

impl ContextConfig {
    pub fn node(&self, name: &str) -> Option<&NodeConfig> {
        self.nodes.get(name)
    }

    pub fn with_node(mut self, name: &str, node: NodeConfig) -> Self {
        self.nodes.insert(name.to_string(), node);
        self
    }
}

/// Target inventory recorded by attackers during setup
///
/// A zero entry means the attacked target was absent on its host.
pub type TargetData = BTreeMap<String, u64>;

/// Mutable run result handed in by the caller
pub type RunResult = Map<String, Value>;

/// Values captured by operations for use by later steps
pub type IntermediateVariables = HashMap<String, String>;
