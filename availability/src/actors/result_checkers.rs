//! Built-in result checkers

use async_trait::async_trait;
use serde_json::Value;
use shared::{process_debug, process_error, ActionType, ActorConfig, IntermediateVariables, ProcessId};
use std::sync::Arc;

use super::common::{loaded, load_script, require_key, script_command, script_path};
use crate::context::HaContext;
use crate::error::{HaError, HaResult};
use crate::traits::{CommandExecutor, ResultChecker};

/// Comparison between the checker's stdout and its expected value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equal,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    In,
    Unsupported(String),
}

impl Condition {
    pub fn parse(s: &str) -> Self {
        match s {
            "eq" => Condition::Equal,
            "gt" => Condition::GreaterThan,
            "gt_eq" => Condition::GreaterThanEqual,
            "lt" => Condition::LessThan,
            "lt_eq" => Condition::LessThanEqual,
            "in" => Condition::In,
            other => Condition::Unsupported(other.to_string()),
        }
    }

    fn compare<T: PartialOrd>(&self, actual: T, expected: T) -> bool {
        match self {
            Condition::Equal => actual == expected,
            Condition::GreaterThan => actual > expected,
            Condition::GreaterThanEqual => actual >= expected,
            Condition::LessThan => actual < expected,
            Condition::LessThanEqual => actual <= expected,
            Condition::In | Condition::Unsupported(_) => false,
        }
    }

    /// Evaluate `actual` (checker stdout) against the configured expected value
    ///
    /// Numeric expected values compare numerically against the trimmed output;
    /// anything that does not parse fails the check.
    pub fn evaluate(&self, actual: &str, expected: &Value) -> bool {
        let actual = actual.trim();
        if let Condition::Unsupported(_) = self {
            return false;
        }
        match expected {
            Value::Number(n) if !n.is_f64() => {
                let expected = n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from));
                let (Ok(actual), Some(expected)) = (actual.parse::<i128>(), expected) else {
                    return false;
                };
                self.compare(actual, expected)
            }
            Value::Number(n) => {
                let (Ok(actual), Some(expected)) = (actual.parse::<f64>(), n.as_f64()) else {
                    return false;
                };
                self.compare(actual, expected)
            }
            Value::String(expected) if *self == Condition::In => actual.contains(expected.as_str()),
            Value::String(expected) => self.compare(actual, expected.as_str()),
            other => {
                let expected = other.to_string();
                match self {
                    Condition::In => actual.contains(&expected),
                    _ => self.compare(actual, expected.as_str()),
                }
            }
        }
    }
}

/// Runs a verify script and compares its output with `expectedValue`
///
/// The script comes from `verify_script` or the catalog entry named by
/// `checker_key`; `parameter` values are passed as script arguments.
pub struct GeneralResultChecker {
    key: String,
    executor: Arc<dyn CommandExecutor>,
    command: String,
    verify_path: String,
    verify_script: Option<String>,
    condition: Condition,
    expected: Value,
}

impl GeneralResultChecker {
    pub fn from_config(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Self> {
        let key = require_key(cfg)?;
        let catalog_key = cfg.str_field("checker_key").unwrap_or(&key).to_string();
        let expected = cfg
            .value("expectedValue")
            .cloned()
            .ok_or_else(|| HaError::missing("expectedValue"))?;
        Ok(Self {
            executor: ctx.executor_for(cfg)?,
            command: script_command(cfg.map_field("parameter"), &IntermediateVariables::new()),
            verify_path: script_path(ctx, ActionType::ResultChecker, cfg, &catalog_key, "verify_script")?,
            verify_script: None,
            condition: Condition::parse(cfg.require_str("condition")?),
            expected,
            key,
        })
    }
}

#[async_trait]
impl ResultChecker for GeneralResultChecker {
    async fn setup(&mut self) -> HaResult<()> {
        self.verify_script = Some(load_script(&self.key, &self.verify_path).await?);
        Ok(())
    }

    async fn verify(&mut self) -> HaResult<bool> {
        let script = loaded(&self.key, &self.verify_script)?;
        let output = self
            .executor
            .execute(&self.command, Some(script.to_string()))
            .await?;

        if !output.success() || output.stdout.is_empty() {
            process_error!(
                ProcessId::current(),
                "❌ Result checker {} failed to run (exit {}): {}",
                self.key,
                output.exit_code,
                output.stderr.trim()
            );
            return Ok(false);
        }

        let passed = self.condition.evaluate(&output.stdout, &self.expected);
        process_debug!(
            ProcessId::current(),
            "Result checker {}: expected {} {:?} actual {} -> {}",
            self.key,
            self.expected,
            self.condition,
            output.stdout.trim(),
            passed
        );
        Ok(passed)
    }
}
