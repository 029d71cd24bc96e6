//! Built-in operations

use async_trait::async_trait;
use serde_json::{Map, Value};
use shared::{process_debug, process_info, ActionType, ActorConfig, IntermediateVariables, ProcessId};
use std::sync::Arc;

use super::common::{loaded, load_script, require_key, run_script, script_command, script_path};
use crate::context::HaContext;
use crate::error::HaResult;
use crate::traits::{CommandExecutor, Operation};

/// Runs an action script and, on rollback, a rollback script
///
/// `action_parameter` and `rollback_parameter` values may reference values
/// captured by earlier operations as `$name`. With `return_parameter` set,
/// the trimmed stdout of the action is published under that name.
pub struct GeneralOperation {
    key: String,
    executor: Arc<dyn CommandExecutor>,
    action_path: String,
    rollback_path: String,
    action_parameter: Option<Map<String, Value>>,
    rollback_parameter: Option<Map<String, Value>>,
    return_parameter: Option<String>,
    action_script: Option<String>,
    rollback_script: Option<String>,
    captured: IntermediateVariables,
}

impl GeneralOperation {
    pub fn from_config(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Self> {
        let key = require_key(cfg)?;
        let catalog_key = cfg.str_field("operation_key").unwrap_or(&key).to_string();
        Ok(Self {
            executor: ctx.executor_for(cfg)?,
            action_path: script_path(ctx, ActionType::Operation, cfg, &catalog_key, "action_script")?,
            rollback_path: script_path(ctx, ActionType::Operation, cfg, &catalog_key, "rollback_script")?,
            action_parameter: cfg.map_field("action_parameter").cloned(),
            rollback_parameter: cfg.map_field("rollback_parameter").cloned(),
            return_parameter: cfg.str_field("return_parameter").map(str::to_string),
            action_script: None,
            rollback_script: None,
            captured: IntermediateVariables::new(),
            key,
        })
    }
}

#[async_trait]
impl Operation for GeneralOperation {
    async fn setup(&mut self) -> HaResult<()> {
        self.action_script = Some(load_script(&self.key, &self.action_path).await?);
        self.rollback_script = Some(load_script(&self.key, &self.rollback_path).await?);
        Ok(())
    }

    async fn run(&mut self, variables: &mut IntermediateVariables) -> HaResult<()> {
        let script = loaded(&self.key, &self.action_script)?;
        let command = script_command(self.action_parameter.as_ref(), variables);
        let output = run_script(self.executor.as_ref(), &command, script).await?;
        process_debug!(ProcessId::current(), "Operation {} output: {}", self.key, output.stdout.trim());

        if let Some(name) = &self.return_parameter {
            variables.insert(name.clone(), output.stdout.trim().to_string());
            process_info!(ProcessId::current(), "📌 {} captured ${}", self.key, name);
        }
        self.captured = variables.clone();
        Ok(())
    }

    async fn rollback(&mut self) -> HaResult<()> {
        let script = loaded(&self.key, &self.rollback_script)?;
        let command = script_command(self.rollback_parameter.as_ref(), &self.captured);
        run_script(self.executor.as_ref(), &command, script).await?;
        Ok(())
    }
}
