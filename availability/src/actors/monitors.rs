//! Built-in monitor probes

use async_trait::async_trait;
use shared::{process_debug, ActorConfig, ProcessId};
use std::sync::Arc;

use super::common::process_count;
use crate::context::HaContext;
use crate::error::HaResult;
use crate::traits::{CommandExecutor, Monitor};

fn insecure_from_env() -> bool {
    std::env::var("OS_INSECURE")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Healthy while `command_name` exits with status 0
///
/// Registered as `openstack-cmd`, `general-monitor` and `openstack-api`. With
/// `OS_INSECURE=true` in the environment `--insecure` is appended.
pub struct CommandMonitor {
    command_name: String,
    command: String,
    executor: Arc<dyn CommandExecutor>,
}

impl CommandMonitor {
    pub fn from_config(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Self> {
        Ok(Self::new(
            cfg.require_str("command_name")?,
            ctx.executor_for(cfg)?,
            insecure_from_env(),
        ))
    }

    /// The `openstack-api` form: `monitor_api` always runs on the local node
    pub fn api_from_config(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Self> {
        Ok(Self::new(cfg.require_str("monitor_api")?, ctx.executor(None)?, false))
    }

    pub fn new(command_name: &str, executor: Arc<dyn CommandExecutor>, insecure: bool) -> Self {
        let command = if insecure {
            format!("{command_name} --insecure")
        } else {
            command_name.to_string()
        };
        Self {
            command_name: command_name.to_string(),
            command,
            executor,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl Monitor for CommandMonitor {
    async fn setup(&mut self) -> HaResult<()> {
        Ok(())
    }

    async fn one_request(&mut self) -> HaResult<bool> {
        let output = self.executor.execute(&self.command, None).await?;
        process_debug!(
            ProcessId::current(),
            "Execute command '{}' exit {}",
            self.command,
            output.exit_code
        );
        Ok(output.success())
    }

    fn result_label(&self) -> Option<String> {
        Some(self.command_name.replace(' ', "-"))
    }
}

/// Healthy while at least one process matches `process_name`
pub struct ProcessMonitor {
    process_name: String,
    executor: Arc<dyn CommandExecutor>,
}

impl ProcessMonitor {
    pub fn from_config(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Self> {
        Ok(Self {
            process_name: cfg.require_str("process_name")?.to_string(),
            executor: ctx.executor_for(cfg)?,
        })
    }
}

#[async_trait]
impl Monitor for ProcessMonitor {
    async fn setup(&mut self) -> HaResult<()> {
        Ok(())
    }

    async fn one_request(&mut self) -> HaResult<bool> {
        Ok(process_count(self.executor.as_ref(), &self.process_name).await? > 0)
    }

    fn result_label(&self) -> Option<String> {
        Some(format!("process_{}", self.process_name))
    }
}
