//! Built-in attackers

use async_trait::async_trait;
use shared::{
    process_debug, process_error, process_info, process_warn, ActionType, ActorConfig, IntermediateVariables, ProcessId,
    TargetData,
};
use std::sync::Arc;

use super::common::{loaded, load_script, process_count, require_key, run_script, script_command, script_path, shell_quote};
use crate::context::HaContext;
use crate::error::{HaError, HaResult};
use crate::services::ensure_success;
use crate::traits::{Attacker, CommandExecutor, CommandOutput};

/// Runs an inject script and a recovery script on the configured host
///
/// Scripts come from the actor config (`inject_script`, `recovery_script`)
/// or from the catalog entry named by `attacker_key`, defaulting to `key`.
/// Values of the optional `parameter` map are passed as script arguments.
pub struct GeneralAttacker {
    key: String,
    executor: Arc<dyn CommandExecutor>,
    command: String,
    inject_path: String,
    recovery_path: String,
    inject_script: Option<String>,
    recovery_script: Option<String>,
}

impl GeneralAttacker {
    pub fn from_config(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Self> {
        let key = require_key(cfg)?;
        let catalog_key = cfg.str_field("attacker_key").unwrap_or(&key).to_string();
        Ok(Self {
            executor: ctx.executor_for(cfg)?,
            command: script_command(cfg.map_field("parameter"), &IntermediateVariables::new()),
            inject_path: script_path(ctx, ActionType::Attacker, cfg, &catalog_key, "inject_script")?,
            recovery_path: script_path(ctx, ActionType::Attacker, cfg, &catalog_key, "recovery_script")?,
            inject_script: None,
            recovery_script: None,
            key,
        })
    }
}

#[async_trait]
impl Attacker for GeneralAttacker {
    async fn setup(&mut self, _data: &mut TargetData) -> HaResult<()> {
        self.inject_script = Some(load_script(&self.key, &self.inject_path).await?);
        self.recovery_script = Some(load_script(&self.key, &self.recovery_path).await?);
        process_debug!(
            ProcessId::current(),
            "Attacker {} ready on {}",
            self.key,
            self.executor.target()
        );
        Ok(())
    }

    /// A non-zero exit is logged only; the fault may be partially applied and
    /// still needs its recovery at teardown
    async fn inject_fault(&mut self) -> HaResult<()> {
        let script = loaded(&self.key, &self.inject_script)?;
        let output = self.executor.execute(&self.command, Some(script.to_string())).await?;
        log_inject(&self.key, &output);
        Ok(())
    }

    async fn recover(&mut self) -> HaResult<()> {
        let script = loaded(&self.key, &self.recovery_script)?;
        run_script(self.executor.as_ref(), &self.command, script).await?;
        Ok(())
    }
}

fn log_inject(key: &str, output: &CommandOutput) {
    if output.success() {
        process_debug!(ProcessId::current(), "Inject {} output: {}", key, output.stdout.trim());
    } else {
        process_error!(
            ProcessId::current(),
            "❌ Inject {} exited {}, stdout: {}, stderr: {}",
            key,
            output.exit_code,
            output.stdout.trim(),
            output.stderr.trim()
        );
    }
}

/// Stops a system service through check, inject and recovery scripts
///
/// Each script runs as `/bin/sh -s <service_name>`. Setup records whether the
/// check script reported the service as `running`, so a service that was
/// already down fails the scenario.
pub struct StopServiceAttacker {
    key: String,
    service_name: String,
    executor: Arc<dyn CommandExecutor>,
    command: String,
    check_path: String,
    inject_path: String,
    recovery_path: String,
    inject_script: Option<String>,
    recovery_script: Option<String>,
}

impl StopServiceAttacker {
    pub fn from_config(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Self> {
        let key = require_key(cfg)?;
        let service_name = cfg.require_str("service_name")?.to_string();
        let catalog_key = cfg.str_field("attacker_key").unwrap_or(&key).to_string();
        Ok(Self {
            executor: ctx.executor_for(cfg)?,
            command: format!("/bin/sh -s {}", shell_quote(&service_name)),
            check_path: script_path(ctx, ActionType::Attacker, cfg, &catalog_key, "check_script")?,
            inject_path: script_path(ctx, ActionType::Attacker, cfg, &catalog_key, "inject_script")?,
            recovery_path: script_path(ctx, ActionType::Attacker, cfg, &catalog_key, "recovery_script")?,
            inject_script: None,
            recovery_script: None,
            service_name,
            key,
        })
    }
}

#[async_trait]
impl Attacker for StopServiceAttacker {
    async fn setup(&mut self, data: &mut TargetData) -> HaResult<()> {
        let check = load_script(&self.key, &self.check_path).await?;
        self.inject_script = Some(load_script(&self.key, &self.inject_path).await?);
        self.recovery_script = Some(load_script(&self.key, &self.recovery_path).await?);

        let output = self.executor.execute(&self.command, Some(check)).await?;
        let running = output.stdout.contains("running");
        if !running {
            process_warn!(
                ProcessId::current(),
                "⚠️ Service {} not running on {}, stdout: {}, stderr: {}",
                self.service_name,
                self.executor.target(),
                output.stdout.trim(),
                output.stderr.trim()
            );
        }
        data.insert(self.service_name.clone(), u64::from(running));
        Ok(())
    }

    async fn inject_fault(&mut self) -> HaResult<()> {
        let script = loaded(&self.key, &self.inject_script)?;
        let output = self.executor.execute(&self.command, Some(script.to_string())).await?;
        log_inject(&self.key, &output);
        Ok(())
    }

    async fn recover(&mut self) -> HaResult<()> {
        let script = loaded(&self.key, &self.recovery_script)?;
        run_script(self.executor.as_ref(), &self.command, script).await?;
        Ok(())
    }
}

/// Kills every process matching `process_name` on the configured host
///
/// Setup records the number of matching processes in the target data, so a
/// process that is not running at all fails the scenario.
pub struct KillProcessAttacker {
    key: String,
    process_name: String,
    recovery_command: Option<String>,
    executor: Arc<dyn CommandExecutor>,
}

impl KillProcessAttacker {
    pub fn from_config(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Self> {
        Ok(Self {
            key: require_key(cfg)?,
            process_name: cfg.require_str("process_name")?.to_string(),
            recovery_command: cfg.str_field("recovery_command").map(str::to_string),
            executor: ctx.executor_for(cfg)?,
        })
    }
}

#[async_trait]
impl Attacker for KillProcessAttacker {
    async fn setup(&mut self, data: &mut TargetData) -> HaResult<()> {
        let count = process_count(self.executor.as_ref(), &self.process_name).await?;
        if count == 0 {
            process_warn!(
                ProcessId::current(),
                "⚠️ Process {} not running on {}",
                self.process_name,
                self.executor.target()
            );
        }
        data.insert(self.process_name.clone(), count);
        Ok(())
    }

    async fn inject_fault(&mut self) -> HaResult<()> {
        let command = format!("pkill -9 -f {}", shell_quote(&self.process_name));
        ensure_success(&command, self.executor.execute(&command, None).await?)?;
        process_info!(ProcessId::current(), "💥 {} killed {}", self.key, self.process_name);
        Ok(())
    }

    async fn recover(&mut self) -> HaResult<()> {
        let Some(command) = &self.recovery_command else {
            return Ok(());
        };
        ensure_success(command, self.executor.execute(command, None).await?)?;
        Ok(())
    }
}

/// Powers a bare metal node off and brings it back through IPMI
///
/// Recovery runs `ipmitool` from `jump_host` when configured, otherwise from
/// the harness host. Setup records whether the node answered a ping.
pub struct BareMetalAttacker {
    key: String,
    host: String,
    host_ip: String,
    ipmi_ip: String,
    ipmi_user: String,
    ipmi_pwd: String,
    executor: Arc<dyn CommandExecutor>,
    control: Arc<dyn CommandExecutor>,
}

impl BareMetalAttacker {
    pub fn from_config(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Self> {
        let host = cfg.require_str("host")?.to_string();
        let node = ctx.node(&host)?;
        Ok(Self {
            key: require_key(cfg)?,
            host_ip: node.ip.clone(),
            ipmi_ip: node.ipmi_ip.clone().ok_or_else(|| HaError::missing("ipmi_ip"))?,
            ipmi_user: node.ipmi_user.clone().unwrap_or_else(|| "root".to_string()),
            ipmi_pwd: node.ipmi_pwd.clone().ok_or_else(|| HaError::missing("ipmi_pwd"))?,
            executor: ctx.executor(Some(&host))?,
            control: ctx.executor(cfg.str_field("jump_host"))?,
            host,
        })
    }

    fn power_on_command(&self) -> String {
        format!(
            "ipmitool -I lanplus -H {} -U {} -P {} power on",
            shell_quote(&self.ipmi_ip),
            shell_quote(&self.ipmi_user),
            shell_quote(&self.ipmi_pwd)
        )
    }
}

#[async_trait]
impl Attacker for BareMetalAttacker {
    async fn setup(&mut self, data: &mut TargetData) -> HaResult<()> {
        let command = format!("ping -c 1 -W 10 {}", shell_quote(&self.host_ip));
        let reachable = self.control.execute(&command, None).await?.success();
        if !reachable {
            process_warn!(ProcessId::current(), "⚠️ Host {} ({}) is not running", self.host, self.host_ip);
        }
        data.insert(self.host.clone(), u64::from(reachable));
        Ok(())
    }

    async fn inject_fault(&mut self) -> HaResult<()> {
        // the ssh session dies with the host, so the exit status carries no signal
        let output = self.executor.execute("sudo shutdown -h now", None).await?;
        process_info!(
            ProcessId::current(),
            "💥 {} shut down {} (exit {})",
            self.key,
            self.host,
            output.exit_code
        );
        Ok(())
    }

    async fn recover(&mut self) -> HaResult<()> {
        let command = self.power_on_command();
        let output = self.control.execute(&command, None).await?;
        // keep the IPMI password out of the error
        ensure_success("ipmitool power on", output)?;
        Ok(())
    }
}
