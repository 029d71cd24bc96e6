//! Command execution services
//!
//! Local shell execution and an ssh wrapper around the system client, both
//! driven through `tokio::process`.

use async_trait::async_trait;
use shared::{process_debug, NodeConfig, ProcessId};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{HaError, HaResult};
use crate::traits::{CommandExecutor, CommandOutput, Connector};

/// Spawn `cmd`, feed `stdin`, and collect exit status and output
async fn run_command(mut cmd: Command, shown: &str, stdin: Option<String>) -> HaResult<CommandOutput> {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes()).await?;
            // dropping the pipe closes stdin so `sh -s` sees EOF
        }
    }

    let output = child.wait_with_output().await?;
    let result = CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    process_debug!(
        ProcessId::current(),
        "Executed '{}' -> exit {}",
        shown,
        result.exit_code
    );
    Ok(result)
}

/// Runs commands on the harness host through `/bin/sh -c`
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str, stdin: Option<String>) -> HaResult<CommandOutput> {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command);
        run_command(cmd, command, stdin).await
    }

    fn target(&self) -> String {
        "local".to_string()
    }
}

/// Runs commands on a remote node through the system `ssh` client
///
/// Authentication is key based (`BatchMode=yes`); password-only nodes need
/// an agent or key to be usable.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    node: NodeConfig,
    connect_timeout_secs: u64,
}

impl SshExecutor {
    pub fn new(node: NodeConfig) -> Self {
        Self {
            node,
            connect_timeout_secs: 10,
        }
    }

    /// Configure the ssh connect timeout (fluent API)
    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Arguments passed to `ssh` ahead of the remote command
    pub fn ssh_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
        ];
        if let Some(key) = &self.node.key_filename {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        if let Some(port) = self.node.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.push(format!("{}@{}", self.node.user, self.node.ip));
        args
    }
}

#[async_trait]
impl CommandExecutor for SshExecutor {
    async fn execute(&self, command: &str, stdin: Option<String>) -> HaResult<CommandOutput> {
        let mut cmd = Command::new("ssh");
        cmd.args(self.ssh_args()).arg("--").arg(command);
        let shown = format!("{} ({})", command, self.target());
        run_command(cmd, &shown, stdin).await
    }

    fn target(&self) -> String {
        format!("{}@{}", self.node.user, self.node.ip)
    }
}

/// Default connector: local shell without a node, ssh with one
#[derive(Debug, Clone, Default)]
pub struct SystemConnector;

impl Connector for SystemConnector {
    fn connect(&self, node: Option<NodeConfig>) -> Arc<dyn CommandExecutor> {
        match node {
            Some(node) => Arc::new(SshExecutor::new(node)),
            None => Arc::new(ShellExecutor::new()),
        }
    }
}

/// Turn a non-zero exit into `HaError::CommandFailed`
pub fn ensure_success(command: &str, output: CommandOutput) -> HaResult<CommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(HaError::CommandFailed {
            command: command.to_string(),
            exit_code: output.exit_code,
            stderr: output.stderr,
        })
    }
}
