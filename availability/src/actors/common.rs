//! Helpers shared by the built-in actors
//!
//! Built-in actors feed a script body through stdin to `/bin/bash -s` and pass
//! their configured parameters as positional arguments, on the local host or
//! on a node reached through the context's connector.

use serde_json::{Map, Value};
use shared::{ActionType, ActorConfig, IntermediateVariables};

use crate::context::HaContext;
use crate::error::{HaError, HaResult};
use crate::services::ensure_success;
use crate::traits::{CommandExecutor, CommandOutput};

/// Quote a value for a POSIX shell command line
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Replace a `$name` parameter with a value captured by an earlier step
///
/// Unknown names are passed through untouched.
pub fn substitute(value: &str, variables: &IntermediateVariables) -> String {
    value
        .strip_prefix('$')
        .and_then(|name| variables.get(name))
        .cloned()
        .unwrap_or_else(|| value.to_string())
}

fn parameter_text(value: &Value, variables: &IntermediateVariables) -> String {
    match value {
        Value::String(s) => substitute(s, variables),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `/bin/bash -s` followed by the parameter values in declaration order
pub fn script_command(parameters: Option<&Map<String, Value>>, variables: &IntermediateVariables) -> String {
    let mut command = String::from("/bin/bash -s");
    for value in parameters.into_iter().flat_map(|p| p.values()) {
        command.push(' ');
        command.push_str(&shell_quote(&parameter_text(value, variables)));
    }
    command
}

pub fn require_key(cfg: &ActorConfig) -> HaResult<String> {
    cfg.key()
        .map(str::to_string)
        .ok_or_else(|| HaError::missing("key"))
}

/// Locate a script path for `field`
///
/// An inline path in the actor config wins over the catalog entry named by
/// `catalog_key`. Relative paths are resolved against the catalog base dir.
pub fn script_path(
    ctx: &HaContext,
    action: ActionType,
    cfg: &ActorConfig,
    catalog_key: &str,
    field: &str,
) -> HaResult<String> {
    if let Some(inline) = cfg.str_field(field) {
        return Ok(ctx.catalog.resolve(inline));
    }
    ctx.catalog
        .entry(action, catalog_key)
        .and_then(|entry| entry.get(field))
        .map(|path| ctx.catalog.resolve(path))
        .ok_or_else(|| HaError::missing(&format!("{action}.{catalog_key}.{field}")))
}

/// Read a script body during actor setup
pub async fn load_script(key: &str, path: &str) -> HaResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| HaError::ActorSetupFailed {
            key: key.to_string(),
            reason: format!("cannot read {path}: {e}"),
        })
}

/// Script body loaded by `setup`, or an error naming the actor
pub fn loaded<'a>(key: &str, script: &'a Option<String>) -> HaResult<&'a str> {
    script.as_deref().ok_or_else(|| HaError::ActorSetupFailed {
        key: key.to_string(),
        reason: "setup has not completed".to_string(),
    })
}

/// Feed `script` to `command` and fail on a non-zero exit
pub async fn run_script(executor: &dyn CommandExecutor, command: &str, script: &str) -> HaResult<CommandOutput> {
    let output = executor.execute(command, Some(script.to_string())).await?;
    ensure_success(command, output)
}

/// Count processes whose command line matches `name`
pub async fn process_count(executor: &dyn CommandExecutor, name: &str) -> HaResult<u64> {
    let output = executor
        .execute(&format!("pgrep -c -f {}", shell_quote(name)), None)
        .await?;
    // pgrep exits 1 when nothing matches and still prints 0
    Ok(output.stdout.trim().parse().unwrap_or(0))
}
