//! Built-in actor implementations
//!
//! Every actor talks to its target through a [`CommandExecutor`](crate::traits::CommandExecutor)
//! obtained from the context, so tests swap in mocks through the connector.

pub mod attackers;
pub mod common;
pub mod monitors;
pub mod operations;
pub mod result_checkers;

pub use attackers::{BareMetalAttacker, GeneralAttacker, KillProcessAttacker, StopServiceAttacker};
pub use monitors::{CommandMonitor, ProcessMonitor};
pub use operations::GeneralOperation;
pub use result_checkers::{Condition, GeneralResultChecker};

use shared::ActorConfig;

use crate::context::HaContext;
use crate::error::HaResult;
use crate::registry::ActorRegistry;
use crate::traits::{Attacker, Monitor, Operation, ResultChecker};

fn general_attacker(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Box<dyn Attacker>> {
    Ok(Box::new(GeneralAttacker::from_config(cfg, ctx)?))
}

fn kill_process(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Box<dyn Attacker>> {
    Ok(Box::new(KillProcessAttacker::from_config(cfg, ctx)?))
}

fn bare_metal_down(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Box<dyn Attacker>> {
    Ok(Box::new(BareMetalAttacker::from_config(cfg, ctx)?))
}

fn stop_service(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Box<dyn Attacker>> {
    Ok(Box::new(StopServiceAttacker::from_config(cfg, ctx)?))
}

fn command_monitor(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Box<dyn Monitor>> {
    Ok(Box::new(CommandMonitor::from_config(cfg, ctx)?))
}

fn api_monitor(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Box<dyn Monitor>> {
    Ok(Box::new(CommandMonitor::api_from_config(cfg, ctx)?))
}

fn process_monitor(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Box<dyn Monitor>> {
    Ok(Box::new(ProcessMonitor::from_config(cfg, ctx)?))
}

fn general_operation(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Box<dyn Operation>> {
    Ok(Box::new(GeneralOperation::from_config(cfg, ctx)?))
}

fn general_result_checker(cfg: &ActorConfig, ctx: &HaContext) -> HaResult<Box<dyn ResultChecker>> {
    Ok(Box::new(GeneralResultChecker::from_config(cfg, ctx)?))
}

/// Add every built-in actor type to `registry`
pub fn register_builtin(registry: ActorRegistry) -> ActorRegistry {
    registry
        .with_attacker("general-attacker", general_attacker)
        .with_attacker("kill-process", kill_process)
        .with_attacker("bare-metal-down", bare_metal_down)
        .with_attacker("stop-service", stop_service)
        .with_monitor("openstack-cmd", command_monitor)
        .with_monitor("general-monitor", command_monitor)
        .with_monitor("openstack-api", api_monitor)
        .with_monitor("process", process_monitor)
        .with_operation("general-operation", general_operation)
        .with_result_checker("general-result-checker", general_result_checker)
}
