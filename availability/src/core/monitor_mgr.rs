//! Monitor manager: one [`MonitorGroup`] per configured monitor
//!
//! Across groups the four result fields are summed without dividing, unlike
//! the per-group reduction which averages over instances.

use serde_json::Value;
use shared::{process_info, process_warn, ActorConfig, ProcessId, RunResult};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::monitor::{MonitorGroup, MonitorResult};
use crate::context::HaContext;
use crate::error::{HaError, HaResult};
use crate::registry::ActorRegistry;

pub type SharedGroup = Arc<Mutex<MonitorGroup>>;

#[derive(Default)]
pub struct MonitorMgr {
    groups: Vec<(String, SharedGroup)>,
}

impl MonitorMgr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up one group per config; workers are not started yet
    pub async fn init_monitors(
        configs: &[ActorConfig],
        ctx: &HaContext,
        registry: &ActorRegistry,
    ) -> HaResult<Self> {
        let mut mgr = Self::new();
        for cfg in configs {
            let key = cfg.key().ok_or_else(|| HaError::missing("key"))?;
            let group = MonitorGroup::setup(key, cfg, ctx, registry).await?;
            mgr.add(group);
        }
        process_info!(ProcessId::current(), "👀 Monitors ready: {:?}", mgr.keys());
        Ok(mgr)
    }

    pub fn add(&mut self, group: MonitorGroup) {
        self.groups
            .push((group.key().to_string(), Arc::new(Mutex::new(group))));
    }

    pub fn get(&self, key: &str) -> HaResult<SharedGroup> {
        self.groups
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, group)| group.clone())
            .ok_or_else(|| HaError::UnknownActorKey {
                capability: "monitor".to_string(),
                key: key.to_string(),
            })
    }

    pub fn keys(&self) -> Vec<&str> {
        self.groups.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Start every group that is not running yet
    pub async fn start_monitors(&self) {
        for (_, group) in &self.groups {
            group.lock().await.start_monitor();
        }
    }

    /// Stop every group and collect its records
    ///
    /// A group with abandoned workers is reported and keeps the records it got.
    pub async fn wait_monitors(&self) {
        for (key, group) in &self.groups {
            if let Err(e) = group.lock().await.stop_monitor().await {
                process_warn!(ProcessId::current(), "⚠️ Monitor {} stopped incompletely: {}", key, e);
            }
        }
    }

    /// True when every group meets its SLA; every group is evaluated and logged
    pub async fn verify_sla(&self) -> bool {
        let mut passed = true;
        for (_, group) in &self.groups {
            passed &= group.lock().await.verify_sla();
        }
        passed
    }

    pub async fn get_result(&self) -> MonitorResult {
        let mut results = Vec::with_capacity(self.groups.len());
        for (_, group) in &self.groups {
            results.push(group.lock().await.get_result());
        }
        results.into_iter().sum()
    }

    /// Write `<label>_outage_time` for every group into the run result
    pub async fn store_result(&self, result: &mut RunResult) {
        for (_, group) in &self.groups {
            let group = group.lock().await;
            let outage_time = group.get_result().outage_time;
            result.insert(format!("{}_outage_time", group.label()), Value::from(outage_time));
        }
    }

    /// `monitor/key` of every group whose probes could not be set up
    pub async fn failed_setups(&self) -> Vec<String> {
        let mut failed = Vec::new();
        for (key, group) in &self.groups {
            if !group.lock().await.is_usable() {
                failed.push(format!("monitor/{key}"));
            }
        }
        failed
    }
}
