//! Attacker, operation and result checker managers
//!
//! A manager owns the actors of one scenario section, keyed by the actor's
//! `key`. Actors are wrapped in an [`ActorSlot`] behind a shared lock so that
//! players and rollbackers created later can drive the same instance.

use shared::{process_error, process_info, ActionType, ActorConfig, ProcessId, TargetData};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::context::HaContext;
use crate::error::{HaError, HaResult};
use crate::registry::{type_tag, ActorRegistry};
use crate::traits::{Attacker, Operation, ResultChecker};

/// One actor plus the bookkeeping the director needs about it
pub struct ActorSlot<A: ?Sized> {
    pub key: String,
    /// False when setup failed; players skip unusable actors
    pub usable: bool,
    /// Last verdict of a result checker, `None` until it ran
    pub outcome: Option<bool>,
    pub actor: Box<A>,
}

pub type SharedSlot<A> = Arc<Mutex<ActorSlot<A>>>;

/// Actors of one capability in declaration order
pub struct ActorMgr<A: ?Sized> {
    capability: ActionType,
    slots: Vec<(String, SharedSlot<A>)>,
    failed: Vec<String>,
}

pub type AttackerMgr = ActorMgr<dyn Attacker>;
pub type OperationMgr = ActorMgr<dyn Operation>;
pub type ResultCheckerMgr = ActorMgr<dyn ResultChecker>;

impl<A: ?Sized> ActorMgr<A> {
    pub fn new(capability: ActionType) -> Self {
        Self {
            capability,
            slots: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn capability(&self) -> ActionType {
        self.capability
    }

    /// Add an actor; a failed setup is recorded and leaves the actor unusable
    pub fn insert(&mut self, key: &str, actor: Box<A>, setup: HaResult<()>) {
        let usable = match setup {
            Ok(()) => true,
            Err(e) => {
                process_error!(
                    ProcessId::current(),
                    "❌ {} {} setup failed: {}",
                    self.capability,
                    key,
                    e
                );
                self.failed.push(format!("{}/{}", self.capability, key));
                false
            }
        };
        let slot = ActorSlot {
            key: key.to_string(),
            usable,
            outcome: None,
            actor,
        };
        self.slots.push((key.to_string(), Arc::new(Mutex::new(slot))));
    }

    /// Lookup by key; an unknown key is a dispatch error
    pub fn get(&self, key: &str) -> HaResult<SharedSlot<A>> {
        self.slots
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, slot)| slot.clone())
            .ok_or_else(|| HaError::UnknownActorKey {
                capability: self.capability.to_string(),
                key: key.to_string(),
            })
    }

    pub fn keys(&self) -> Vec<&str> {
        self.slots.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// `capability/key` of every actor whose setup failed
    pub fn failed_setups(&self) -> &[String] {
        &self.failed
    }
}

fn actor_key(cfg: &ActorConfig) -> HaResult<&str> {
    cfg.key().ok_or_else(|| HaError::missing("key"))
}

impl ActorMgr<dyn Attacker> {
    /// Build and set up every attacker; attackers record target presence in `data`
    pub async fn init_attackers(
        configs: &[ActorConfig],
        ctx: &HaContext,
        registry: &ActorRegistry,
        data: &mut TargetData,
    ) -> HaResult<Self> {
        let mut mgr = Self::new(ActionType::Attacker);
        for cfg in configs {
            let key = actor_key(cfg)?;
            let factory = registry.attacker(type_tag(ActionType::Attacker, cfg)?)?;
            let mut attacker = factory(cfg, ctx)?;
            let setup = attacker.setup(data).await;
            mgr.insert(key, attacker, setup);
        }
        process_info!(ProcessId::current(), "🎯 Attackers ready: {:?}", mgr.keys());
        Ok(mgr)
    }
}

impl ActorMgr<dyn Operation> {
    pub async fn init_operations(
        configs: &[ActorConfig],
        ctx: &HaContext,
        registry: &ActorRegistry,
    ) -> HaResult<Self> {
        let mut mgr = Self::new(ActionType::Operation);
        for cfg in configs {
            let key = actor_key(cfg)?;
            let factory = registry.operation(type_tag(ActionType::Operation, cfg)?)?;
            let mut operation = factory(cfg, ctx)?;
            let setup = operation.setup().await;
            mgr.insert(key, operation, setup);
        }
        Ok(mgr)
    }
}

impl ActorMgr<dyn ResultChecker> {
    pub async fn init_result_checkers(
        configs: &[ActorConfig],
        ctx: &HaContext,
        registry: &ActorRegistry,
    ) -> HaResult<Self> {
        let mut mgr = Self::new(ActionType::ResultChecker);
        for cfg in configs {
            let key = actor_key(cfg)?;
            let factory = registry.result_checker(type_tag(ActionType::ResultChecker, cfg)?)?;
            let mut checker = factory(cfg, ctx)?;
            let setup = checker.setup().await;
            mgr.insert(key, checker, setup);
        }
        Ok(mgr)
    }

    /// AND over the verdicts recorded by result checker steps
    ///
    /// A checker that never ran, or could not be set up, fails verification.
    pub async fn verify(&self) -> bool {
        let mut passed = true;
        for (key, slot) in &self.slots {
            let outcome = slot.lock().await.outcome;
            if outcome != Some(true) {
                process_info!(ProcessId::current(), "Result checker {} failed: {:?}", key, outcome);
                passed = false;
            }
        }
        passed
    }
}
