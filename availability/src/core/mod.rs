//! Orchestration core
//!
//! Monitor groups and their manager, the attacker/operation/checker managers,
//! action players and rollbackers, the director and the scenario runner.

pub mod director;
pub mod managers;
pub mod monitor;
pub mod monitor_mgr;
pub mod players;
pub mod scenario;

pub use director::Director;
pub use managers::{ActorMgr, ActorSlot, AttackerMgr, OperationMgr, ResultCheckerMgr, SharedSlot};
pub use monitor::{GroupState, MonitorGroup, MonitorRecord, MonitorResult, MonitorTiming, Sla};
pub use monitor_mgr::{MonitorMgr, SharedGroup};
pub use players::{
    ActionPlayer, ActionRollbacker, AttackerPlayer, AttackerRollbacker, MonitorPlayer, OperationPlayer,
    OperationRollbacker, ResultCheckerPlayer, SharedVariables,
};
pub use scenario::{ScenarioGeneral, ScenarioState};
