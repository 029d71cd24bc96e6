//! Execution context handed to every actor at construction

use shared::{ActorConfig, ContextConfig, NodeConfig, ScriptCatalog};
use std::fmt;
use std::sync::Arc;

use crate::error::{HaError, HaResult};
use crate::services::SystemConnector;
use crate::traits::{CommandExecutor, Connector};

/// Node inventory, script catalog and the connector used to reach nodes
#[derive(Clone)]
pub struct HaContext {
    pub config: ContextConfig,
    pub catalog: ScriptCatalog,
    connector: Arc<dyn Connector>,
}

impl HaContext {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            catalog: ScriptCatalog::default(),
            connector: Arc::new(SystemConnector),
        }
    }

    /// Attach a script catalog (fluent API)
    pub fn with_catalog(mut self, catalog: ScriptCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replace the connector, e.g. with a fake in tests (fluent API)
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn node(&self, name: &str) -> HaResult<&NodeConfig> {
        self.config.node(name).ok_or_else(|| HaError::UnknownNode {
            node: name.to_string(),
        })
    }

    /// Executor for a named node, or the local host when `node` is `None`
    pub fn executor(&self, node: Option<&str>) -> HaResult<Arc<dyn CommandExecutor>> {
        match node {
            Some(name) => Ok(self.connector.connect(Some(self.node(name)?.clone()))),
            None => Ok(self.connector.connect(None)),
        }
    }

    /// Executor for the actor's `host` entry
    pub fn executor_for(&self, cfg: &ActorConfig) -> HaResult<Arc<dyn CommandExecutor>> {
        self.executor(cfg.str_field("host"))
    }
}

impl Default for HaContext {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

impl fmt::Debug for HaContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HaContext")
            .field("nodes", &self.config.nodes.keys().collect::<Vec<_>>())
            .field("catalog", &self.catalog)
            .finish()
    }
}
