//! Configuration file loading
//!
//! Scenario, context and script catalog files are read as JSON or YAML
//! depending on the file extension.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::{SharedError, SharedResult};
use crate::types::{ActionType, ContextConfig, ScenarioConfig};

/// Script paths for one catalog entry, e.g. `inject_script` / `recovery_script`
pub type ScriptEntry = HashMap<String, String>;

/// Library of named fault, monitor, operation and checker scripts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptCatalog {
    /// Directory relative script paths are resolved against
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub attackers: HashMap<String, ScriptEntry>,
    #[serde(default)]
    pub monitors: HashMap<String, ScriptEntry>,
    #[serde(default)]
    pub operations: HashMap<String, ScriptEntry>,
    #[serde(default)]
    pub resultcheckers: HashMap<String, ScriptEntry>,
}

impl ScriptCatalog {
    pub fn entry(&self, action: ActionType, key: &str) -> Option<&ScriptEntry> {
        match action {
            ActionType::Attacker => self.attackers.get(key),
            ActionType::Monitor => self.monitors.get(key),
            ActionType::Operation => self.operations.get(key),
            ActionType::ResultChecker => self.resultcheckers.get(key),
        }
    }

    /// Resolve a script path against `base_dir` unless it is already absolute
    pub fn resolve(&self, script: &str) -> String {
        match &self.base_dir {
            Some(base) if !Path::new(script).is_absolute() => {
                Path::new(base).join(script).to_string_lossy().into_owned()
            }
            _ => script.to_string(),
        }
    }
}

enum Format {
    Json,
    Yaml,
}

fn format_of(path: &Path) -> SharedResult<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("yaml") | Some("yml") => Ok(Format::Yaml),
        _ => Err(SharedError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

/// Parse a document from a string in the given format
fn parse<T: DeserializeOwned>(raw: &str, format: Format) -> SharedResult<T> {
    match format {
        Format::Json => serde_json::from_str(raw).map_err(|e| SharedError::DeserializationError {
            message: e.to_string(),
        }),
        Format::Yaml => serde_yaml::from_str(raw).map_err(|e| SharedError::DeserializationError {
            message: e.to_string(),
        }),
    }
}

pub fn load_file<T: DeserializeOwned>(path: &Path) -> SharedResult<T> {
    let format = format_of(path)?;
    let raw = std::fs::read_to_string(path).map_err(|e| SharedError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse(&raw, format)
}

/// Load and validate a scenario file
pub fn load_scenario(path: &Path) -> SharedResult<ScenarioConfig> {
    let scenario: ScenarioConfig = load_file(path)?;
    scenario.validate()?;
    Ok(scenario)
}

pub fn load_context(path: &Path) -> SharedResult<ContextConfig> {
    load_file(path)
}

pub fn load_catalog(path: &Path) -> SharedResult<ScriptCatalog> {
    load_file(path)
}
