use std::collections::BTreeMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::configs::settings::Settings;
use crate::configs::tasks::{OneOrMany, TaskConfig};
use crate::types::{VolleyError, VolleyResult};

/// Root of a `volley.yml` file
#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VolleyConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Named groups of hosts.
    #[serde(default)]
    pub roles: BTreeMap<String, OneOrMany>,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,
    #[serde(default)]
    pub settings: Settings,
}

impl VolleyConfig {
    pub fn task(&self, name: &str) -> VolleyResult<&TaskConfig> {
        self.tasks
            .get(name)
            .ok_or_else(|| VolleyError::UnknownTask(name.to_string()))
    }
}

pub fn parse_volley_config(yaml_str: &str) -> VolleyResult<VolleyConfig> {
    let config: VolleyConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}

pub fn load_volley_config(path: &Path) -> VolleyResult<VolleyConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        VolleyError::Config(format!("Failed to read config {}: {}", path.display(), e))
    })?;

    parse_volley_config(&content).map_err(|e| {
        VolleyError::Config(format!("Failed to parse config {}: {}", path.display(), e))
    })
}

/// JSON schema of the configuration file, pretty printed
pub fn volley_config_schema() -> VolleyResult<String> {
    let schema = schemars::schema_for!(VolleyConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}
