use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A value that may be written either as a single string or as a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value.clone()],
            OneOrMany::Many(values) => values.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Command {
    Single(String),
    Multiple(Vec<String>),
}

/// Target selection for a task
#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskOptions {
    /// Hosts the task runs against, as a single host or a list.
    pub hosts: Option<OneOrMany>,
    /// Roles whose member hosts the task runs against.
    pub roles: Option<OneOrMany>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskConfig {
    pub description: Option<String>,
    /// A string runs through `sh -c`, a list is executed as program and arguments.
    pub command: Option<Command>,
    #[serde(default)]
    pub options: TaskOptions,
}
