use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const DEFAULT_REMOTE_SHELL: &str = "ssh";
const DEFAULT_ENV_PREFIX: &str = "VOLLEY";

/// Global settings shared by every task
#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    /// Program and leading arguments used to reach a remote host, e.g. `[ssh, -o, BatchMode=yes]`.
    /// The host name and the task command are appended to it.
    pub remote_shell: Option<Vec<String>>,
    /// Prefix of the environment variables exported to every worker.
    pub env_prefix: Option<String>,
}

impl Settings {
    pub fn effective_remote_shell(&self) -> Vec<String> {
        match &self.remote_shell {
            Some(shell) if !shell.is_empty() => shell.clone(),
            _ => vec![DEFAULT_REMOTE_SHELL.to_string()],
        }
    }

    pub fn effective_env_prefix(&self) -> &str {
        self.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX)
    }
}
