use thiserror::Error;

/// The main error type for Volley operations
#[derive(Debug, Error)]
pub enum VolleyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error("Task '{0}' is not defined")]
    UnknownTask(String),

    #[error("Task '{0}' resolved to zero target hosts")]
    NoHosts(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Failed to spawn worker for host '{host}': {source}")]
    Spawn {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for worker process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Reaped process {pid} is not a tracked worker")]
    RegistryInconsistency { pid: u32 },
}

/// Result type alias for Volley operations
pub type VolleyResult<T> = Result<T, VolleyError>;
