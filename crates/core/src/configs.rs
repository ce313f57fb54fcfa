//! Configuration parsing
//!
//! Volley reads a single YAML file describing roles, tasks and global settings.

pub mod settings;
pub mod tasks;
pub mod volley;

pub use settings::Settings;
pub use tasks::{Command, OneOrMany, TaskConfig, TaskOptions};
pub use volley::{load_volley_config, parse_volley_config, volley_config_schema, VolleyConfig};
