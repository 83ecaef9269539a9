//! Configuration for Squad
//!
//! Configuration is layered: defaults, then an optional file (JSON, TOML or YAML by
//! extension), then `SQUAD_*` environment variables. The CLI applies its own flags
//! on top of the loaded value.

pub mod env_loader;
pub mod file_loader;
pub mod logging_config;
pub mod model;

pub use env_loader::{apply_env_overrides, apply_overrides_from};
pub use file_loader::load_from_file;
pub use logging_config::{LogFormat, LoggingConfig};
pub use model::{ExecutorConfig, SquadConfig};

use crate::error::SquadResult;
use std::path::Path;

/// Load configuration from an optional file and the process environment
pub fn load_config(path: Option<&Path>) -> SquadResult<SquadConfig> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => SquadConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}
