//! Bruter configuration loading
//!
//! The VM reads its tunables from a RON file. Every field is optional;
//! whatever the file leaves out keeps its default.
//!
//! ```text
//! // bruter.ron
//! (
//!     initial_capacity: 1024,
//!     max_depth: 128,
//! )
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use bruter::util::config::load_config;
//!
//! let config = load_config("bruter.ron").unwrap();
//! let vm = bruter::VirtualMachine::with_config(config);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::vm::VMConfig;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "bruter.ron";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Path of the config file in the working directory
pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE)
}

/// Load a VM configuration.
/// Returns the default config if the file doesn't exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<VMConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(VMConfig::default());
    }

    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse a VM configuration from RON text
pub fn parse_config(content: &str) -> Result<VMConfig, ConfigError> {
    Ok(ron::from_str(content)?)
}

/// Write a VM configuration as pretty RON
pub fn save_config(
    path: impl AsRef<Path>,
    config: &VMConfig,
) -> Result<(), ConfigError> {
    let content = ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())?;
    fs::write(path, content)?;
    Ok(())
}
