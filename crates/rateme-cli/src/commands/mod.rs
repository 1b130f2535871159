pub mod config;
pub mod prompt;

use std::path::Path;

use rateme_core::{Config, ConfigError};

/// Load the config from `path`, or from the data directory when unset.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
