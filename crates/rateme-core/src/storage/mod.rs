mod config;
pub mod database;
pub mod kv;
pub mod memory;

pub use config::{Config, StoreConfig, ThresholdsConfig};
pub use database::SqliteStore;
pub use kv::{Edit, Editor, KeyValueStore, StoreValue, UpdateFn};
pub use memory::MemoryStore;

use std::path::PathBuf;

/// Returns `~/.config/rateme[-dev]/` based on RATEME_ENV.
///
/// Set RATEME_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("RATEME_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("rateme-dev")
    } else {
        base_dir.join("rateme")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
