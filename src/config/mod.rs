/// Database connection and schema management
pub mod database;

/// Application settings from config.toml
pub mod settings;

pub use settings::{AppConfig, load_default_config};
