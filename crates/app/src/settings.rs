//! Application settings, read from `settings.toml` next to the binary.

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    /// Log level for the env filter (`info`, `debug`, ...).
    pub level: String,
    pub database: Database,
    /// Allow member accounts to go below zero.
    #[serde(default)]
    pub allow_overdraft: bool,
}

#[derive(Debug, Deserialize)]
pub struct Reconcile {
    /// Minutes between drift sweeps.
    pub interval_minutes: u64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub reconcile: Option<Reconcile>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .build()?;

        settings.try_deserialize()
    }
}
