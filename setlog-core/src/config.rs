//! setlog-core specific configuration

use std::path::PathBuf;

/// Orchestration service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Data folder holding the template library and the publish outbox
    pub data_folder: PathBuf,
    /// HTTP listen port
    pub port: u16,
}

impl Config {
    /// Template library file (TOML) inside the data folder
    pub fn template_library_path(&self) -> PathBuf {
        self.data_folder.join("templates.toml")
    }

    /// Publish outbox file (NDJSON) inside the data folder
    pub fn outbox_path(&self) -> PathBuf {
        self.data_folder.join("outbox.ndjson")
    }
}
