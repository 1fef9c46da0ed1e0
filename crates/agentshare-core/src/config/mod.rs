//! User preferences persisted between runs.

pub mod store;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use store::ConfigStore;

/// Application configuration stored as `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Preferred UI language code. Stored only; the engine does not read it.
    pub language: Option<String>,
    /// Extra platform descriptor directories, searched before the built-ins.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub descriptor_dirs: Vec<PathBuf>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor directory unless it is already listed. Returns
    /// whether the list changed.
    pub fn add_descriptor_dir(&mut self, dir: PathBuf) -> bool {
        if self.descriptor_dirs.contains(&dir) {
            return false;
        }
        self.descriptor_dirs.push(dir);
        true
    }
}
