use std::fs::File;
use std::path::Path;
use std::time::Duration;

use manual_edits::DEFAULT_MANUAL_EDITS_FILE_PATH;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(default)] // if we add new fields, give them default values when deserializing old configs
pub struct RunFrameConfig {
    /// Delay after the last edit event before the batch is folded and persisted.
    pub debounce_ms: u64,
    /// When enabled, persisting a batch that contains a finished edit requests a render.
    pub auto_rerender_on_edit_finish: bool,
    pub manual_edits_file_path: String,
    pub eval_version: String,
    pub entrypoint: String,
}

impl Default for RunFrameConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            auto_rerender_on_edit_finish: true,
            manual_edits_file_path: DEFAULT_MANUAL_EDITS_FILE_PATH.to_string(),
            eval_version: crate::eval_version::LATEST.to_string(),
            entrypoint: "index.tsx".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error. cause: {0}")]
    IoError(std::io::Error),
    #[error("Invalid config, cause: {0}")]
    Invalid(serde_json::Error),
}

impl RunFrameConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config. path: {:?}", path);

        let file = File::open(path).map_err(ConfigError::IoError)?;
        serde_json::from_reader(file).map_err(ConfigError::Invalid)
    }
}
