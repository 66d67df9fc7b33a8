use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Default zstd level for the output archive.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Runtime settings for one export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory holding the scratch file reused across fetches.
    pub scratch_dir: PathBuf,
    /// zstd compression level (1-22).
    pub compression_level: i32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scratch_dir: env::temp_dir(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl ExportConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    ///
    /// `SHELVEPACK_SCRATCH_DIR` overrides the OS temp dir,
    /// `SHELVEPACK_COMPRESSION_LEVEL` the zstd level.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = env_opt("SHELVEPACK_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }
        if let Some(level) = env_opt("SHELVEPACK_COMPRESSION_LEVEL") {
            config.compression_level = parse_level(&level)?;
        }
        Ok(config)
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::debug!(
            scratch_dir = %self.scratch_dir.display(),
            compression_level = self.compression_level,
            "export config loaded"
        );
    }
}

fn parse_level(raw: &str) -> Result<i32> {
    let invalid = |reason: &str| CoreError::Config {
        key: "SHELVEPACK_COMPRESSION_LEVEL".to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let level: i32 = raw.trim().parse().map_err(|_| invalid("not an integer"))?;
    if !(1..=22).contains(&level) {
        return Err(invalid("must be between 1 and 22"));
    }
    Ok(level)
}
