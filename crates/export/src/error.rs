use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] shelvepack_core::CoreError),

    #[error("rule error: {0}")]
    Rule(#[from] shelvepack_rules::RuleError),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The version-control backend could not deliver content or metadata.
    #[error("backend error: {0}")]
    Backend(String),

    /// Copying or downloading one item into the scratch file failed.
    #[error("cannot fetch {item}: {source}")]
    Fetch {
        item: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no pending changes, no file written")]
    NothingToExport,

    #[error("duplicate archive entry '{0}'")]
    DuplicateEntry(String),

    #[error("{reason} \"{}\"", .path.display())]
    OutputPath { path: PathBuf, reason: String },

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, ExportError>;
