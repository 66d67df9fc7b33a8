use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config value {key}={value}: {reason}")]
    Config {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid server path: {0}")]
    ServerPath(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
