use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SlateError {
    #[error("calibration error: {0}")]
    Calibration(String),

    #[error("no free slots remain on the baseplate")]
    SlotsExhausted,

    #[error("planning error: {0}")]
    Planning(String),

    #[error("config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("plate '{0}' is not defined in the baseplate layout")]
    PlateNotFound(String),

    #[error("run '{0}' not found")]
    RunNotFound(String),

    #[error("vision system failed: {0}")]
    Vision(String),

    #[error("state persistence failed: {0}")]
    State(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SlateError>;
