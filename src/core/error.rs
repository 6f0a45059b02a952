use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy for the detector. Nothing here is fatal to the process:
/// captures are retried, window lookups degrade to a fallback region, and
/// configuration errors fall back to defaults.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("screen capture failed: {0}")]
    Capture(String),

    #[error("window enumeration failed: {0}")]
    WindowEnum(String),

    #[error("failed to serialize configuration: {0}")]
    ConfigEncode(#[from] serde_json::Error),

    #[error("failed to save configuration to {path}: {source}")]
    ConfigSave {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
