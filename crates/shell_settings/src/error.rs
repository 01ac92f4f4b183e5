use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the settings store.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("failed to access settings file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings document in {path} must be a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("settings service has no backing file")]
    NoBackingFile,

    #[error("refusing to store a non-finite float under '{key}'")]
    NonFiniteFloat { key: String },

    #[error("failed to serialize value for '{key}'")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("a global settings service is already installed")]
    AlreadyInstalled,
}
