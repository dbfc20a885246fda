use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Cannot resolve '{reference}' referenced from {from}")]
    Resolution { reference: String, from: PathBuf },

    #[error("Build failed: {0}")]
    Build(String),

    #[error("Sandbox install failed: {0}")]
    Install(String),

    #[error("Tests failed in {environment}: {detail}")]
    TestFailure { environment: String, detail: String },

    #[error("Browser engine '{engine}' failed to launch: {detail}")]
    EngineLaunch { engine: String, detail: String },

    #[error("Declaration check failed: {0}")]
    TypeCheck(String),

    #[error("Unknown browser engine: {0}")]
    UnknownEngine(String),

    #[error("Tool not found on PATH: {0}")]
    ToolNotFound(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("Task aborted: {0}")]
    Aborted(String),

    #[error("Task failed: {task}: {detail}")]
    TaskFailed { task: String, detail: String },
}

pub type Result<T> = std::result::Result<T, Error>;
