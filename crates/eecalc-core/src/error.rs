//! Error types for eecalc core.

use thiserror::Error;

/// Errors that can occur in the eecalc core
#[derive(Error, Debug)]
pub enum EecalcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Unknown starter: {0}")]
    UnknownStarter(String),

    #[error("No functions file loaded")]
    NoFunctionsLoaded,

    #[error("Rhai compile error: {0}")]
    RhaiCompile(String),
}

pub type Result<T> = std::result::Result<T, EecalcError>;
