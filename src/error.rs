//! Error types for the eecalc binaries

use thiserror::Error;

/// Errors that can occur in the eecalc application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
