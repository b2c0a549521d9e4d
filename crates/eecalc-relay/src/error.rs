//! Error types for the relay.

use thiserror::Error;

use eecalc_core::EecalcError;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] EecalcError),

    #[error("Connection closed before joining a sheet")]
    ClosedBeforeJoin,

    #[error("Frame longer than {max} bytes")]
    FrameTooLarge { max: usize },
}

pub type Result<T> = std::result::Result<T, RelayError>;
