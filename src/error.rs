//! Application-wide error types.

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A `process_message` call was rejected because one is already in flight.
    #[error("another message is still being processed")]
    Busy,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
