//! Tracing subscriber setup.
//!
//! One fmt subscriber for the whole process. The level string comes from
//! config (already env-overridden there); standard `RUST_LOG` directives are
//! also accepted, e.g. `mastermind=debug`.

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

pub fn init(level: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::Logger(format!("subscriber init: {e}")))
}
