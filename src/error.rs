//! Error types shared by the store, the scheduler and the notification layer.

use thiserror::Error;

/// Failures of the persistent settings store. All of them are transient from
/// the timer's point of view: the current tick is dropped and the next one retries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store file {0} does not hold a JSON object")]
    NotAnObject(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("notification backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("settings store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    #[error("notification gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

pub type Result<T, E = TimerError> = std::result::Result<T, E>;
