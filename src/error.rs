use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum FarmhandError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Job has not been submitted")]
    NotSubmitted,

    #[error("Job was already submitted")]
    AlreadySubmitted,

    #[error("Submission response did not match job {0}")]
    UnmatchedToken(Uuid),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Gave up waiting for a terminal state after {0:?}")]
    WatchTimeout(Duration),

    #[error("Watch stream ended without a final event")]
    NoFinalEvent,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
