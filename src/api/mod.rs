pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, JobApi};
pub use error::ApiError;
pub use types::{JobPayload, StatusDocument, SubmitRequest, SubmitResponse, SubmittedJob};
