//! Client for submitting build/test jobs to a remote compute farm and
//! watching them to completion.
//!
//! A [`RemoteJob`] is registered with the farm via [`RemoteJob::submit`] and
//! then polled through the pull-based [`JobWatcher`] until exactly one final
//! [`StateEvent`] arrives. A [`JobSet`] submits many jobs in one round-trip
//! and fans their individual watch streams into a single merged stream.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod job;
pub mod set;
pub mod ui;

pub use api::{ApiClient, ApiError, JobApi, StatusDocument};
pub use config::{FarmhandConfig, WatchConfig};
pub use error::FarmhandError;
pub use event::{Outcome, StateEvent};
pub use job::{JobKind, JobParams, JobWatcher, MAX_RESUBMITS, RemoteJob};
pub use set::{JobSet, SetWatcher};
