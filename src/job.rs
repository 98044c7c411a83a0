use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use uuid::Uuid;

use crate::api::{JobApi, JobPayload, StatusDocument, SubmitRequest};
use crate::config::WatchConfig;
use crate::error::FarmhandError;
use crate::event::{StateEvent, is_terminal};

/// Total automatic resubmissions allowed when a job lands in `error`.
pub const MAX_RESUBMITS: u32 = 3;

/// What kind of work the farm runs for this job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Build,
    Test,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Build => write!(f, "build"),
            JobKind::Test => write!(f, "test"),
        }
    }
}

/// Immutable request parameters describing what to build or test.
///
/// Opaque to the polling core, only forwarded to the submission endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobParams {
    pub kind: JobKind,
    pub git_repo: String,
    /// Symbolic ref ("main"). Mutually exclusive with `git_sha`.
    #[serde(default)]
    pub git_ref: Option<String>,
    /// Exact revision. Mutually exclusive with `git_ref`.
    #[serde(default)]
    pub git_sha: Option<String>,
    pub target_arch: String,
    pub toolchain: String,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl JobParams {
    /// Contract check performed at construction time, before anything is
    /// sent to the server.
    fn validate(&self) -> Result<(), FarmhandError> {
        match (&self.git_ref, &self.git_sha) {
            (Some(_), Some(_)) => {
                return Err(FarmhandError::InvalidJob(
                    "git_ref and git_sha are mutually exclusive".into(),
                ));
            }
            (None, None) => {
                return Err(FarmhandError::InvalidJob(
                    "one of git_ref or git_sha is required".into(),
                ));
            }
            _ => {}
        }
        for (name, value) in [
            ("git_repo", &self.git_repo),
            ("target_arch", &self.target_arch),
            ("toolchain", &self.toolchain),
        ] {
            if value.trim().is_empty() {
                return Err(FarmhandError::InvalidJob(format!(
                    "{name} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Identity snapshot of a job, carried by every [`StateEvent`].
///
/// The `key` is the server key at the time the event was emitted; a
/// resubmission replaces the job's key, so events straddling a retry may
/// carry different keys for the same `token`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobId {
    pub token: Uuid,
    pub key: Option<String>,
    pub label: String,
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// A single unit of work submitted to the remote farm.
///
/// Owns a client-generated idempotency token and, once submitted, the
/// server-assigned key used for status polls. The status snapshot is
/// replaced wholesale on every poll, never merged field by field.
#[derive(Debug)]
pub struct RemoteJob {
    client_token: Uuid,
    server_key: Option<String>,
    params: JobParams,
    status: Option<StatusDocument>,
    created_at: DateTime<Utc>,
}

impl RemoteJob {
    /// Validates the parameter contract and creates an unsubmitted job.
    pub fn new(params: JobParams) -> Result<Self, FarmhandError> {
        params.validate()?;
        Ok(Self {
            client_token: Uuid::new_v4(),
            server_key: None,
            params,
            status: None,
            created_at: Utc::now(),
        })
    }

    pub fn client_token(&self) -> Uuid {
        self.client_token
    }

    pub fn server_key(&self) -> Option<&str> {
        self.server_key.as_deref()
    }

    pub fn params(&self) -> &JobParams {
        &self.params
    }

    /// Most recently fetched status snapshot, if any poll has happened.
    pub fn status(&self) -> Option<&StatusDocument> {
        self.status.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn id(&self) -> JobId {
        JobId {
            token: self.client_token,
            key: self.server_key.clone(),
            label: format!("{} @ {}", self.params.toolchain, self.params.target_arch),
        }
    }

    pub(crate) fn payload(&self) -> JobPayload {
        JobPayload {
            client_token: self.client_token,
            kind: self.params.kind,
            git_repo: self.params.git_repo.clone(),
            git_ref: self.params.git_ref.clone(),
            git_sha: self.params.git_sha.clone(),
            target_arch: self.params.target_arch.clone(),
            toolchain: self.params.toolchain.clone(),
            environment: self.params.environment.clone(),
        }
    }

    pub(crate) fn assign_key(&mut self, key: String) {
        self.server_key = Some(key);
    }

    /// Register this job with the farm. The server key is assigned exactly
    /// once here; submitting an already-submitted job is an error.
    pub async fn submit(&mut self, api: &impl JobApi) -> Result<(), FarmhandError> {
        if self.server_key.is_some() {
            return Err(FarmhandError::AlreadySubmitted);
        }
        self.register(api).await
    }

    /// Submission without the already-submitted guard: also used by the
    /// watcher to resubmit after a transient `error`, which replaces the
    /// server key and invalidates the previous one for polling purposes.
    pub(crate) async fn register(&mut self, api: &impl JobApi) -> Result<(), FarmhandError> {
        let req = SubmitRequest {
            jobs: vec![self.payload()],
        };
        let resp = api.submit_jobs(&req).await?;
        let entry = resp
            .jobs
            .into_iter()
            .find(|j| j.client_token == self.client_token)
            .ok_or(FarmhandError::UnmatchedToken(self.client_token))?;
        self.server_key = Some(entry.key);
        Ok(())
    }

    /// Lazily watch this job until it reaches a terminal state.
    ///
    /// The returned watcher is pull-based: each `next_event` call runs the
    /// poll loop until something is worth yielding. Dropping the watcher
    /// abandons the watch; no in-flight request is interrupted.
    pub fn watch<A: JobApi>(self, api: A, cfg: WatchConfig) -> JobWatcher<A> {
        JobWatcher {
            job: self,
            api,
            cfg,
            started: Instant::now(),
            last_state: None,
            resubmits: 0,
            first_cycle: true,
            done: false,
        }
    }

    /// Drain a watch, discarding intermediate events, and return only the
    /// final one.
    pub async fn wait<A: JobApi>(self, api: A, cfg: WatchConfig) -> Result<StateEvent, FarmhandError> {
        self.watch(api, cfg).wait().await
    }
}

/// The polling state machine for one job.
///
/// Each cycle: jittered sleep (skipped on the first cycle), wall-clock
/// ceiling check, status fetch, then either yield an event, resubmit on a
/// transient `error`, or poll again when the state has not changed.
pub struct JobWatcher<A> {
    job: RemoteJob,
    api: A,
    cfg: WatchConfig,
    started: Instant,
    last_state: Option<String>,
    resubmits: u32,
    first_cycle: bool,
    done: bool,
}

impl<A: JobApi> JobWatcher<A> {
    /// Next observed transition, `Ok(None)` once the final event has been
    /// yielded. Exceeding the wall-clock ceiling is an error, not an event.
    pub async fn next_event(&mut self) -> Result<Option<StateEvent>, FarmhandError> {
        if self.done {
            return Ok(None);
        }
        loop {
            if self.first_cycle {
                self.first_cycle = false;
            } else {
                // Jitter avoids thundering-herd polling when many jobs are
                // watched concurrently against the same API.
                let ceiling = self.cfg.poll_delay_ms.max(1);
                let delay = rand::thread_rng().gen_range(1..=ceiling);
                sleep(Duration::from_millis(delay)).await;
            }

            if self.started.elapsed() >= self.cfg.timeout {
                return Err(FarmhandError::WatchTimeout(self.cfg.timeout));
            }

            let key = self
                .job
                .server_key
                .clone()
                .ok_or(FarmhandError::NotSubmitted)?;
            let doc = self.api.fetch_status(&key).await?;
            self.job.status = Some(doc.clone());
            let state = doc.state.clone();

            if is_terminal(&state) {
                if state == "error" && self.resubmits < MAX_RESUBMITS {
                    self.resubmits += 1;
                    self.job.register(&self.api).await?;
                    // The state after a resubmission starts fresh, so a
                    // repeat of the pre-error state must be re-emitted.
                    self.last_state = None;
                    return Ok(Some(StateEvent::retry(
                        self.job.id(),
                        self.resubmits,
                        MAX_RESUBMITS,
                    )));
                }
                self.done = true;
                return Ok(Some(StateEvent::terminal(self.job.id(), &doc)));
            }

            if self.last_state.as_deref() == Some(state.as_str()) {
                continue;
            }
            self.last_state = Some(state.clone());
            return Ok(Some(StateEvent::waiting(self.job.id(), &state)));
        }
    }

    /// Drain the stream and return the final event.
    pub async fn wait(mut self) -> Result<StateEvent, FarmhandError> {
        loop {
            match self.next_event().await? {
                Some(event) if event.is_final => return Ok(event),
                Some(_) => {}
                None => return Err(FarmhandError::NoFinalEvent),
            }
        }
    }

    pub fn job(&self) -> &RemoteJob {
        &self.job
    }

    pub fn into_job(self) -> RemoteJob {
        self.job
    }
}
