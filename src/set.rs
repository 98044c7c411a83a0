use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::api::{JobApi, SubmitRequest};
use crate::config::WatchConfig;
use crate::error::FarmhandError;
use crate::event::StateEvent;
use crate::job::{JobParams, RemoteJob};

/// Bounded wait on the shared queue, used purely as a liveness check so a
/// worker dying without a final event cannot stall the fan-in forever.
const QUEUE_WAIT: Duration = Duration::from_secs(60);

/// A collection of jobs submitted in one batch and monitored together.
///
/// Submission order is preserved in the request payload; the merged event
/// stream is ordered by arrival time only.
pub struct JobSet {
    jobs: Vec<RemoteJob>,
}

impl JobSet {
    pub fn new(jobs: Vec<RemoteJob>) -> Self {
        Self { jobs }
    }

    /// Build a set from raw parameters, validating each job's contract.
    pub fn from_params(params: Vec<JobParams>) -> Result<Self, FarmhandError> {
        let jobs = params
            .into_iter()
            .map(RemoteJob::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(jobs))
    }

    pub fn jobs(&self) -> &[RemoteJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Register every member in a single round-trip, then distribute the
    /// server keys back to the jobs by matching client tokens. The server
    /// may reorder entries; array position is never trusted.
    pub async fn submit(&mut self, api: &impl JobApi) -> Result<(), FarmhandError> {
        if self.jobs.is_empty() {
            return Err(FarmhandError::InvalidJob("job set is empty".into()));
        }
        let req = SubmitRequest {
            jobs: self.jobs.iter().map(RemoteJob::payload).collect(),
        };
        let resp = api.submit_jobs(&req).await?;
        for entry in resp.jobs {
            let job = self
                .jobs
                .iter_mut()
                .find(|j| j.client_token() == entry.client_token)
                .ok_or(FarmhandError::UnmatchedToken(entry.client_token))?;
            job.assign_key(entry.key);
        }
        if let Some(job) = self.jobs.iter().find(|j| j.server_key().is_none()) {
            return Err(FarmhandError::UnmatchedToken(job.client_token()));
        }
        Ok(())
    }

    /// Fan the member watch streams into one merged stream.
    ///
    /// Spawns one worker task per job; each drives that job's own watcher to
    /// completion, pushing every event onto a shared channel as it occurs.
    /// The jobs move into the workers, so the set is left empty.
    pub fn watch<A>(&mut self, api: A, cfg: WatchConfig) -> SetWatcher
    where
        A: JobApi + Clone + 'static,
    {
        let jobs = std::mem::take(&mut self.jobs);
        let (tx, rx) = mpsc::unbounded_channel();
        let workers: Vec<_> = jobs
            .into_iter()
            .map(|job| tokio::spawn(drive(job, api.clone(), cfg, tx.clone())))
            .collect();
        SetWatcher {
            rx,
            remaining: workers.len(),
            workers,
            failures: Vec::new(),
        }
    }

    /// Submit-side counterpart of [`JobWatcher::wait`](crate::job::JobWatcher::wait):
    /// drain the merged stream, keeping only final events, in arrival order.
    pub async fn wait<A>(&mut self, api: A, cfg: WatchConfig) -> Vec<StateEvent>
    where
        A: JobApi + Clone + 'static,
    {
        self.watch(api, cfg).wait().await
    }
}

/// Worker body: run one job's watch to completion, forwarding every event.
async fn drive<A: JobApi>(
    job: RemoteJob,
    api: A,
    cfg: WatchConfig,
    tx: mpsc::UnboundedSender<StateEvent>,
) -> Result<(), FarmhandError> {
    let mut watcher = job.watch(api, cfg);
    while let Some(event) = watcher.next_event().await? {
        if tx.send(event).is_err() {
            // Consumer dropped the stream; nothing left to report to.
            break;
        }
    }
    Ok(())
}

/// Consumer side of the fan-in: pulls merged events off the shared channel
/// until every job has reported finality, or until the liveness check
/// determines no more events can arrive.
pub struct SetWatcher {
    rx: mpsc::UnboundedReceiver<StateEvent>,
    workers: Vec<JoinHandle<Result<(), FarmhandError>>>,
    remaining: usize,
    failures: Vec<String>,
}

impl SetWatcher {
    /// Next event from any job, in arrival order. Returns `None` once all
    /// jobs have reported a final event, or once every worker has finished
    /// without one (captured failures are reported to stderr and kept in
    /// [`failures`](Self::failures)).
    pub async fn next_event(&mut self) -> Option<StateEvent> {
        loop {
            if self.remaining == 0 {
                return None;
            }
            match timeout(QUEUE_WAIT, self.rx.recv()).await {
                Ok(Some(event)) => {
                    if event.is_final {
                        self.remaining -= 1;
                    }
                    return Some(event);
                }
                // Every sender is gone: one or more workers ended without
                // producing a final event.
                Ok(None) => {
                    self.collect_failures().await;
                    return None;
                }
                Err(_) => {
                    // Bounded wait elapsed. Abort only if every worker has
                    // already finished; otherwise keep waiting.
                    if self.workers.iter().all(|w| w.is_finished()) {
                        self.collect_failures().await;
                        return None;
                    }
                }
            }
        }
    }

    /// Drain the merged stream, returning final events in arrival order.
    /// Partial results are returned when some workers failed.
    pub async fn wait(&mut self) -> Vec<StateEvent> {
        let mut finals = Vec::new();
        while let Some(event) = self.next_event().await {
            if event.is_final {
                finals.push(event);
            }
        }
        finals
    }

    /// Diagnostics captured from workers that failed or panicked.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    async fn collect_failures(&mut self) {
        for worker in self.workers.drain(..) {
            let failure = match worker.await {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => format!("job worker failed: {err}"),
                Err(join_err) => format!("job worker panicked: {join_err}"),
            };
            eprintln!("  ✗ {failure}");
            self.failures.push(failure);
        }
    }
}
