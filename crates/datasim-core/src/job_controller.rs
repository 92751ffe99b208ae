//! Generation job submission and status polling.
//!
//! [`JobController::submit`] posts a [`GenerationRequest`], and on success
//! spawns one polling task for the returned job id. The task queries the
//! status endpoint once per interval, applies each result to the job
//! snapshot, and notifies the registered listeners in poll order. It stops on
//! the first terminal status, on a poll failure, or when the caller abandons
//! the job through its [`JobHandle`].
//!
//! ```rust,ignore
//! let controller = JobController::new(Arc::new(ReqwestHttpClient::new()), &ApiConfig::default());
//! let handle = controller
//!     .submit_with_listener(&request, |job| println!("{} {}", job.id, job.status))
//!     .await?;
//! let finished = handle.wait().await;
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{ApiConfig, ApiEndpoints, PollConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::domain::GenerationRequest;
use crate::error::{PollError, SubmissionError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::job::{Job, JobStatus, TaskStatusPayload};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Callback invoked with the latest job snapshot after every applied poll.
pub type StatusListener = Box<dyn FnMut(&Job) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopPhase {
    Polling,
    Finished,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Updated,
    Terminal,
    Discarded,
}

struct JobState {
    job: Job,
    phase: LoopPhase,
    applied_seq: u64,
    listeners: Vec<StatusListener>,
}

impl JobState {
    fn new(job: Job, listeners: Vec<StatusListener>) -> Self {
        Self {
            job,
            phase: LoopPhase::Polling,
            applied_seq: 0,
            listeners,
        }
    }

    /// Applies the result of poll number `seq`. Results older than the last
    /// applied one, and anything arriving after the loop stopped, are dropped.
    fn apply(&mut self, seq: u64, status: JobStatus) -> Applied {
        if self.phase != LoopPhase::Polling || seq <= self.applied_seq {
            return Applied::Discarded;
        }

        self.applied_seq = seq;
        self.job.status = status;
        let terminal = self.job.is_terminal();
        if terminal {
            self.phase = LoopPhase::Finished;
        }

        let job = &self.job;
        self.listeners.retain_mut(|listener| {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(job))) {
                Ok(()) => true,
                Err(_) => {
                    warn!(job_id = %job.id, "status listener panicked, dropping it");
                    false
                }
            }
        });

        if terminal {
            Applied::Terminal
        } else {
            Applied::Updated
        }
    }
}

struct JobShared {
    state: Mutex<JobState>,
    cancel: watch::Sender<bool>,
}

impl JobShared {
    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Deserialize)]
struct CreatedTask {
    task_id: String,
}

/// Submits generation jobs and drives one polling loop per job.
#[derive(Clone)]
pub struct JobController {
    client: Arc<dyn HttpClient>,
    endpoints: ApiEndpoints,
    poll: PollConfig,
    request_timeout: Duration,
}

impl JobController {
    pub fn new(client: Arc<dyn HttpClient>, config: &ApiConfig) -> Self {
        Self {
            client,
            endpoints: config.endpoints(),
            poll: config.poll,
            request_timeout: config.request_timeout,
        }
    }

    pub fn with_endpoints(
        client: Arc<dyn HttpClient>,
        endpoints: ApiEndpoints,
        poll: PollConfig,
    ) -> Self {
        Self {
            client,
            endpoints,
            poll,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Creates the job and starts polling it. The returned handle's job is
    /// always `Pending`; the first status query runs one interval later.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, SubmissionError> {
        self.submit_with_listeners(request, Vec::new()).await
    }

    /// Like [`submit`](Self::submit), with a listener registered before the
    /// polling loop starts.
    pub async fn submit_with_listener<F>(
        &self,
        request: &GenerationRequest,
        listener: F,
    ) -> Result<JobHandle, SubmissionError>
    where
        F: FnMut(&Job) + Send + 'static,
    {
        self.submit_with_listeners(request, vec![Box::new(listener)])
            .await
    }

    async fn submit_with_listeners(
        &self,
        request: &GenerationRequest,
        listeners: Vec<StatusListener>,
    ) -> Result<JobHandle, SubmissionError> {
        let task_id = self.create_job(request).await?;
        info!(
            job_id = %task_id,
            records = request.record_count(),
            format = %request.output_format(),
            "generation job submitted"
        );
        Ok(self.spawn_poll_loop(Job::pending(task_id), listeners))
    }

    async fn create_job(&self, request: &GenerationRequest) -> Result<String, SubmissionError> {
        let body = serde_json::to_string(request).map_err(|error| SubmissionError::Encode {
            message: error.to_string(),
        })?;
        let http_request =
            HttpRequest::post_json(self.endpoints.generate(), body).with_timeout(self.request_timeout);

        let response = self
            .client
            .execute(http_request)
            .await
            .map_err(SubmissionError::Transport)?;

        if !response.is_success() {
            return Err(SubmissionError::Status {
                status_code: response.status,
                body: response.body,
            });
        }

        let created: CreatedTask =
            serde_json::from_str(&response.body).map_err(|error| {
                SubmissionError::MalformedResponse {
                    message: error.to_string(),
                }
            })?;

        if created.task_id.trim().is_empty() {
            return Err(SubmissionError::MalformedResponse {
                message: String::from("task_id is empty"),
            });
        }

        Ok(created.task_id)
    }

    fn spawn_poll_loop(&self, job: Job, listeners: Vec<StatusListener>) -> JobHandle {
        let id = job.id.clone();
        let (cancel, cancel_rx) = watch::channel(false);
        let shared = Arc::new(JobShared {
            state: Mutex::new(JobState::new(job, listeners)),
            cancel,
        });

        let poller = Poller {
            client: Arc::clone(&self.client),
            endpoints: self.endpoints.clone(),
            poll: self.poll,
            request_timeout: self.request_timeout,
            job_id: id.clone(),
        };
        let task = tokio::spawn(poller.run(Arc::clone(&shared), cancel_rx));

        JobHandle { id, shared, task }
    }
}

struct Poller {
    client: Arc<dyn HttpClient>,
    endpoints: ApiEndpoints,
    poll: PollConfig,
    request_timeout: Duration,
    job_id: String,
}

impl Poller {
    async fn run(self, shared: Arc<JobShared>, mut cancel: watch::Receiver<bool>) {
        let started = Instant::now();
        let period = self.poll.interval.max(MIN_POLL_INTERVAL);
        let mut ticker = time::interval_at(started + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seq: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.changed() => break,
                _ = ticker.tick() => {}
            }
            if *cancel.borrow() {
                break;
            }

            seq += 1;
            let status = match self.poll.deadline {
                Some(deadline) if started.elapsed() >= deadline => {
                    let error = PollError::DeadlineExceeded {
                        deadline_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                    };
                    warn!(job_id = %self.job_id, %error, "giving up on job");
                    JobStatus::Failure {
                        error: error.to_string(),
                    }
                }
                _ => {
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.changed() => break,
                        outcome = self.query_status() => outcome,
                    };
                    match outcome {
                        Ok(status) => status,
                        Err(error) => {
                            warn!(job_id = %self.job_id, %error, "status poll failed, stopping");
                            JobStatus::Failure {
                                error: error.to_string(),
                            }
                        }
                    }
                }
            };

            debug!(job_id = %self.job_id, seq, status = %status, "status poll");
            let label = status.label();
            let applied = shared.lock().apply(seq, status);
            match applied {
                Applied::Updated => {}
                Applied::Terminal => {
                    info!(job_id = %self.job_id, status = label, polls = seq, "job reached terminal state");
                    break;
                }
                Applied::Discarded => break,
            }
        }
    }

    async fn query_status(&self) -> Result<JobStatus, PollError> {
        let request = HttpRequest::get(self.endpoints.task_status(&self.job_id))
            .with_timeout(self.request_timeout);
        let response = self
            .client
            .execute(request)
            .await
            .map_err(PollError::Transport)?;

        if !response.is_success() {
            return Err(PollError::Status {
                status_code: response.status,
            });
        }

        Ok(TaskStatusPayload::parse(&response.body)?.into_status())
    }
}

/// Caller-side handle to one submitted job.
///
/// Dropping the handle does not stop polling; call [`abandon`](Self::abandon)
/// for that.
pub struct JobHandle {
    id: String,
    shared: Arc<JobShared>,
    task: JoinHandle<()>,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Latest snapshot applied by the polling loop.
    pub fn snapshot(&self) -> Job {
        self.shared.lock().job.clone()
    }

    /// Registers a listener for subsequent status updates.
    ///
    /// Listeners run on the polling task while the job state is locked, so
    /// they must not call back into this handle. A listener that panics is
    /// dropped; polling and the other listeners carry on.
    pub fn on_status_change<F>(&self, listener: F)
    where
        F: FnMut(&Job) + Send + 'static,
    {
        self.shared.lock().listeners.push(Box::new(listener));
    }

    /// Stops polling. Once this returns no listener fires again, and a status
    /// query still in flight is dropped.
    pub fn abandon(&self) {
        let mut state = self.shared.lock();
        if state.phase == LoopPhase::Polling {
            state.phase = LoopPhase::Abandoned;
            info!(job_id = %self.id, "job abandoned");
        }
        drop(state);
        self.shared.cancel.send_replace(true);
    }

    /// True once the loop has stopped for any reason.
    pub fn is_finished(&self) -> bool {
        self.shared.lock().phase != LoopPhase::Polling
    }

    pub fn is_abandoned(&self) -> bool {
        self.shared.lock().phase == LoopPhase::Abandoned
    }

    /// Waits for the polling loop to stop and returns the final snapshot.
    pub async fn wait(self) -> Job {
        let JobHandle { id, shared, task } = self;
        if let Err(error) = task.await {
            warn!(job_id = %id, %error, "polling task ended abnormally");
        }
        let job = shared.lock().job.clone();
        job
    }

    /// Stops polling and waits for the task to wind down.
    pub async fn abandon_and_wait(self) -> Job {
        self.abandon();
        self.wait().await
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
