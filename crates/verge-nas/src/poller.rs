//! Submission and polling of asynchronous browse jobs.
//!
//! A browse job moves through `Submitted -> Polling -> {Complete, Failed,
//! TimedOut, TransportFailed}`. [`PollTracker`] holds that state machine and
//! is free of I/O and clocks; [`JobPoller`] drives it against a
//! [`Transport`], sleeping `interval` before every poll.

use crate::models::{BrowseJob, JobStatus, DEFAULT_BROWSE_TIMEOUT};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use verge_core::query::QueryParams;
use verge_core::{ApiRequest, Error, JobKey, Result, Transport};

/// Endpoint that accepts and tracks browse jobs.
pub const BROWSE_ENDPOINT: &str = "volume_browser";

/// Default pause between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// `result` is omitted from job responses unless requested explicitly.
const POLL_FIELDS: [&str; 3] = ["id", "status", "result"];

/// Wait budget for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Total time budget
    pub timeout: Duration,
    /// Pause before each poll
    pub interval: Duration,
}

impl PollSettings {
    /// Create settings; a zero interval is raised to one millisecond.
    #[must_use]
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Number of polls allowed: `floor(timeout / interval)`.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        let attempts = self.timeout.as_nanos() / self.interval.as_nanos();
        u32::try_from(attempts).unwrap_or(u32::MAX)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(DEFAULT_BROWSE_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

/// What a single poll produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PollObservation {
    /// The job resource was read
    Snapshot(BrowseJob),
    /// The request succeeded but carried no job object
    Empty,
    /// The request failed at the HTTP layer
    TransportError(Error),
}

/// Lifecycle of a browse job as seen by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    /// Job accepted, polling not started
    Submitted,
    /// Polling; `attempts` polls made so far
    Polling {
        /// Polls made so far
        attempts: u32,
    },
    /// Job finished; raw `result` payload
    Complete(Option<Value>),
    /// Job reported an error with this message
    Failed(String),
    /// Budget exhausted while the job was still in flight
    TimedOut,
    /// Budget exhausted without a single successful poll
    TransportFailed(String),
}

impl JobState {
    /// Whether polling has stopped.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted | Self::Polling { .. })
    }
}

/// Pure transition logic for one job's polling loop.
#[derive(Debug, Clone)]
pub struct PollTracker {
    job: JobKey,
    settings: PollSettings,
    max_attempts: u32,
    attempts: u32,
    reachable: bool,
    last_transport_error: Option<Error>,
    state: JobState,
}

impl PollTracker {
    /// Track a freshly submitted job.
    #[must_use]
    pub fn new(job: JobKey, settings: PollSettings) -> Self {
        Self {
            job,
            max_attempts: settings.max_attempts(),
            settings,
            attempts: 0,
            reachable: false,
            last_transport_error: None,
            state: JobState::Submitted,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &JobState {
        &self.state
    }

    /// Polls observed so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Leave `Submitted`; an empty budget times out immediately.
    pub fn start(&mut self) -> &JobState {
        if self.state == JobState::Submitted {
            self.state = self.next_in_flight_state();
        }
        &self.state
    }

    /// Feed the outcome of one poll.
    ///
    /// Transport errors and unfinished snapshots both consume one attempt.
    /// Observations after a terminal state are ignored.
    pub fn observe(&mut self, observation: PollObservation) -> &JobState {
        if self.state.is_terminal() {
            return &self.state;
        }

        self.attempts += 1;
        match observation {
            PollObservation::Snapshot(job) => {
                self.reachable = true;
                self.state = match job.status {
                    JobStatus::Complete => JobState::Complete(job.result),
                    JobStatus::Error => JobState::Failed(job.error_message()),
                    _ => self.next_in_flight_state(),
                };
            }
            PollObservation::Empty => {
                self.reachable = true;
                self.state = self.next_in_flight_state();
            }
            PollObservation::TransportError(err) => {
                self.last_transport_error = Some(err);
                self.state = self.next_in_flight_state();
            }
        }
        &self.state
    }

    fn next_in_flight_state(&self) -> JobState {
        if self.attempts < self.max_attempts {
            return JobState::Polling {
                attempts: self.attempts,
            };
        }
        match (&self.last_transport_error, self.reachable) {
            (Some(err), false) => JobState::TransportFailed(err.to_string()),
            _ => JobState::TimedOut,
        }
    }

    /// Convert the terminal state into the caller-facing result.
    ///
    /// # Errors
    ///
    /// Returns the classified error for `Failed`, `TimedOut` and
    /// `TransportFailed`, or [`Error::InternalError`] if the job is still in
    /// flight.
    pub fn into_result(self) -> Result<Option<Value>> {
        match self.state {
            JobState::Complete(result) => Ok(result),
            JobState::Failed(message) => Err(Error::JobFailed(message)),
            JobState::TimedOut => Err(Error::JobTimeout {
                job: self.job.into_string(),
                after: self.settings.timeout,
            }),
            JobState::TransportFailed(last) => Err(Error::TransportFailed(format!(
                "no poll of browse job {} succeeded in {} attempts: {last}",
                self.job, self.attempts
            ))),
            JobState::Submitted | JobState::Polling { .. } => Err(Error::InternalError(format!(
                "browse job {} is still in flight",
                self.job
            ))),
        }
    }
}

/// Submits browse jobs and waits for their results.
#[derive(Clone)]
pub struct JobPoller {
    transport: Arc<dyn Transport>,
}

impl JobPoller {
    /// Create a poller over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create a browse job and return its key.
    ///
    /// The submission is sent exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportFailed`] when the request fails or the
    /// response carries no job key.
    pub async fn submit(&self, body: Value) -> Result<JobKey> {
        self.submit_cancellable(body, &CancellationToken::new())
            .await
    }

    /// [`submit`](Self::submit), abandoning the request when `cancel` fires.
    ///
    /// A token that is already cancelled sends nothing.
    ///
    /// # Errors
    ///
    /// As for [`submit`](Self::submit), plus [`Error::Cancelled`].
    pub async fn submit_cancellable(&self, body: Value, cancel: &CancellationToken) -> Result<JobKey> {
        let request = ApiRequest::post(BROWSE_ENDPOINT, body);
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(Error::Cancelled("browse job submission abandoned".into()));
            }
            response = self.transport.request(request) => response,
        };

        let response = response
            .map_err(|err| Error::TransportFailed(format!("submitting browse job: {err}")))?
            .filter(Value::is_object)
            .ok_or_else(|| Error::TransportFailed("no response from volume browser".into()))?;

        JobKey::from_response(&response).ok_or_else(|| {
            Error::TransportFailed("no job key returned from volume browser".into())
        })
    }

    /// Poll a job until it is terminal, the budget runs out, or `cancel` fires.
    ///
    /// Returns the job's raw `result` on completion. Each attempt is one
    /// request; the attempt budget is the only retry layer.
    ///
    /// # Errors
    ///
    /// [`Error::JobFailed`], [`Error::JobTimeout`], [`Error::TransportFailed`]
    /// or [`Error::Cancelled`].
    pub async fn await_job(
        &self,
        job: &JobKey,
        settings: PollSettings,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>> {
        let mut tracker = PollTracker::new(job.clone(), settings);
        tracker.start();

        while !tracker.state().is_terminal() {
            let observation = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(job = %job, attempts = tracker.attempts(), "browse job wait cancelled");
                    return Err(Error::Cancelled(format!("wait for browse job {job} abandoned")));
                }
                observation = self.wait_and_poll(job, settings.interval) => observation,
            };

            tracker.observe(observation);
            debug!(job = %job, attempt = tracker.attempts(), state = ?tracker.state(), "polled browse job");
        }

        match tracker.state() {
            JobState::Complete(_) => {
                info!(job = %job, attempts = tracker.attempts(), "browse job complete");
            }
            state => {
                warn!(job = %job, attempts = tracker.attempts(), ?state, "browse job did not complete");
            }
        }
        tracker.into_result()
    }

    async fn wait_and_poll(&self, job: &JobKey, interval: Duration) -> PollObservation {
        sleep(interval).await;
        self.poll_once(job).await
    }

    async fn poll_once(&self, job: &JobKey) -> PollObservation {
        let mut params = QueryParams::new();
        params.push_list("fields", POLL_FIELDS);
        let request = ApiRequest::get(format!("{BROWSE_ENDPOINT}/{job}"))
            .with_query_pairs(params.into_pairs())
            .without_retries();

        match self.transport.request(request).await {
            Ok(Some(value)) => {
                BrowseJob::from_value(&value).map_or(PollObservation::Empty, PollObservation::Snapshot)
            }
            Ok(None) => PollObservation::Empty,
            Err(err) => {
                warn!(job = %job, error = %err, "browse job poll failed; will retry");
                PollObservation::TransportError(err)
            }
        }
    }
}
