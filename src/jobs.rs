//! Background jobs: what happens when GENESIS answers "too large, use a job".
//!
//! The deferred query is re-sent with `job=true`; GENESIS acknowledges with code 99 and names
//! the job in the status content. The job listing is then polled until the job reports
//! `Fertig`, and the result is fetched from `data/resultfile`.

use chrono::NaiveDateTime;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::client::Client;
use crate::error::{GenesisError, Result};
use crate::status::{self, JOB_ACCEPTED_CODE, NO_OBJECT_CODE, StatusClassification, StatusKind};
use crate::util::{Params, is_completion_state, params, parse_job_id};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_JOB_DEADLINE: Duration = Duration::from_secs(600);

/// Decides whether a deferred query is submitted as a background job.
#[derive(Debug, Clone, Copy, Default)]
pub enum JobPolicy {
    #[default]
    Submit,
    /// Deferred queries fail with [`GenesisError::ServiceQuery`].
    Refuse,
    /// Asked once per deferred query, before anything is submitted.
    Decide(fn(&StatusClassification) -> bool),
}

impl JobPolicy {
    pub(crate) fn allows(&self, status: &StatusClassification) -> bool {
        match self {
            Self::Submit => true,
            Self::Refuse => false,
            Self::Decide(f) => f(status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    Protocol(String),
    Timeout { waited: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Direct,
    /// Carries the status of the `job=true` answer.
    Submitted(Option<StatusClassification>),
    Polling,
    Finished,
    Failed(JobFailure),
}

#[derive(Debug, Default, Deserialize)]
struct JobListing {
    #[serde(rename = "List", default)]
    list: Vec<JobEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JobEntry {
    #[serde(rename = "Code")]
    pub(crate) code: String,
    #[serde(rename = "State", default)]
    pub(crate) state: String,
    #[serde(rename = "Date", default)]
    date: Option<String>,
    #[serde(rename = "Time", default)]
    time: Option<String>,
}

impl JobEntry {
    fn submitted(&self) -> Option<NaiveDateTime> {
        let date = self.date.as_deref()?.trim();
        let time = self.time.as_deref().unwrap_or("00:00:00").trim();
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%d.%m.%Y %H:%M:%S").ok()
    }
}

/// Newest entry for `job_id`. Entries without a timestamp rank behind dated ones.
pub(crate) fn find_job(mut entries: Vec<JobEntry>, job_id: &str) -> Option<JobEntry> {
    entries.sort_by_key(|e| std::cmp::Reverse(e.submitted()));
    entries.into_iter().find(|e| e.code.trim() == job_id)
}

pub(crate) struct JobDriver<'a> {
    client: &'a Client,
    endpoint: &'a str,
    method: &'a str,
    params: Params,
    state: JobState,
    job_id: String,
    accepted_at: Option<Instant>,
    spinner: Option<ProgressBar>,
}

impl<'a> JobDriver<'a> {
    pub(crate) fn new(client: &'a Client, endpoint: &'a str, method: &'a str, params: Params) -> Self {
        Self {
            client,
            endpoint,
            method,
            params,
            state: JobState::Direct,
            job_id: String::new(),
            accepted_at: None,
            spinner: None,
        }
    }

    /// Drives the job to a terminal state and returns the result file text.
    pub(crate) fn run(mut self) -> Result<String> {
        loop {
            let next = match std::mem::replace(&mut self.state, JobState::Direct) {
                JobState::Direct => self.submit()?,
                JobState::Submitted(status) => self.accept(status),
                JobState::Polling => self.poll()?,
                JobState::Finished => return self.fetch_result(),
                JobState::Failed(failure) => return Err(self.fail(failure)),
            };
            tracing::debug!(job = %self.job_id, state = ?next, "job state");
            self.state = next;
        }
    }

    fn submit(&self) -> Result<JobState> {
        let mut params = self.params.clone();
        params.insert("job".to_string(), "true".to_string());

        let text = self.client.call(self.endpoint, self.method, &params)?;
        let status = status::interpret(&text);
        if let Some(s) = &status {
            if s.category() == StatusKind::SystemError {
                status::surface(s)?;
            }
        }
        Ok(JobState::Submitted(status))
    }

    fn accept(&mut self, status: Option<StatusClassification>) -> JobState {
        let Some(status) = status else {
            return JobState::Failed(JobFailure::Protocol(
                "job submission was answered without a status".to_string(),
            ));
        };
        if status.code != JOB_ACCEPTED_CODE {
            return JobState::Failed(JobFailure::Protocol(format!(
                "expected job acceptance (code {}), got code {}: {}",
                JOB_ACCEPTED_CODE, status.code, status.content
            )));
        }
        let Some(job_id) = parse_job_id(&status.content) else {
            return JobState::Failed(JobFailure::Protocol(format!(
                "job accepted but no job name found in: {}",
                status.content
            )));
        };

        tracing::info!(job = %job_id, "{}", status.content);
        self.job_id = job_id;
        self.accepted_at = Some(self.client.clock.now());
        if self.client.progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} [{elapsed}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(format!("job {} submitted", self.job_id));
            self.spinner = Some(pb);
        }
        JobState::Polling
    }

    fn poll(&self) -> Result<JobState> {
        let clock = &self.client.clock;
        let interval = self.client.poll_interval;
        let deadline = self.client.job_deadline;

        let started = self.accepted_at.unwrap_or_else(|| clock.now());
        let elapsed = clock.now().saturating_duration_since(started);
        if elapsed + interval > deadline {
            return Ok(JobState::Failed(JobFailure::Timeout { waited: elapsed }));
        }

        clock.sleep(interval);

        let listing = self.client.call("catalogue", "jobs", &listing_params())?;
        let entries = parse_listing(&listing)?;

        let state = match find_job(entries, &self.job_id) {
            Some(entry) if is_completion_state(&entry.state) => {
                tracing::info!(job = %self.job_id, state = %entry.state, "job finished");
                JobState::Finished
            }
            Some(entry) => {
                tracing::info!(job = %self.job_id, state = %entry.state, "waiting for job");
                self.show(&format!("job {}: {}", self.job_id, entry.state));
                JobState::Polling
            }
            None => {
                tracing::info!(job = %self.job_id, "job not listed yet");
                self.show(&format!("job {}: not listed yet", self.job_id));
                JobState::Polling
            }
        };
        Ok(state)
    }

    fn fetch_result(&self) -> Result<String> {
        if let Some(pb) = &self.spinner {
            pb.finish_and_clear();
        }

        let result_params = params([
            ("name", self.job_id.as_str()),
            ("area", "all"),
            ("language", "de"),
        ]);
        let text = self.client.call("data", "resultfile", &result_params)?;
        if let Some(status) = status::interpret(&text) {
            if status::surface(&status)? == StatusKind::DeferredJob {
                return Err(GenesisError::Protocol(format!(
                    "result of job {} was deferred again",
                    self.job_id
                )));
            }
        }
        Ok(text)
    }

    fn fail(&self, failure: JobFailure) -> GenesisError {
        if let Some(pb) = &self.spinner {
            pb.abandon_with_message(format!("job {} failed", self.job_id));
        }

        match failure {
            JobFailure::Protocol(msg) => GenesisError::Protocol(msg),
            JobFailure::Timeout { waited } => {
                tracing::error!(job = %self.job_id, "job did not finish in time");
                GenesisError::JobTimeout {
                    job_id: self.job_id.clone(),
                    waited,
                }
            }
        }
    }

    fn show(&self, msg: &str) {
        if let Some(pb) = &self.spinner {
            pb.set_message(msg.to_string());
            pb.tick();
        }
    }
}

fn listing_params() -> Params {
    params([
        ("selection", "*"),
        ("searchcriterion", "code"),
        ("sortcriterion", "time"),
        ("type", "all"),
        ("area", "all"),
    ])
}

/// Job entries of a `catalogue/jobs` answer. "No objects found" means the job is not listed
/// yet and yields an empty list; every other error status is raised.
fn parse_listing(text: &str) -> Result<Vec<JobEntry>> {
    if let Some(status) = status::interpret(text) {
        if status.code == NO_OBJECT_CODE {
            return Ok(Vec::new());
        }
        status::surface(&status)?;
    }
    let listing: JobListing = serde_json::from_str(text)?;
    Ok(listing.list)
}
