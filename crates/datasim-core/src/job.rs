//! Job snapshots and the backend's task-status payload.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::PollError;

/// Progress report attached to a running job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Lifecycle state of a generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<Progress>,
    },
    Success {
        #[serde(default)]
        result: Value,
    },
    Failure {
        error: String,
    },
    Terminated,
}

impl JobStatus {
    /// Terminal statuses end the polling loop.
    pub const fn is_terminal(&self) -> bool {
        match self {
            Self::Pending | Self::Running { .. } => false,
            Self::Success { .. } | Self::Failure { .. } | Self::Terminated => true,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running { .. } => "RUNNING",
            Self::Success { .. } => "SUCCESS",
            Self::Failure { .. } => "FAILURE",
            Self::Terminated => "TERMINATED",
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of one generation job as last observed by its polling loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl Job {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.status {
            JobStatus::Success { result } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            JobStatus::Failure { error } => Some(error),
            _ => None,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Body of `GET /task-status/{task_id}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TaskStatusPayload {
    pub status: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub progress: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TaskStatusPayload {
    pub fn parse(body: &str) -> Result<Self, PollError> {
        serde_json::from_str(body).map_err(|error| PollError::Malformed {
            message: error.to_string(),
        })
    }

    pub fn into_status(self) -> JobStatus {
        match self.status.trim().to_ascii_uppercase().as_str() {
            "PENDING" => JobStatus::Pending,
            "STARTED" | "RUNNING" | "PROGRESS" | "RETRY" => JobStatus::Running {
                progress: self.progress_report(),
            },
            "SUCCESS" => JobStatus::Success {
                result: self.result.unwrap_or(Value::Null),
            },
            "FAILURE" | "ERROR" | "NOT_FOUND" => JobStatus::Failure {
                error: self
                    .error
                    .unwrap_or_else(|| format!("job reported {}", self.status)),
            },
            "TERMINATED" | "REVOKED" => JobStatus::Terminated,
            _ => {
                warn!(status = %self.status, "unrecognized task status, treating as running");
                JobStatus::Running {
                    progress: self.progress_report(),
                }
            }
        }
    }

    fn progress_report(&self) -> Option<Progress> {
        match (self.progress, self.total) {
            (None, None) if self.message.is_none() => None,
            (current, total) => Some(Progress {
                current: current.unwrap_or(0),
                total: total.unwrap_or(0),
                message: self.message.clone(),
            }),
        }
    }
}
