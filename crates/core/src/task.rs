//! Processing task record and its lifecycle state machine.
//!
//! ```text
//! pending --start--> running --complete--> completed
//!                       |----fail------> failed
//! pending|running --cancel--> cancelled
//! ```
//!
//! `completed`, `failed` and `cancelled` are terminal: every transition
//! method returns [`CoreError::InvalidTransition`] once one is reached.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{TaskId, Timestamp};

/// Lower bound of the progress scale.
pub const PROGRESS_MIN: f64 = 0.0;

/// Upper bound of the progress scale.
pub const PROGRESS_MAX: f64 = 100.0;

/// Lifecycle status of a processing task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Wire and storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if no further transitions are permitted.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::Validation(format!("Unknown task status '{other}'"))),
        }
    }
}

/// One tracked processing job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Artifact being processed, usually a file id.
    pub subject_id: String,
    pub status: TaskStatus,
    /// Percentage in `[0, 100]`.
    pub progress: f64,
    /// Opaque parameter bag handed to the chunk provider.
    pub config: serde_json::Value,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
}

impl Task {
    /// Create a new `pending` task with zero progress.
    pub fn new(subject_id: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            subject_id: subject_id.into(),
            status: TaskStatus::Pending,
            progress: PROGRESS_MIN,
            config,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `pending -> running`. Sets `started_at`.
    pub fn start(&mut self) -> Result<(), CoreError> {
        self.ensure(TaskStatus::Pending, TaskStatus::Running)?;
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Record progress while running.
    ///
    /// The value is clamped to `[0, 100]` and never lowers the current
    /// progress. Returns the progress actually stored.
    pub fn advance(&mut self, progress: f64) -> Result<f64, CoreError> {
        self.ensure(TaskStatus::Running, TaskStatus::Running)?;
        let clamped = if progress.is_nan() {
            self.progress
        } else {
            progress.clamp(PROGRESS_MIN, PROGRESS_MAX)
        };
        self.progress = self.progress.max(clamped);
        Ok(self.progress)
    }

    /// `running -> completed`. Forces progress to 100.
    pub fn complete(&mut self) -> Result<(), CoreError> {
        self.ensure(TaskStatus::Running, TaskStatus::Completed)?;
        self.status = TaskStatus::Completed;
        self.progress = PROGRESS_MAX;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `running -> failed`, capturing the error verbatim.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), CoreError> {
        self.ensure(TaskStatus::Running, TaskStatus::Failed)?;
        self.status = TaskStatus::Failed;
        self.error_message = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `pending|running -> cancelled`.
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        if self.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Cancelled,
            });
        }
        self.status = TaskStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn ensure(&self, expected: TaskStatus, to: TaskStatus) -> Result<(), CoreError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }
}
