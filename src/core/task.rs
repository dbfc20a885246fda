//! Task data model for the execution graph.
//!
//! Tasks are the named units of work sequenced by the orchestrator:
//! builds, bundles, installs, test passes. Each task tracks its status
//! and timing; the action itself lives in the graph's action registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a task within a graph.
///
/// Tasks are addressed by name (`build:node`, `test:browser`, ...);
/// the newtype keeps name-keyed maps and graph indices honest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Task status in its lifecycle.
///
/// Tasks progress through these states as the executor dispatches and
/// completes them. `Aborted` marks tasks cancelled by a fail-fast
/// shutdown before or during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TaskStatus {
    /// Task declared but not yet dispatched.
    #[default]
    Pending,
    /// Task action is currently running.
    Running,
    /// Task completed successfully.
    Completed,
    /// Task failed with an error.
    Failed {
        /// Error message describing the failure.
        error: String,
    },
    /// Task was cancelled because another task failed.
    Aborted,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed { error } => write!(f, "failed: {}", error),
            TaskStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// A single task in the execution graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Name-based identity.
    pub id: TaskId,
    /// Current execution status.
    pub status: TaskStatus,
    /// When the task was declared.
    pub created_at: DateTime<Utc>,
    /// When the task's action started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Declare a new task with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            id: TaskId::new(name),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Transition to Running and record the start time.
    pub fn start(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Transition to Completed and record the completion time.
    pub fn complete(&mut self) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Transition to Failed and record the completion time.
    pub fn fail(&mut self, error: &str) {
        self.status = TaskStatus::Failed {
            error: error.to_string(),
        };
        self.completed_at = Some(Utc::now());
    }

    /// Transition to Aborted (fail-fast cancellation).
    pub fn abort(&mut self) {
        self.status = TaskStatus::Aborted;
        self.completed_at = Some(Utc::now());
    }

    /// Check if the task is in a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            TaskStatus::Completed | TaskStatus::Failed { .. } | TaskStatus::Aborted
        )
    }
}
