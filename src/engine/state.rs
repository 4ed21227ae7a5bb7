//! Per-run execution state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Lifecycle of a run: `idle → running → {completed | error | aborted}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Error,
    Aborted,
}

/// Status of one skill invocation instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Executing,
    Done,
    Error,
}

/// One skill invocation instance. Created when the model requests a call,
/// transitioned exactly once to `Done` or `Error`, never re-used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallState {
    pub id: String,
    pub skill_name: String,
    pub args: serde_json::Value,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallState {
    pub fn executing(id: impl Into<String>, skill_name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            skill_name: skill_name.into(),
            args,
            status: ToolCallStatus::Executing,
            result: None,
            error: None,
        }
    }

    pub fn complete(&mut self, result: serde_json::Value) {
        self.status = ToolCallStatus::Done;
        self.result = Some(result);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ToolCallStatus::Error;
        self.error = Some(error.into());
    }
}

/// One model round. Appended monotonically; `completed_at` is set once and
/// never rewound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub index: usize,
    pub text: String,
    pub tool_calls: Vec<ToolCallState>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Step {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            text: String::new(),
            tool_calls: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn finish(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }
}

/// The whole execution of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,
    pub task: String,
    pub steps: Vec<Step>,
    pub draft_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_text: Option<String>,
}

impl RunState {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Running,
            task: task.into(),
            steps: Vec::new(),
            draft_text: String::new(),
            final_text: None,
        }
    }

    pub fn idle() -> Self {
        Self {
            status: RunStatus::Idle,
            task: String::new(),
            steps: Vec::new(),
            draft_text: String::new(),
            final_text: None,
        }
    }
}

/// Snapshot returned to the caller when `execute` resolves.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub final_text: String,
    pub steps: usize,
}
