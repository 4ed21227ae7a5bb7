//! Run event stream types.
//!
//! Events reach the caller's [`Sink`](crate::sink::Sink) in causal order:
//! zero or more `text_delta`s, interleaved with `tool_call` → exactly one
//! matching `tool_result`/`tool_error` per call id, `step_finish` once per
//! model round, an optional `final_revised` when the quality gate rewrote
//! the draft, then exactly one terminal `finish` or `error`.

use serde::{Deserialize, Serialize};

use crate::types::FinishReason;

/// One event emitted by a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Incremental assistant text.
    TextDelta { text: String },
    /// The model requested a skill invocation.
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// A skill invocation resolved.
    ToolResult {
        id: String,
        result: serde_json::Value,
    },
    /// A skill invocation failed (non-fatal to the run).
    ToolError { id: String, error: String },
    /// One model round completed.
    StepFinish { index: usize },
    /// The quality gate rewrote the streamed draft; this text supersedes it.
    FinalRevised { text: String, score: u8 },
    /// Terminal: the run finished.
    Finish { reason: FinishReason },
    /// Terminal: the run failed.
    Error { message: String },
}

impl RunEvent {
    /// Stable event name, for name/payload transports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TextDelta { .. } => "text_delta",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::ToolError { .. } => "tool_error",
            Self::StepFinish { .. } => "step_finish",
            Self::FinalRevised { .. } => "final_revised",
            Self::Finish { .. } => "finish",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends the run. Exactly one terminal event is
    /// emitted per run, never zero, never two.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. } | Self::Error { .. })
    }
}
