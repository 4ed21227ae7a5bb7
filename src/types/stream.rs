//! Streaming types for the provider boundary.

use serde::{Deserialize, Serialize};
use strum::Display;

use super::message::ToolCall;

/// A delta emitted by a model provider during streaming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Event type.
    pub event_type: StreamEventType,
    /// Incremental text content (for `TextDelta`).
    #[serde(default)]
    pub text: String,
    /// Tool call being requested (for `ToolCallDelta`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    /// Finish reason (only on the final delta).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl StreamDelta {
    /// A text chunk.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            event_type: StreamEventType::TextDelta,
            text: text.into(),
            tool_call: None,
            finish_reason: None,
        }
    }

    /// A tool call request.
    pub fn tool_call(call: ToolCall) -> Self {
        Self {
            event_type: StreamEventType::ToolCallDelta,
            text: String::new(),
            tool_call: Some(call),
            finish_reason: None,
        }
    }

    /// End of stream.
    pub fn done() -> Self {
        Self {
            event_type: StreamEventType::Done,
            text: String::new(),
            tool_call: None,
            finish_reason: Some(FinishReason::Stop),
        }
    }
}

/// Type of stream event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventType {
    /// Incremental text content.
    TextDelta,
    /// Tool call being requested.
    ToolCallDelta,
    /// Stream finished.
    Done,
    /// Error during stream.
    Error,
}

/// Why a run (or stream) ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    /// The model finished naturally.
    Stop,
    /// The step budget was exhausted.
    Length,
    /// The caller aborted the run.
    Stopped,
}
