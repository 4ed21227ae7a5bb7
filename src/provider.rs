//! Opaque model provider boundary.
//!
//! The engine and the quality gate never know how a model is invoked; they
//! speak to anything implementing [`ModelProvider`]. A provider accepts a
//! system prompt, message history, tool definitions, and a token limit, and
//! yields either a stream of [`StreamDelta`]s or a single completed text.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ModelMessage, StreamDelta};

/// A request sent to a model provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    /// System prompt prepended to the conversation.
    pub system: Option<String>,
    /// Conversation history.
    pub messages: Vec<ModelMessage>,
    /// Tools visible to the model for this request. The model cannot call
    /// what it cannot see.
    pub tools: Vec<ToolDefinition>,
    /// Output token budget.
    pub max_tokens: Option<u32>,
}

/// Tool definition exposed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the parameters.
    pub parameters: serde_json::Value,
}

/// Core trait implemented by model providers.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name, used in diagnostics.
    fn name(&self) -> &str;

    /// Stream a response as a sequence of deltas.
    ///
    /// The returned stream yields text deltas, tool-call requests, and a
    /// final `Done`. Stream items that resolve to `Err` are fatal to the
    /// calling run.
    async fn stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<StreamDelta>>>;

    /// Generate a single completed text (no streaming, no tools).
    ///
    /// Used by the quality gate's critic and refiner calls.
    async fn complete(&self, request: &ProviderRequest) -> Result<String>;
}

impl ProviderRequest {
    /// Build a single-shot request with a system framing and one user message.
    pub fn single_shot(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            messages: vec![ModelMessage::user(user)],
            tools: Vec::new(),
            max_tokens: None,
        }
    }
}
