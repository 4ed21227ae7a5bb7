//! Shared test doubles: a scripted provider and a recording memory.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde_json::json;

use kestrel::error::{KestrelError, Result};
use kestrel::memory::{Memory, TurnRole};
use kestrel::provider::{ModelProvider, ProviderRequest};
use kestrel::skills::{FnSkill, Skill, SkillParameters};
use kestrel::types::{StreamDelta, ToolCall};

/// One scripted model round.
pub enum Round {
    /// Yield these deltas in order, then end the stream.
    Deltas(Vec<StreamDelta>),
    /// Fail the stream call itself.
    Fail(String),
    /// Never yield anything (for cancellation tests).
    Hang,
}

/// A provider that replays canned rounds and completions.
///
/// `stream` pops the next [`Round`]; `complete` pops the next canned
/// completion. Exhausting either script is a provider error, so a test
/// fails loudly if the engine asks for more rounds than expected.
pub struct ScriptedProvider {
    rounds: Mutex<VecDeque<Round>>,
    completions: Mutex<VecDeque<Result<String>>>,
}

impl ScriptedProvider {
    pub fn new(rounds: Vec<Round>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            completions: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_completions(self, completions: Vec<Result<String>>) -> Self {
        *self.completions.lock().unwrap() = completions.into();
        self
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(
        &self,
        _request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<StreamDelta>>> {
        let round = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| KestrelError::Provider("stream script exhausted".into()))?;
        match round {
            Round::Deltas(deltas) => Ok(stream::iter(deltas.into_iter().map(Ok)).boxed()),
            Round::Fail(message) => Err(KestrelError::Provider(message)),
            Round::Hang => Ok(stream::pending().boxed()),
        }
    }

    async fn complete(&self, _request: &ProviderRequest) -> Result<String> {
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(KestrelError::Provider("completion script exhausted".into())))
    }
}

/// A memory double that serves a fixed context and records saved turns.
#[derive(Default)]
pub struct RecordingMemory {
    pub context: String,
    pub turns: Mutex<Vec<(TurnRole, String)>>,
}

impl RecordingMemory {
    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            turns: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Memory for RecordingMemory {
    async fn load_context(&self, _thread_id: Option<&str>) -> Result<String> {
        Ok(self.context.clone())
    }

    async fn save_turn(&self, _thread_id: Option<&str>, role: TurnRole, text: &str) -> Result<()> {
        self.turns.lock().unwrap().push((role, text.to_string()));
        Ok(())
    }
}

/// A registry skill that echoes its `text` argument.
pub fn echo_skill() -> Arc<dyn Skill> {
    Arc::new(FnSkill::new(
        "echo",
        "Echo the input back",
        SkillParameters::object()
            .string("text", "Text to echo", true)
            .build(),
        |args| async move {
            let text = args.get_str("text")?.to_string();
            Ok(json!({ "echo": text }))
        },
    ))
}

/// A call request the scripted model emits mid-stream.
pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> StreamDelta {
    StreamDelta::tool_call(ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    })
}
