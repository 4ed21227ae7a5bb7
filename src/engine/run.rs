//! The per-run execution state machine.
//!
//! A [`RunEngine`] drives the model provider through a bounded sequence of
//! reasoning/tool-use rounds, dispatching tool calls through the skill
//! registry and emitting ordered events to the bound [`Sink`]. At most one
//! run is active per engine: starting a new run cancels any in-flight one.
//! Each run owns a fresh [`CancellationToken`], created at start and never
//! reused; `abort()` cancels the current token and the loop still emits a
//! terminal `finish` with reason `stopped`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::events::RunEvent;
use crate::engine::state::{RunReport, RunState, RunStatus, Step, ToolCallState};
use crate::error::{KestrelError, Result};
use crate::gate::{GateConfig, GateOutcome, QualityGate};
use crate::memory::{Memory, TurnRole};
use crate::provider::{ModelProvider, ProviderRequest};
use crate::sandbox::PathPolicy;
use crate::sink::Sink;
use crate::skills::builtin::core_skills;
use crate::skills::registry::{CallableSkill, SkillRegistry};
use crate::skills::validation::validate_arguments;
use crate::skills::SkillArguments;
use crate::types::{ContentPart, FinishReason, ModelMessage, Role, StreamEventType, ToolCall};

const SYSTEM_PERSONA: &str = "\
You are Kestrel, a capable task-execution agent. Work through the task step \
by step, invoking the available skills when they help, and answer concisely \
once you have what you need.";

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Deep mode raises the step and token budgets.
    pub deep: bool,
    /// Conversation thread for the memory collaborator.
    pub thread_id: Option<String>,
    /// Optional platform-level allow list further restricting which
    /// registry skills are visible this run.
    pub enabled_skills: Option<Vec<String>>,
}

/// How a run's round loop ended. Mapped to exactly one terminal event.
enum Termination {
    Finish(FinishReason),
    Fail(String),
}

/// Outcome of dispatching one tool call.
enum Dispatch {
    /// The call resolved; feed this message back to the model.
    Completed(ModelMessage),
    /// Cancellation fired mid-call.
    Aborted,
}

/// The execution state machine for one agent.
pub struct RunEngine {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<SkillRegistry>,
    sink: Arc<dyn Sink>,
    memory: Option<Arc<dyn Memory>>,
    config: EngineConfig,
    core: Vec<CallableSkill>,
    state: tokio::sync::Mutex<RunState>,
    /// Serializes run loops so a new run starts only after the cancelled
    /// predecessor has wound down.
    run_lock: tokio::sync::Mutex<()>,
    cancel: std::sync::Mutex<Option<CancellationToken>>,
    context: std::sync::Mutex<Option<String>>,
}

impl RunEngine {
    /// Create an engine bound to a provider, skill registry, and sink, with
    /// the default path policy guarding the core filesystem skills.
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        registry: Arc<SkillRegistry>,
        sink: Arc<dyn Sink>,
        config: EngineConfig,
    ) -> Self {
        Self::with_policy(provider, registry, sink, config, Arc::new(PathPolicy::default()))
    }

    /// Create an engine with an explicit path policy.
    pub fn with_policy(
        provider: Arc<dyn ModelProvider>,
        registry: Arc<SkillRegistry>,
        sink: Arc<dyn Sink>,
        config: EngineConfig,
        policy: Arc<PathPolicy>,
    ) -> Self {
        let core = core_skills(policy)
            .into_iter()
            .map(CallableSkill::from_skill)
            .collect();
        Self {
            provider,
            registry,
            sink,
            memory: None,
            config,
            core,
            state: tokio::sync::Mutex::new(RunState::idle()),
            run_lock: tokio::sync::Mutex::new(()),
            cancel: std::sync::Mutex::new(None),
            context: std::sync::Mutex::new(None),
        }
    }

    /// Attach the memory collaborator.
    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Load static persona plus prior context from memory. Idempotent:
    /// repeated calls refresh the cached context.
    pub async fn wake(&self, thread_id: Option<&str>) -> Result<()> {
        let mut context = SYSTEM_PERSONA.to_string();
        if let Some(memory) = &self.memory {
            match memory.load_context(thread_id).await {
                Ok(prior) if !prior.trim().is_empty() => {
                    context.push_str("\n\n# Prior context\n");
                    context.push_str(&prior);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "failed to load memory context");
                }
            }
        }
        *self.context.lock().unwrap_or_else(|e| e.into_inner()) = Some(context);
        Ok(())
    }

    /// Current run status.
    pub async fn status(&self) -> RunStatus {
        self.state.lock().await.status
    }

    /// Snapshot of the last (or current) run's state. Refreshed at every
    /// completed round while a run is in flight.
    pub async fn state_snapshot(&self) -> RunState {
        self.state.lock().await.clone()
    }

    /// Cancel the in-flight run, if any. Idempotent and safe from any
    /// state; the run still emits a terminal `finish` with reason
    /// `stopped` rather than silently dropping the caller.
    pub fn abort(&self) {
        if let Some(token) = self
            .cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            token.cancel();
        }
    }

    /// Execute a task to a terminal event.
    ///
    /// Emits the ordered event sequence to the bound sink and resolves with
    /// a summary once exactly one terminal event has been delivered. A run
    /// already in flight on this engine is cancelled first.
    pub async fn execute(&self, task: &str, options: RunOptions) -> Result<RunReport> {
        if task.trim().is_empty() {
            return Err(KestrelError::InvalidArgument(
                "task must not be empty".into(),
            ));
        }

        let token = CancellationToken::new();
        {
            let mut cancel = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(prev) = cancel.replace(token.clone()) {
                prev.cancel();
            }
        }
        // Wait for the cancelled predecessor (if any) to wind down so two
        // runs never multiplex onto one sink.
        let _guard = self.run_lock.lock().await;

        let run_id = Uuid::new_v4();
        tracing::debug!(%run_id, deep = options.deep, "run start");

        {
            let mut state = self.state.lock().await;
            *state = RunState::new(task);
        }

        if let Some(memory) = &self.memory {
            if let Err(err) = memory
                .save_turn(options.thread_id.as_deref(), TurnRole::User, task)
                .await
            {
                tracing::warn!(error = %err, "failed to persist user turn");
            }
        }

        let mut run = RunState::new(task);
        let termination = self.drive(&mut run, &options, &token, run_id).await;

        let (terminal, status) = match termination {
            Termination::Finish(reason) => {
                let status = if reason == FinishReason::Stopped {
                    RunStatus::Aborted
                } else {
                    RunStatus::Completed
                };
                (RunEvent::Finish { reason }, status)
            }
            Termination::Fail(message) => (RunEvent::Error { message }, RunStatus::Error),
        };
        run.status = status;

        let final_text = run
            .final_text
            .clone()
            .unwrap_or_else(|| run.draft_text.clone());

        if status == RunStatus::Completed && !final_text.is_empty() {
            if let Some(memory) = &self.memory {
                if let Err(err) = memory
                    .save_turn(options.thread_id.as_deref(), TurnRole::Assistant, &final_text)
                    .await
                {
                    tracing::warn!(error = %err, "failed to persist assistant turn");
                }
            }
        }

        // The single terminal event for this run.
        self.sink.send(terminal);
        tracing::debug!(%run_id, status = %status, steps = run.steps.len(), "run end");

        let report = RunReport {
            status,
            final_text,
            steps: run.steps.len(),
        };
        *self.state.lock().await = run;
        Ok(report)
    }

    /// The round loop. Emits every non-terminal event; returns how the
    /// single terminal event should read.
    async fn drive(
        &self,
        run: &mut RunState,
        options: &RunOptions,
        token: &CancellationToken,
        run_id: Uuid,
    ) -> Termination {
        let budget = self.config.step_budget(options.deep);
        let max_tokens = self.config.token_budget(options.deep);
        let base_context = self
            .context
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(|| SYSTEM_PERSONA.to_string());

        let mut messages = vec![ModelMessage::user(run.task.clone())];
        let mut natural_stop = false;

        for index in 0..budget {
            let mut step = Step::new(index);

            // The enabled tool set is recomputed before each round; the
            // model cannot call what it cannot see.
            let tools = self.enabled_tools(options);
            let system = format!("{base_context}\n\n{}", self.registry.capability_text());
            let request = ProviderRequest {
                system: Some(system),
                messages: messages.clone(),
                tools: tools.values().map(|t| t.definition()).collect(),
                max_tokens: Some(max_tokens),
            };

            let mut stream = tokio::select! {
                _ = token.cancelled() => {
                    run.steps.push(step);
                    return Termination::Finish(FinishReason::Stopped);
                }
                result = self.provider.stream(&request) => match result {
                    Ok(stream) => stream,
                    Err(_) if token.is_cancelled() => {
                        run.steps.push(step);
                        return Termination::Finish(FinishReason::Stopped);
                    }
                    Err(err) => return Termination::Fail(err.to_string()),
                }
            };

            let mut calls: Vec<ToolCall> = Vec::new();
            let mut done = false;
            while !done {
                tokio::select! {
                    _ = token.cancelled() => {
                        step.finish();
                        run.steps.push(step);
                        return Termination::Finish(FinishReason::Stopped);
                    }
                    delta = stream.next() => {
                        let Some(delta) = delta else { break; };
                        match delta {
                            Ok(delta) => match delta.event_type {
                                StreamEventType::TextDelta => {
                                    if !delta.text.is_empty() {
                                        step.text.push_str(&delta.text);
                                        run.draft_text.push_str(&delta.text);
                                        self.sink.send(RunEvent::TextDelta { text: delta.text });
                                    }
                                }
                                StreamEventType::ToolCallDelta => {
                                    if let Some(mut call) = delta.tool_call {
                                        if call.id.is_empty() {
                                            call.id = Uuid::new_v4().to_string();
                                        }
                                        if !calls.iter().any(|c| c.id == call.id) {
                                            calls.push(call);
                                        }
                                    }
                                }
                                StreamEventType::Done => done = true,
                                StreamEventType::Error => {
                                    // A provider failure coinciding with a
                                    // caller-initiated abort is a stop, not
                                    // an error.
                                    if token.is_cancelled() {
                                        step.finish();
                                        run.steps.push(step);
                                        return Termination::Finish(FinishReason::Stopped);
                                    }
                                    let message = if delta.text.is_empty() {
                                        "stream error".to_string()
                                    } else {
                                        delta.text
                                    };
                                    return Termination::Fail(message);
                                }
                            },
                            Err(err) => {
                                if token.is_cancelled() {
                                    step.finish();
                                    run.steps.push(step);
                                    return Termination::Finish(FinishReason::Stopped);
                                }
                                return Termination::Fail(err.to_string());
                            }
                        }
                    }
                }
            }

            tracing::debug!(
                %run_id,
                step = index,
                tool_calls = calls.len(),
                text_len = step.text.len(),
                "round complete"
            );

            if calls.is_empty() {
                step.finish();
                run.steps.push(step);
                self.sink.send(RunEvent::StepFinish { index });
                *self.state.lock().await = run.clone();
                natural_stop = true;
                break;
            }

            let mut assistant_content: Vec<ContentPart> = Vec::new();
            if !step.text.is_empty() {
                assistant_content.push(ContentPart::Text {
                    text: step.text.clone(),
                });
            }
            for call in &calls {
                assistant_content.push(ContentPart::ToolCall(call.clone()));
            }
            messages.push(ModelMessage {
                role: Role::Assistant,
                content: assistant_content,
                timestamp: Some(Utc::now()),
            });

            for call in &calls {
                let mut call_state =
                    ToolCallState::executing(&call.id, &call.name, call.arguments.clone());
                match self.dispatch_call(&tools, call, &mut call_state, token).await {
                    Dispatch::Completed(message) => messages.push(message),
                    Dispatch::Aborted => {
                        step.tool_calls.push(call_state);
                        step.finish();
                        run.steps.push(step);
                        return Termination::Finish(FinishReason::Stopped);
                    }
                }
                step.tool_calls.push(call_state);
            }

            step.finish();
            run.steps.push(step);
            self.sink.send(RunEvent::StepFinish { index });
            // Keep the shared snapshot current round by round so callers
            // polling `state_snapshot` see progress, not just the end state.
            *self.state.lock().await = run.clone();
        }

        let reason = if natural_stop {
            FinishReason::Stop
        } else {
            FinishReason::Length
        };

        // The quality gate is an enhancement, never a correctness
        // dependency: any failure inside it keeps the draft as final.
        if self.config.gate_enabled && !run.draft_text.trim().is_empty() {
            let gate = QualityGate::new(
                self.provider.as_ref(),
                GateConfig {
                    threshold: self.config.gate_threshold,
                },
            );
            tokio::select! {
                _ = token.cancelled() => {
                    return Termination::Finish(FinishReason::Stopped);
                }
                outcome = gate.review(&run.draft_text, &run.task) => match outcome {
                    GateOutcome::Released { score } => {
                        tracing::debug!(%run_id, score, "draft released unchanged");
                    }
                    GateOutcome::Revised { text, score } => {
                        tracing::debug!(%run_id, score, "draft revised by quality gate");
                        run.final_text = Some(text.clone());
                        self.sink.send(RunEvent::FinalRevised { text, score });
                    }
                    GateOutcome::Defaulted => {
                        tracing::warn!(%run_id, "quality gate defaulted; releasing draft");
                    }
                }
            }
        }

        Termination::Finish(reason)
    }

    /// Dispatch one tool call: emit `tool_call`, validate arguments,
    /// invoke, and emit exactly one matching `tool_result` or `tool_error`.
    /// Skill failures never abort the run.
    async fn dispatch_call(
        &self,
        tools: &HashMap<String, CallableSkill>,
        call: &ToolCall,
        call_state: &mut ToolCallState,
        token: &CancellationToken,
    ) -> Dispatch {
        self.sink.send(RunEvent::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        let Some(tool) = tools.get(&call.name) else {
            let error = format!("skill '{}' is not available", call.name);
            return Dispatch::Completed(self.fail_call(call, call_state, error));
        };

        if let Err(reason) = validate_arguments(&call.arguments, &tool.parameters().schema) {
            let error = KestrelError::Validation(format!(
                "invalid arguments for '{}': {reason}",
                call.name
            ));
            return Dispatch::Completed(self.fail_call(call, call_state, error.to_string()));
        }

        let args = SkillArguments::new(call.arguments.clone());
        tokio::select! {
            _ = token.cancelled() => {
                // The call was announced; it still gets its error event so
                // every tool_call has exactly one matching outcome.
                let _ = self.fail_call(call, call_state, "run aborted".to_string());
                Dispatch::Aborted
            }
            (value, is_error) = tool.call(args) => {
                if is_error {
                    let error = value["error"]
                        .as_str()
                        .unwrap_or("skill failed")
                        .to_string();
                    Dispatch::Completed(self.fail_call(call, call_state, error))
                } else {
                    call_state.complete(value.clone());
                    self.sink.send(RunEvent::ToolResult {
                        id: call.id.clone(),
                        result: value.clone(),
                    });
                    Dispatch::Completed(ModelMessage::tool_result(call.id.clone(), value, false))
                }
            }
        }
    }

    /// Record a call failure: state transition, `tool_error` event, and the
    /// structured error payload fed back to the model.
    fn fail_call(
        &self,
        call: &ToolCall,
        call_state: &mut ToolCallState,
        error: String,
    ) -> ModelMessage {
        tracing::warn!(skill = %call.name, error = %error, "tool call failed");
        call_state.fail(&error);
        self.sink.send(RunEvent::ToolError {
            id: call.id.clone(),
            error: error.clone(),
        });
        ModelMessage::tool_result(
            call.id.clone(),
            serde_json::json!({ "error": error }),
            true,
        )
    }

    /// Enabled tool set for one round: core skills ∪ enabled registry
    /// skills (optionally restricted by the run's allow list). Core skills
    /// take precedence on name collisions.
    fn enabled_tools(&self, options: &RunOptions) -> HashMap<String, CallableSkill> {
        let mut tools: HashMap<String, CallableSkill> = HashMap::new();
        for tool in &self.core {
            tools.insert(tool.name().to_string(), tool.clone());
        }
        for tool in self.registry.callable_skills() {
            if let Some(allowed) = &options.enabled_skills {
                if !allowed.iter().any(|n| n == tool.name()) {
                    continue;
                }
            }
            tools.entry(tool.name().to_string()).or_insert(tool);
        }
        tools
    }
}
