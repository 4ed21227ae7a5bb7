//! Convenience re-exports.

pub use crate::config::EngineConfig;
pub use crate::engine::{RunEngine, RunEvent, RunOptions, RunReport, RunStatus};
pub use crate::error::{KestrelError, Result};
pub use crate::gate::{CriticResult, GateConfig, GateOutcome, QualityGate};
pub use crate::memory::{Memory, TurnRole};
pub use crate::provider::{ModelProvider, ProviderRequest, ToolDefinition};
pub use crate::sandbox::{DenyReason, PathDecision, PathPolicy};
pub use crate::sink::{BufferSink, NullSink, Sink};
pub use crate::skills::{
    FnSkill, ParameterBuilder, Skill, SkillArguments, SkillParameters, SkillRegistry,
};
pub use crate::types::{FinishReason, ModelMessage, Role, StreamDelta, ToolCall, ToolResult};
