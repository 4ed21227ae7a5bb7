//! Memory collaborator boundary.
//!
//! Supplies prior context on wake and persists conversation turns. External
//! to this core; no internal caching is assumed, so each call may hit
//! durable storage directly.

use async_trait::async_trait;

use crate::error::Result;

/// Who produced a persisted turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

/// The external persistence collaborator.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Load formatted prior context for a thread (or the default thread).
    async fn load_context(&self, thread_id: Option<&str>) -> Result<String>;

    /// Persist one turn.
    async fn save_turn(&self, thread_id: Option<&str>, role: TurnRole, text: &str) -> Result<()>;
}
