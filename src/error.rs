//! Error types for Kestrel.

use thiserror::Error;

use crate::sandbox::DenyReason;

/// Primary error type for all Kestrel operations.
#[derive(Error, Debug)]
pub enum KestrelError {
    /// A plugin candidate or tool-call argument failed schema validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A filesystem path was denied by the sandbox policy.
    #[error("Sandbox violation ({reason}): {detail}")]
    Sandbox {
        path: String,
        reason: DenyReason,
        detail: String,
    },

    /// The model provider failed or is unreachable. Fatal to the current run.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The critic response was unparsable or the refiner failed. Never fatal.
    #[error("Gate error: {0}")]
    Gate(String),

    /// A skill invocation failed.
    #[error("Skill error: {name} — {message}")]
    Skill { name: String, message: String },

    /// Requested argument was missing or had the wrong type.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KestrelError {
    /// Create a sandbox violation for a denied path.
    pub fn sandbox(
        path: impl Into<String>,
        reason: DenyReason,
        detail: impl Into<String>,
    ) -> Self {
        Self::Sandbox {
            path: path.into(),
            reason,
            detail: detail.into(),
        }
    }

    /// Create a skill execution error.
    pub fn skill(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Skill {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, KestrelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_error_carries_reason_and_detail() {
        let err = KestrelError::sandbox(
            "server/index.ts",
            DenyReason::KernelDirectory,
            "'server/index.ts' is inside the kernel-protected directory 'server/'",
        );
        let msg = err.to_string();
        assert!(msg.contains("kernel-protected"));
        assert!(msg.contains("server/index.ts"));
    }

    #[test]
    fn validation_errors_carry_their_category_in_the_message() {
        let err = KestrelError::Validation("missing required field 'path'".into());
        let msg = err.to_string();
        assert!(msg.starts_with("Validation error"));
        assert!(msg.contains("'path'"));
    }
}
