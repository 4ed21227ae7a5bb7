//! Typed accessors over skill-call arguments.

use crate::error::{KestrelError, Result};

/// Arguments passed to a skill invocation, with typed accessors.
#[derive(Debug, Clone, Default)]
pub struct SkillArguments {
    value: serde_json::Value,
}

impl SkillArguments {
    /// Wrap a raw JSON value.
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// The raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a required string field.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| KestrelError::InvalidArgument(format!("missing string field '{key}'")))
    }

    /// Get an optional string field.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get a required integer field.
    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| KestrelError::InvalidArgument(format!("missing integer field '{key}'")))
    }

    /// Get a required boolean field.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| KestrelError::InvalidArgument(format!("missing boolean field '{key}'")))
    }
}
