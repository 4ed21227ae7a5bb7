//! Skill trait and closure-based skill wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::arguments::SkillArguments;
use crate::error::Result;

/// JSON Schema-based parameter definition for a skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillParameters {
    /// JSON Schema object describing the parameters.
    pub schema: serde_json::Value,
}

impl SkillParameters {
    /// Create from a raw JSON Schema value.
    pub fn from_schema(schema: serde_json::Value) -> Self {
        Self { schema }
    }

    /// Create an empty parameter schema (no parameters).
    pub fn empty() -> Self {
        Self {
            schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        }
    }

    /// Builder: create an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }
}

/// Builder for constructing skill parameter schemas.
pub struct ParameterBuilder {
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    /// Add a string property.
    pub fn string(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": "string",
                "description": description.into(),
            }),
        );
        if required {
            self.required.push(name);
        }
        self
    }

    /// Add a number property.
    pub fn number(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": "number",
                "description": description.into(),
            }),
        );
        if required {
            self.required.push(name);
        }
        self
    }

    /// Add a boolean property.
    pub fn boolean(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": "boolean",
                "description": description.into(),
            }),
        );
        if required {
            self.required.push(name);
        }
        self
    }

    /// Build into SkillParameters.
    pub fn build(self) -> SkillParameters {
        SkillParameters {
            schema: serde_json::json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

/// Core skill trait — a named, schema-validated capability unit the model
/// may invoke.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Skill name (doubles as the tool name exposed to the model).
    fn name(&self) -> &str;

    /// Human-readable description, shown to the model to decide applicability.
    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &SkillParameters;

    /// Execute the skill with parsed arguments.
    async fn invoke(&self, args: &SkillArguments) -> Result<serde_json::Value>;
}

/// Type alias for the skill handler function.
type SkillHandler = dyn Fn(SkillArguments) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>
    + Send
    + Sync;

/// Closure-based skill for quick skill creation.
pub struct FnSkill {
    name: String,
    description: String,
    parameters: SkillParameters,
    handler: Arc<SkillHandler>,
}

impl FnSkill {
    /// Create a skill from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: SkillParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(SkillArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Skill for FnSkill {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &SkillParameters {
        &self.parameters
    }

    async fn invoke(&self, args: &SkillArguments) -> Result<serde_json::Value> {
        (self.handler)(args.clone()).await
    }
}

impl std::fmt::Debug for FnSkill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSkill")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_skill_invokes_handler() {
        let skill = FnSkill::new(
            "echo",
            "Echo the input back",
            SkillParameters::object()
                .string("text", "Text to echo", true)
                .build(),
            |args| async move {
                let text = args.get_str("text")?;
                Ok(serde_json::json!({ "echo": text }))
            },
        );

        let args = SkillArguments::new(serde_json::json!({ "text": "hi" }));
        let out = skill.invoke(&args).await.unwrap();
        assert_eq!(out["echo"], "hi");
    }

    #[test]
    fn parameter_builder_constructs_schema() {
        let params = SkillParameters::object()
            .string("query", "Search query", true)
            .number("limit", "Max results", false)
            .boolean("verbose", "Verbose output", false)
            .build();

        let schema = &params.schema;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["required"].as_array().unwrap().len(), 1);
    }
}
