//! Validation for plugin candidates and tool-call arguments.

use std::sync::Arc;

use super::skill::Skill;

/// Validate a candidate skill against the descriptor contract.
///
/// A descriptor failing validation is never registered; the loader skips it
/// with a diagnostic instead of crashing. The `invoke` contract itself is
/// discharged by the [`Skill`] trait, so only the stringly invariants and
/// the schema shape are checked at load time.
pub fn validate_candidate(candidate: &Arc<dyn Skill>) -> Result<(), String> {
    if candidate.name().trim().is_empty() {
        return Err("skill name must be a non-empty string".into());
    }
    if candidate.description().trim().is_empty() {
        return Err(format!(
            "skill '{}' has an empty description",
            candidate.name()
        ));
    }
    if !candidate.parameters().schema.is_object() {
        return Err(format!(
            "skill '{}' input schema must be a JSON object, got {}",
            candidate.name(),
            json_type_name(&candidate.parameters().schema)
        ));
    }
    Ok(())
}

/// Validate tool-call arguments against a skill's JSON Schema.
///
/// Performs top-level validation: schema type check, required field
/// presence, and property type verification. Returns the first violation
/// found.
pub fn validate_arguments(
    args: &serde_json::Value,
    schema: &serde_json::Value,
) -> Result<(), String> {
    if let Some(schema_type) = schema.get("type").and_then(|v| v.as_str()) {
        if schema_type == "object" && !args.is_object() {
            return Err(format!(
                "expected object arguments, got {}",
                json_type_name(args)
            ));
        }
    }

    if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
        let obj = match args.as_object() {
            Some(obj) => obj,
            None => return Ok(()),
        };
        for field in required {
            if let Some(name) = field.as_str() {
                if !obj.contains_key(name) {
                    return Err(format!("missing required field '{name}'"));
                }
            }
        }
    }

    if let (Some(properties), Some(obj)) = (
        schema.get("properties").and_then(|v| v.as_object()),
        args.as_object(),
    ) {
        for (key, value) in obj {
            if let Some(prop_schema) = properties.get(key) {
                if let Some(expected) = prop_schema.get("type").and_then(|v| v.as_str()) {
                    if !value_matches_type(value, expected) {
                        return Err(format!(
                            "field '{}' expected type '{}', got {}",
                            key,
                            expected,
                            json_type_name(value)
                        ));
                    }
                }
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &serde_json::Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::skill::{FnSkill, SkillParameters};
    use serde_json::json;

    fn skill(name: &str, description: &str, schema: serde_json::Value) -> Arc<dyn Skill> {
        Arc::new(FnSkill::new(
            name,
            description,
            SkillParameters::from_schema(schema),
            |_| async { Ok(json!({})) },
        ))
    }

    #[test]
    fn valid_candidate_passes() {
        let s = skill("echo", "Echo input", json!({ "type": "object" }));
        assert!(validate_candidate(&s).is_ok());
    }

    #[test]
    fn empty_name_is_rejected() {
        let s = skill("  ", "desc", json!({ "type": "object" }));
        assert!(validate_candidate(&s).is_err());
    }

    #[test]
    fn empty_description_is_rejected() {
        let s = skill("echo", "", json!({ "type": "object" }));
        let err = validate_candidate(&s).unwrap_err();
        assert!(err.contains("description"));
    }

    #[test]
    fn non_object_schema_is_rejected() {
        let s = skill("echo", "desc", json!("not a schema"));
        let err = validate_candidate(&s).unwrap_err();
        assert!(err.contains("JSON object"));
    }

    #[test]
    fn rejects_missing_required_field() {
        let schema = json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        });
        let err = validate_arguments(&json!({}), &schema).unwrap_err();
        assert!(err.contains("missing required field 'path'"));
    }

    #[test]
    fn rejects_field_with_wrong_type() {
        let schema = json!({
            "type": "object",
            "properties": { "count": { "type": "integer" } },
            "required": ["count"],
        });
        let err = validate_arguments(&json!({ "count": "nope" }), &schema).unwrap_err();
        assert!(err.contains("expected type 'integer'"));
    }

    #[test]
    fn accepts_valid_args_and_extra_fields() {
        let schema = json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        });
        assert!(validate_arguments(&json!({ "path": "a", "extra": 1 }), &schema).is_ok());
    }

    #[test]
    fn rejects_non_object_args_when_schema_expects_object() {
        let schema = json!({ "type": "object", "properties": {}, "required": [] });
        let err = validate_arguments(&json!("text"), &schema).unwrap_err();
        assert!(err.contains("expected object"));
    }
}
