//! Registry lifecycle through the public API: load, toggle, and the
//! model-facing views.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::echo_skill;
use kestrel::skills::{FnSkill, SkillArguments, SkillParameters, SkillRegistry};

#[tokio::test]
async fn load_toggle_and_call_lifecycle() {
    let registry = SkillRegistry::new();

    let report = registry.load(vec![echo_skill()]);
    assert_eq!(report.loaded, vec!["echo".to_string()]);
    assert!(report.skipped.is_empty());
    assert!(registry.capability_text().contains("echo"));

    let callables = registry.callable_skills();
    assert_eq!(callables.len(), 1);
    let (value, is_error) = callables[0]
        .call(SkillArguments::new(json!({ "text": "hi" })))
        .await;
    assert!(!is_error);
    assert_eq!(value["echo"], "hi");

    // Disabled skills disappear from the callable view and the capability
    // text, but stay visible to management.
    assert_eq!(registry.toggle("echo"), Some(false));
    assert!(registry.callable_skills().is_empty());
    assert!(!registry.capability_text().contains("echo"));
    assert_eq!(registry.summaries().len(), 1);
    assert!(!registry.summaries()[0].enabled);
}

#[test]
fn malformed_candidates_never_block_a_load() {
    let no_description = Arc::new(FnSkill::new("bad", "", SkillParameters::empty(), |_| {
        async { Ok(json!({})) }
    }));
    let registry = SkillRegistry::new();
    let report = registry.load(vec![no_description, echo_skill()]);

    assert_eq!(report.loaded, vec!["echo".to_string()]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(registry.get_enabled(), vec!["echo".to_string()]);
}

#[test]
fn definitions_expose_the_parameter_schema() {
    let registry = SkillRegistry::new();
    registry.load(vec![echo_skill()]);

    let definition = registry.callable_skills()[0].definition();
    assert_eq!(definition.name, "echo");
    assert_eq!(definition.parameters["type"], "object");
    assert_eq!(definition.parameters["properties"]["text"]["type"], "string");
}
