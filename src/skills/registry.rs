//! Dynamic skill registry.
//!
//! Owns the map of registered skills: validates candidates at load time,
//! supports enable/disable toggling, and exposes the enabled set as
//! error-capturing callable tools. The registry is the only cross-run
//! shared mutable resource: `load` fully swaps the record set and `toggle`
//! is a single atomic flip, so readers never observe a partially-updated
//! record. A dispatch in flight keeps using the callable snapshot it was
//! handed; a toggle takes effect on the next snapshot.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::skill::{Skill, SkillParameters};
use super::validation::validate_candidate;
use crate::provider::ToolDefinition;
use crate::skills::arguments::SkillArguments;

/// Runtime wrapper around a registered skill.
#[derive(Clone)]
pub struct SkillRecord {
    pub skill: Arc<dyn Skill>,
    pub enabled: bool,
    pub loaded_at: DateTime<Utc>,
}

/// Serializable management view of a registered skill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillSummary {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub loaded_at: DateTime<Utc>,
}

/// Outcome of a `load` call: what registered and what was skipped.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Names of skills that registered successfully.
    pub loaded: Vec<String>,
    /// Diagnostics for candidates that failed validation.
    pub skipped: Vec<String>,
}

/// An enabled skill wrapped so that invocation never propagates an error.
///
/// Skill failures are converted into a structured `{"error": ...}` payload
/// plus an error flag; callers never need their own catch around a call.
#[derive(Clone)]
pub struct CallableSkill {
    name: String,
    description: String,
    parameters: SkillParameters,
    skill: Arc<dyn Skill>,
}

impl CallableSkill {
    /// Wrap a skill directly, outside the registry (used for the engine's
    /// always-available core skills).
    pub fn from_skill(skill: Arc<dyn Skill>) -> Self {
        Self {
            name: skill.name().to_string(),
            description: skill.description().to_string(),
            parameters: skill.parameters().clone(),
            skill,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &SkillParameters {
        &self.parameters
    }

    /// Tool definition for the model-facing tool map.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.schema.clone(),
        }
    }

    /// Invoke the underlying skill. Never fails: errors become a
    /// `{"error": message}` result with the error flag set.
    pub async fn call(&self, args: SkillArguments) -> (serde_json::Value, bool) {
        match self.skill.invoke(&args).await {
            Ok(value) => (value, false),
            Err(err) => (serde_json::json!({ "error": err.to_string() }), true),
        }
    }
}

impl std::fmt::Debug for CallableSkill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableSkill")
            .field("name", &self.name)
            .finish()
    }
}

/// Registry of loadable capability plugins.
#[derive(Default)]
pub struct SkillRegistry {
    records: RwLock<HashMap<String, SkillRecord>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a batch of candidate skills.
    ///
    /// Invalid candidates are skipped with a diagnostic; one malformed
    /// plugin never prevents the rest from loading. The prior registration
    /// set is fully replaced. Every registered skill starts enabled.
    pub fn load(&self, candidates: Vec<Arc<dyn Skill>>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut next: HashMap<String, SkillRecord> = HashMap::new();

        for candidate in candidates {
            if let Err(reason) = validate_candidate(&candidate) {
                tracing::warn!(reason = %reason, "skipping invalid skill candidate");
                report.skipped.push(reason);
                continue;
            }
            let name = candidate.name().to_string();
            if next.contains_key(&name) {
                let reason = format!("duplicate skill name '{name}'");
                tracing::warn!(skill = %name, "skipping duplicate skill candidate");
                report.skipped.push(reason);
                continue;
            }
            next.insert(
                name.clone(),
                SkillRecord {
                    skill: candidate,
                    enabled: true,
                    loaded_at: Utc::now(),
                },
            );
            report.loaded.push(name);
        }

        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        *records = next;
        report
    }

    /// Flip a skill's enabled flag. Returns the new state, or `None` for
    /// unknown names (no-op rather than an error).
    pub fn toggle(&self, name: &str) -> Option<bool> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let record = records.get_mut(name)?;
        record.enabled = !record.enabled;
        Some(record.enabled)
    }

    /// Whether a skill is registered and enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(name).map(|r| r.enabled).unwrap_or(false)
    }

    /// Names of all registered skills, sorted.
    pub fn get_all(&self) -> Vec<String> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = records.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of enabled skills, sorted.
    pub fn get_enabled(&self) -> Vec<String> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = records
            .iter()
            .filter(|(_, r)| r.enabled)
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }

    /// Error-capturing callable view over the currently enabled skills.
    ///
    /// Returns a snapshot: toggles after this call do not affect tools
    /// already handed to an in-flight run.
    pub fn callable_skills(&self) -> Vec<CallableSkill> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut callables: Vec<CallableSkill> = records
            .values()
            .filter(|r| r.enabled)
            .map(|r| CallableSkill {
                name: r.skill.name().to_string(),
                description: r.skill.description().to_string(),
                parameters: r.skill.parameters().clone(),
                skill: r.skill.clone(),
            })
            .collect();
        callables.sort_by(|a, b| a.name.cmp(&b.name));
        callables
    }

    /// Serializable list of every registered skill, for management views.
    ///
    /// Disabled skills remain visible here even though they never appear in
    /// the model-facing capability text.
    pub fn summaries(&self) -> Vec<SkillSummary> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut summaries: Vec<SkillSummary> = records
            .values()
            .map(|r| SkillSummary {
                name: r.skill.name().to_string(),
                description: r.skill.description().to_string(),
                enabled: r.enabled,
                loaded_at: r.loaded_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Available-capabilities text injected into the model's context.
    /// Lists enabled skills only.
    pub fn capability_text(&self) -> String {
        let callables = self.callable_skills();
        if callables.is_empty() {
            return "No skills are currently available.".to_string();
        }
        let mut text = String::from("Available skills:\n");
        for c in &callables {
            text.push_str(&format!("- {}: {}\n", c.name(), c.description()));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::skill::FnSkill;
    use serde_json::json;

    fn echo_skill() -> Arc<dyn Skill> {
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

    fn malformed_skill() -> Arc<dyn Skill> {
        // Missing description.
        Arc::new(FnSkill::new("broken", "", SkillParameters::empty(), |_| {
            async { Ok(json!({})) }
        }))
    }

    fn failing_skill() -> Arc<dyn Skill> {
        Arc::new(FnSkill::new(
            "explode",
            "Always fails",
            SkillParameters::empty(),
            |_| async { Err(crate::error::KestrelError::skill("explode", "boom")) },
        ))
    }

    #[test]
    fn load_skips_malformed_candidates_without_failing() {
        let registry = SkillRegistry::new();
        let report = registry.load(vec![malformed_skill(), echo_skill()]);

        assert_eq!(report.loaded, vec!["echo".to_string()]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(registry.get_all(), vec!["echo".to_string()]);
    }

    #[test]
    fn load_replaces_prior_set() {
        let registry = SkillRegistry::new();
        registry.load(vec![echo_skill()]);
        registry.load(vec![failing_skill()]);
        assert_eq!(registry.get_all(), vec!["explode".to_string()]);
    }

    #[test]
    fn toggle_flips_and_reports_state() {
        let registry = SkillRegistry::new();
        registry.load(vec![echo_skill()]);

        assert!(registry.is_enabled("echo"));
        assert_eq!(registry.toggle("echo"), Some(false));
        assert!(!registry.is_enabled("echo"));
        assert_eq!(registry.toggle("echo"), Some(true));
        assert_eq!(registry.toggle("nonexistent"), None);
    }

    #[test]
    fn disabled_skills_leave_callable_view_but_stay_in_summaries() {
        let registry = SkillRegistry::new();
        registry.load(vec![echo_skill()]);
        registry.toggle("echo");

        assert!(registry.callable_skills().is_empty());
        assert!(!registry.capability_text().contains("echo"));

        let summaries = registry.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "echo");
        assert!(!summaries[0].enabled);
    }

    #[test]
    fn callable_names_are_subset_of_enabled() {
        let registry = SkillRegistry::new();
        registry.load(vec![echo_skill(), failing_skill()]);
        registry.toggle("explode");

        let callable_names: Vec<String> = registry
            .callable_skills()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let enabled = registry.get_enabled();
        assert!(callable_names.iter().all(|n| enabled.contains(n)));
    }

    #[test]
    fn toggle_does_not_affect_existing_snapshot() {
        let registry = SkillRegistry::new();
        registry.load(vec![echo_skill()]);

        let snapshot = registry.callable_skills();
        registry.toggle("echo");

        // The in-flight snapshot still carries the skill.
        assert_eq!(snapshot.len(), 1);
        assert!(registry.callable_skills().is_empty());
    }

    #[tokio::test]
    async fn callable_converts_failure_to_error_payload() {
        let registry = SkillRegistry::new();
        registry.load(vec![failing_skill()]);

        let callables = registry.callable_skills();
        let (value, is_error) = callables[0].call(SkillArguments::default()).await;
        assert!(is_error);
        assert!(value["error"].as_str().unwrap().contains("boom"));
    }

    #[test]
    fn duplicate_names_are_skipped() {
        let registry = SkillRegistry::new();
        let report = registry.load(vec![echo_skill(), echo_skill()]);
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].contains("duplicate"));
    }
}
