//! Quality-gate behavior against a scripted provider.

mod common;

use pretty_assertions::assert_eq;

use common::ScriptedProvider;
use kestrel::error::KestrelError;
use kestrel::gate::{GateConfig, GateOutcome, QualityGate};

fn critic_json(grounding: u8, safety: u8, completeness: u8, instructions: &str) -> String {
    format!(
        r#"{{"grounding": {grounding}, "safety": {safety}, "completeness": {completeness}, "score": {}, "instructions": "{instructions}"}}"#,
        grounding as u16 + safety as u16 + completeness as u16
    )
}

#[tokio::test]
async fn passing_score_releases_unchanged() {
    let provider = ScriptedProvider::new(vec![])
        .with_completions(vec![Ok(critic_json(33, 33, 34, ""))]);
    let gate = QualityGate::new(&provider, GateConfig::default());

    let outcome = gate.review("a fine draft", "the task").await;
    assert_eq!(outcome, GateOutcome::Released { score: 100 });
}

#[tokio::test]
async fn failing_score_refines_exactly_once() {
    let provider = ScriptedProvider::new(vec![]).with_completions(vec![
        Ok(critic_json(20, 10, 10, "add the missing section")),
        Ok("A better draft.".into()),
    ]);
    let gate = QualityGate::new(&provider, GateConfig::default());

    let outcome = gate.review("a weak draft", "the task").await;
    assert_eq!(
        outcome,
        GateOutcome::Revised {
            text: "A better draft.".into(),
            score: 40,
        }
    );
    // The completion script is exhausted: a second critic or refiner call
    // would have errored the provider instead.
}

#[tokio::test]
async fn score_at_threshold_passes() {
    let provider = ScriptedProvider::new(vec![])
        .with_completions(vec![Ok(critic_json(30, 30, 30, ""))]);
    let gate = QualityGate::new(&provider, GateConfig { threshold: 90 });

    assert_eq!(
        gate.review("draft", "task").await,
        GateOutcome::Released { score: 90 }
    );
}

#[tokio::test]
async fn unparsable_critique_defaults_to_pass() {
    let provider = ScriptedProvider::new(vec![])
        .with_completions(vec![Ok("ship it, looks great".into())]);
    let gate = QualityGate::new(&provider, GateConfig::default());

    let verdict = gate.critique("draft", "task").await;
    assert_eq!(verdict.score, 100);
    assert_eq!(
        verdict.score,
        verdict.grounding + verdict.safety + verdict.completeness
    );
}

#[tokio::test]
async fn critic_provider_failure_is_a_defaulted_release() {
    let provider = ScriptedProvider::new(vec![])
        .with_completions(vec![Err(KestrelError::Provider("down".into()))]);
    let gate = QualityGate::new(&provider, GateConfig::default());

    assert_eq!(gate.review("draft", "task").await, GateOutcome::Defaulted);
}

#[tokio::test]
async fn unparsable_critique_is_a_defaulted_release() {
    // The review outcome tags the fallback; it is never reported as a
    // genuine passing score.
    let provider = ScriptedProvider::new(vec![])
        .with_completions(vec![Ok("ship it, looks great".into())]);
    let gate = QualityGate::new(&provider, GateConfig::default());

    assert_eq!(gate.review("draft", "task").await, GateOutcome::Defaulted);
}

#[tokio::test]
async fn refiner_failure_defaults_to_original_draft() {
    let provider = ScriptedProvider::new(vec![]).with_completions(vec![
        Ok(critic_json(10, 10, 10, "rewrite everything")),
        Err(KestrelError::Provider("down".into())),
    ]);
    let gate = QualityGate::new(&provider, GateConfig::default());

    assert_eq!(gate.review("draft", "task").await, GateOutcome::Defaulted);
}

#[tokio::test]
async fn empty_refiner_output_is_a_gate_failure() {
    let provider = ScriptedProvider::new(vec![]).with_completions(vec![
        Ok(critic_json(10, 10, 10, "rewrite")),
        Ok("   ".into()),
    ]);
    let gate = QualityGate::new(&provider, GateConfig::default());

    assert_eq!(gate.review("draft", "task").await, GateOutcome::Defaulted);
}
