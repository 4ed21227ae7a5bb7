//! Quality gate: a critic → refine pass applied once per completed run.
//!
//! The critic scores a draft answer on three independent axes under a
//! strict-reviewer framing; when the total falls below the configured
//! threshold the refiner rewrites the draft exactly once. The gate is an
//! enhancement, never a correctness dependency: a malformed critique is an
//! explicit, logged outcome that defaults to releasing the draft unchanged.

use serde::{Deserialize, Serialize};

use crate::error::{KestrelError, Result};
use crate::provider::{ModelProvider, ProviderRequest};

/// Score a draft must reach to be released unchanged.
pub const DEFAULT_GATE_THRESHOLD: u8 = 90;

const CRITIC_SYSTEM_PROMPT: &str = "\
You are a strict reviewer. Score the draft answer against the original task \
on three independent axes: grounding (factual support, 0-33), safety (0-33), \
and completeness (0-34). Respond with a single JSON object and nothing else: \
{\"grounding\": <int>, \"safety\": <int>, \"completeness\": <int>, \
\"score\": <sum>, \"instructions\": \"<specific fixes, empty if none>\"}";

const REFINER_SYSTEM_PROMPT: &str = "\
You rewrite draft answers. Apply the reviewer's fix instructions while \
preserving the draft's tone and format. Never mention the review process. \
Respond with the rewritten answer only.";

/// Critic verdict over a draft answer.
///
/// Invariant: `score == grounding + safety + completeness`, enforced by the
/// producer (axes are clamped and the sum recomputed), not just advisory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriticResult {
    pub grounding: u8,
    pub safety: u8,
    pub completeness: u8,
    pub score: u8,
    #[serde(default)]
    pub instructions: String,
}

impl CriticResult {
    /// The default passing verdict used when a critique is unparsable.
    pub fn default_pass() -> Self {
        Self {
            grounding: 33,
            safety: 33,
            completeness: 34,
            score: 100,
            instructions: String::new(),
        }
    }

    fn normalized(grounding: i64, safety: i64, completeness: i64, instructions: String) -> Self {
        let grounding = grounding.clamp(0, 33) as u8;
        let safety = safety.clamp(0, 33) as u8;
        let completeness = completeness.clamp(0, 34) as u8;
        Self {
            grounding,
            safety,
            completeness,
            score: grounding + safety + completeness,
            instructions,
        }
    }
}

/// Outcome of one gate invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Draft met the threshold and is released unchanged.
    Released { score: u8 },
    /// Draft fell below the threshold; the refined text replaces it.
    Revised { text: String, score: u8 },
    /// The gate itself failed (unparsable critique or refiner error);
    /// draft released unchanged.
    Defaulted,
}

/// Gate tuning knobs.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Minimum score for unchanged release.
    pub threshold: u8,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_GATE_THRESHOLD,
        }
    }
}

/// Two-stage, stateless critic → refine pipeline.
pub struct QualityGate<'a> {
    provider: &'a dyn ModelProvider,
    config: GateConfig,
}

impl<'a> QualityGate<'a> {
    pub fn new(provider: &'a dyn ModelProvider, config: GateConfig) -> Self {
        Self { provider, config }
    }

    /// Score the draft. Parsing failures never block release: they are
    /// logged and mapped to the default passing verdict.
    pub async fn critique(&self, draft: &str, task: &str) -> CriticResult {
        match self.try_critique(draft, task).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "critique failed; defaulting to pass");
                CriticResult::default_pass()
            }
        }
    }

    /// Fallible critique: provider failures and unparsable verdicts
    /// propagate, so `review` can tag the fallback outcome.
    async fn try_critique(&self, draft: &str, task: &str) -> Result<CriticResult> {
        let request = ProviderRequest::single_shot(
            CRITIC_SYSTEM_PROMPT,
            format!("Original task:\n{task}\n\nDraft answer:\n{draft}"),
        );
        let response = self.provider.complete(&request).await?;
        parse_critic_response(&response)
    }

    /// Rewrite the draft following the critic's instructions. Runs exactly
    /// once per gate invocation; there is no loop back into the critic.
    pub async fn refine(&self, draft: &str, instructions: &str, task: &str) -> Result<String> {
        let request = ProviderRequest::single_shot(
            REFINER_SYSTEM_PROMPT,
            format!(
                "Original task:\n{task}\n\nDraft answer:\n{draft}\n\nFix instructions:\n{instructions}"
            ),
        );
        let text = self.provider.complete(&request).await?;
        if text.trim().is_empty() {
            return Err(KestrelError::Gate("refiner returned empty text".into()));
        }
        Ok(text)
    }

    /// Full gate pass: critique, then refine when below threshold. A
    /// critique that fell back is a `Defaulted` release, not a passing
    /// verdict dressed up as a real score.
    pub async fn review(&self, draft: &str, task: &str) -> GateOutcome {
        let verdict = match self.try_critique(draft, task).await {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::warn!(error = %err, "critique failed; releasing draft unchanged");
                return GateOutcome::Defaulted;
            }
        };
        if verdict.score >= self.config.threshold {
            return GateOutcome::Released {
                score: verdict.score,
            };
        }
        match self.refine(draft, &verdict.instructions, task).await {
            Ok(text) => GateOutcome::Revised {
                text,
                score: verdict.score,
            },
            Err(err) => {
                tracing::warn!(error = %err, "refiner failed; releasing draft unchanged");
                GateOutcome::Defaulted
            }
        }
    }
}

/// Parse the critic's JSON verdict.
///
/// The response is expected to be a single JSON object, possibly surrounded
/// by prose; the first balanced object is extracted. Missing numeric fields
/// are a parse failure (the caller defaults to a pass).
fn parse_critic_response(response: &str) -> Result<CriticResult> {
    let json_text = extract_json_object(response)
        .ok_or_else(|| KestrelError::Gate("no JSON object in critic response".into()))?;
    let value: serde_json::Value = serde_json::from_str(json_text)
        .map_err(|e| KestrelError::Gate(format!("malformed critic JSON: {e}")))?;

    let grounding = require_int(&value, "grounding")?;
    let safety = require_int(&value, "safety")?;
    let completeness = require_int(&value, "completeness")?;
    let instructions = value
        .get("instructions")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(CriticResult::normalized(
        grounding,
        safety,
        completeness,
        instructions,
    ))
}

fn require_int(value: &serde_json::Value, field: &str) -> Result<i64> {
    value
        .get(field)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| KestrelError::Gate(format!("critic response missing numeric '{field}'")))
}

/// Find the first balanced `{...}` object in a text.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
