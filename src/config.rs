//! Engine configuration.
//!
//! Step/token budgets and the gate threshold are tuning defaults, not
//! structural invariants; they can be overridden in code or through the
//! environment (`KESTREL_MAX_STEPS`, `KESTREL_DEEP_MAX_STEPS`,
//! `KESTREL_MAX_TOKENS`, `KESTREL_DEEP_MAX_TOKENS`,
//! `KESTREL_GATE_THRESHOLD`, `KESTREL_GATE_DISABLED`).

use crate::gate::DEFAULT_GATE_THRESHOLD;

/// Tuning knobs for a [`RunEngine`](crate::engine::RunEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model rounds per run in normal mode.
    pub max_steps: usize,
    /// Model rounds per run in deep mode.
    pub deep_max_steps: usize,
    /// Output token budget in normal mode.
    pub max_tokens: u32,
    /// Output token budget in deep mode.
    pub deep_max_tokens: u32,
    /// Quality-gate release threshold (0-100).
    pub gate_threshold: u8,
    /// Whether the quality gate runs at all.
    pub gate_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 5,
            deep_max_steps: 10,
            max_tokens: 4_096,
            deep_max_tokens: 8_192,
            gate_threshold: DEFAULT_GATE_THRESHOLD,
            gate_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Defaults layered with environment overrides.
    ///
    /// Loads `.env` if present (absence is not an error); malformed values
    /// are ignored in favor of the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Some(v) = env_parse::<usize>("KESTREL_MAX_STEPS") {
            config.max_steps = v;
        }
        if let Some(v) = env_parse::<usize>("KESTREL_DEEP_MAX_STEPS") {
            config.deep_max_steps = v;
        }
        if let Some(v) = env_parse::<u32>("KESTREL_MAX_TOKENS") {
            config.max_tokens = v;
        }
        if let Some(v) = env_parse::<u32>("KESTREL_DEEP_MAX_TOKENS") {
            config.deep_max_tokens = v;
        }
        if let Some(v) = env_parse::<u8>("KESTREL_GATE_THRESHOLD") {
            config.gate_threshold = v.min(100);
        }
        if matches!(
            std::env::var("KESTREL_GATE_DISABLED").as_deref(),
            Ok("1") | Ok("true")
        ) {
            config.gate_enabled = false;
        }

        config
    }

    /// Step budget for the given mode.
    pub fn step_budget(&self, deep: bool) -> usize {
        if deep {
            self.deep_max_steps
        } else {
            self.max_steps
        }
    }

    /// Token budget for the given mode.
    pub fn token_budget(&self, deep: bool) -> u32 {
        if deep {
            self.deep_max_tokens
        } else {
            self.max_tokens
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_tuning() {
        let config = EngineConfig::default();
        assert_eq!(config.max_steps, 5);
        assert_eq!(config.deep_max_steps, 10);
        assert_eq!(config.gate_threshold, 90);
        assert!(config.gate_enabled);
    }

    #[test]
    fn budgets_switch_on_deep_mode() {
        let config = EngineConfig::default();
        assert_eq!(config.step_budget(false), 5);
        assert_eq!(config.step_budget(true), 10);
        assert!(config.token_budget(true) > config.token_budget(false));
    }
}
