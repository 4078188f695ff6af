//! `ConsensusNetConfig`: the centralized, validated configuration value
//! every component receives an immutable clone of (spec §6 table).

use serde::{Deserialize, Serialize};

use crate::validation::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusRuleName {
    SimpleMajority,
    ConfidenceWeighted,
    ReputationWeighted,
    WeightedLabelConfidence,
}

impl Default for ConsensusRuleName {
    fn default() -> Self {
        ConsensusRuleName::WeightedLabelConfidence
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusSettings {
    pub rule: ConsensusRuleName,
    /// Quality below which adversarial mode escalates (default 0.7).
    pub threshold: f32,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            rule: ConsensusRuleName::default(),
            threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AdversarialSettings {
    /// Bound on debate rounds (default 3).
    pub max_rounds: u32,
    /// Minimum priority_score to pass to Defender (default 0.3).
    pub challenge_filter: f32,
}

impl Default for AdversarialSettings {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            challenge_filter: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationSettings {
    /// Decay τ in days (default 30).
    pub half_life_days: f32,
    /// Min events before reputation is considered settled (default 10).
    pub update_after_uses: u32,
}

impl Default for ReputationSettings {
    fn default() -> Self {
        Self {
            half_life_days: 30.0,
            update_after_uses: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationSettings {
    /// Below this evidence quality, escalate model tier (default 0.65).
    pub evidence_quality_threshold: f32,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            evidence_quality_threshold: 0.65,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Max concurrent agent tasks.
    pub parallelism: u32,
    pub queue_capacity: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            parallelism: 4,
            queue_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Adaptation weight β (default 0.3).
    pub credibility_update_weight: f32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            credibility_update_weight: 0.3,
        }
    }
}

/// Calibration constants the spec calls out as empirical and therefore
/// configurable rather than hardcoded (§9 Open Question, SPEC_FULL §14).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    pub model_confidence_weight: f32,
    pub evidence_quality_weight: f32,
    pub critical_upheld_penalty: f32,
    pub rebutted_bonus: f32,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            model_confidence_weight: 0.6,
            evidence_quality_weight: 0.4,
            critical_upheld_penalty: -0.2,
            rebutted_bonus: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusNetConfig {
    pub consensus: ConsensusSettings,
    pub adversarial: AdversarialSettings,
    pub reputation: ReputationSettings,
    pub escalation: EscalationSettings,
    pub pool: PoolSettings,
    pub source: SourceSettings,
    pub calibration: CalibrationSettings,
}

impl Default for ConsensusNetConfig {
    fn default() -> Self {
        Self {
            consensus: ConsensusSettings::default(),
            adversarial: AdversarialSettings::default(),
            reputation: ReputationSettings::default(),
            escalation: EscalationSettings::default(),
            pool: PoolSettings::default(),
            source: SourceSettings::default(),
            calibration: CalibrationSettings::default(),
        }
    }
}

impl ConsensusNetConfig {
    /// Validate every option against its declared range (spec §6: "values
    /// outside declared ranges are rejected at load time with a precise
    /// error").
    pub fn validate(&self) -> ConfigResult<()> {
        in_unit_range("consensus.threshold", self.consensus.threshold)?;
        in_unit_range("adversarial.challenge_filter", self.adversarial.challenge_filter)?;
        in_unit_range(
            "escalation.evidence_quality_threshold",
            self.escalation.evidence_quality_threshold,
        )?;
        in_unit_range(
            "source.credibility_update_weight",
            self.source.credibility_update_weight,
        )?;
        in_unit_range(
            "calibration.model_confidence_weight",
            self.calibration.model_confidence_weight,
        )?;
        in_unit_range(
            "calibration.evidence_quality_weight",
            self.calibration.evidence_quality_weight,
        )?;

        if self.adversarial.max_rounds == 0 || self.adversarial.max_rounds > 10 {
            return Err(ConfigError::OutOfRange {
                option: "adversarial.max_rounds".to_string(),
                reason: "must be in 1..=10".to_string(),
            });
        }
        if self.reputation.half_life_days <= 0.0 {
            return Err(ConfigError::OutOfRange {
                option: "reputation.half_life_days".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.pool.parallelism == 0 {
            return Err(ConfigError::OutOfRange {
                option: "pool.parallelism".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pool.queue_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                option: "pool.queue_capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn in_unit_range(option: &str, value: f32) -> ConfigResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange {
            option: option.to_string(),
            reason: "must be within [0.0, 1.0]".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(ConsensusNetConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut config = ConsensusNetConfig::default();
        config.consensus.threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn zero_max_rounds_is_rejected() {
        let mut config = ConsensusNetConfig::default();
        config.adversarial.max_rounds = 0;
        assert!(config.validate().is_err());
    }
}
