//! Reputation data model (spec §3, §4.7.1): event-sourced per-agent,
//! per-domain performance dimensions and the derived `overall` scalar.

use serde::{Deserialize, Serialize};

pub type AgentId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Science,
    Health,
    News,
    Tech,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    VerificationCorrect,
    VerificationIncorrect,
    ChallengeUpheld,
    ChallengeRebutted,
    ConsensusAligned,
    ConsensusOutlierCorrect,
    CollaborationHelpful,
    CollaborationHarmful,
}

impl EventKind {
    /// Which reputation dimension this event kind contributes to, and the
    /// raw `event_contribution` value fed into the EWMA (spec §4.7.1).
    pub fn dimension_and_contribution(self) -> (Dimension, f32) {
        match self {
            EventKind::VerificationCorrect => (Dimension::Accuracy, 1.0),
            EventKind::VerificationIncorrect => (Dimension::Accuracy, 0.0),
            EventKind::ChallengeUpheld => (Dimension::Reliability, 0.0),
            EventKind::ChallengeRebutted => (Dimension::Reliability, 1.0),
            EventKind::ConsensusAligned => (Dimension::Expertise, 0.8),
            EventKind::ConsensusOutlierCorrect => (Dimension::Expertise, 1.0),
            EventKind::CollaborationHelpful => (Dimension::Collaboration, 1.0),
            EventKind::CollaborationHarmful => (Dimension::Collaboration, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Accuracy,
    Reliability,
    Expertise,
    Collaboration,
}

/// How a `ChallengeUpheld`/`ChallengeRebutted` outcome was established, for
/// callers weighting reputation updates by evidentiary strength (SPEC_FULL §14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroundTruth {
    ExternalFeedback,
    HigherTierConfirmation,
    AdversarialOutcome,
}

#[derive(Debug, Clone)]
pub struct ReputationEvent {
    pub agent_id: AgentId,
    pub kind: EventKind,
    pub domain: Option<Domain>,
    pub ground_truth: GroundTruth,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// `{ accuracy, reliability, expertise, collaboration, overall, last_update,
/// event_count }`, each dimension in [0,1] (spec §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub accuracy: f32,
    pub reliability: f32,
    pub expertise: f32,
    pub collaboration: f32,
    pub last_update: chrono::DateTime<chrono::Utc>,
    pub event_count: u32,
}

impl ReputationRecord {
    pub const ACCURACY_WEIGHT: f32 = 0.45;
    pub const RELIABILITY_WEIGHT: f32 = 0.25;
    pub const EXPERTISE_WEIGHT: f32 = 0.20;
    pub const COLLABORATION_WEIGHT: f32 = 0.10;

    pub fn new(at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            accuracy: 0.5,
            reliability: 0.5,
            expertise: 0.5,
            collaboration: 0.5,
            last_update: at,
            event_count: 0,
        }
    }

    /// `overall = 0.45·accuracy + 0.25·reliability + 0.20·expertise + 0.10·collaboration`.
    pub fn overall(&self) -> f32 {
        Self::ACCURACY_WEIGHT * self.accuracy
            + Self::RELIABILITY_WEIGHT * self.reliability
            + Self::EXPERTISE_WEIGHT * self.expertise
            + Self::COLLABORATION_WEIGHT * self.collaboration
    }

    pub fn is_settled(&self, settle_threshold: u32) -> bool {
        self.event_count >= settle_threshold
    }

    pub(crate) fn dimension(&self, dim: Dimension) -> f32 {
        match dim {
            Dimension::Accuracy => self.accuracy,
            Dimension::Reliability => self.reliability,
            Dimension::Expertise => self.expertise,
            Dimension::Collaboration => self.collaboration,
        }
    }

    pub(crate) fn set_dimension(&mut self, dim: Dimension, value: f32) {
        let clamped = value.clamp(0.0, 1.0);
        match dim {
            Dimension::Accuracy => self.accuracy = clamped,
            Dimension::Reliability => self.reliability = clamped,
            Dimension::Expertise => self.expertise = clamped,
            Dimension::Collaboration => self.collaboration = clamped,
        }
    }
}

impl Default for ReputationRecord {
    fn default() -> Self {
        Self::new(chrono::Utc::now())
    }
}

/// Mirrors `consensusnet_core::types::SourceTier`. Kept as a standalone enum
/// here (rather than a dependency on consensusnet-core) so the dependency
/// graph stays acyclic: core depends on this crate for trust weighting, not
/// the other way around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTier {
    Academic,
    Encyclopedic,
    News,
    PrimaryDocumentation,
    Web,
}

impl SourceTier {
    /// Static ceiling/floor credibility cannot cross for this tier (§4.7.2).
    pub fn credibility_bounds(self) -> (f32, f32) {
        match self {
            SourceTier::Academic => (0.75, 1.0),
            SourceTier::Encyclopedic => (0.4, 0.9),
            SourceTier::PrimaryDocumentation => (0.5, 0.95),
            SourceTier::News => (0.2, 0.8),
            SourceTier::Web => (0.05, 0.6),
        }
    }
}

/// `{ source_tier, credibility }` tracked per URL/domain source (spec §4.7.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SourceCredibility {
    pub credibility: f32,
    pub sample_count: u32,
    pub last_update: chrono::DateTime<chrono::Utc>,
}

impl SourceCredibility {
    pub fn new(initial: f32, at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            credibility: initial.clamp(0.0, 1.0),
            sample_count: 0,
            last_update: at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReputationError {
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("unknown source: {0}")]
    UnknownSource(String),
}
