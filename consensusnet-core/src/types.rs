//! Core data model for ConsensusNet: claims, evidence, verdicts, challenges,
//! debate rounds, agent profiles and the message envelope that ties them
//! together. Values here are immutable once produced; only the reputation
//! and source-credibility stores (see `consensusnet-reputation`) are mutable.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ClaimId = Uuid;
pub type AgentId = String;
pub type VerdictId = Uuid;
pub type MessageId = Uuid;

/// Closed set of domain tags a claim can be heuristically classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Science,
    Health,
    News,
    Tech,
    General,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Domain::Science => "science",
            Domain::Health => "health",
            Domain::News => "news",
            Domain::Tech => "tech",
            Domain::General => "general",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimHints {
    pub language: Option<String>,
    pub urgency: Option<Urgency>,
    pub privacy: bool,
    pub domain_override: Option<Domain>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    Low,
    Normal,
    High,
}

/// Immutable textual claim plus the heuristics derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub text: String,
    pub normalized_text: String,
    pub domain: Domain,
    pub complexity: Complexity,
    pub hints: ClaimHints,
    pub created_at: DateTime<Utc>,
}

impl Claim {
    pub const MAX_LEN: usize = 4096;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    Supports,
    Contradicts,
    Neutral,
}

/// A single normalized piece of evidence returned by an `EvidenceSource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub content: String,
    pub source_id: String,
    pub source_tier: SourceTier,
    pub credibility: f32,
    pub relevance: f32,
    pub timestamp: DateTime<Utc>,
    pub stance: Stance,
}

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

/// Ordered evidence fan-out result with a derived overall quality score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub supporting: Vec<EvidenceItem>,
    pub contradicting: Vec<EvidenceItem>,
    pub neutral: Vec<EvidenceItem>,
    pub overall_quality: f32,
}

impl EvidenceBundle {
    pub fn is_empty(&self) -> bool {
        self.supporting.is_empty() && self.contradicting.is_empty() && self.neutral.is_empty()
    }

    pub fn all_items(&self) -> impl Iterator<Item = &EvidenceItem> {
        self.supporting
            .iter()
            .chain(self.contradicting.iter())
            .chain(self.neutral.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    True,
    False,
    Uncertain,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Label::True => "TRUE",
            Label::False => "FALSE",
            Label::Uncertain => "UNCERTAIN",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelTier {
    Cheap,
    Reasoning,
    Local,
}

/// An agent's immutable judgment about a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub id: VerdictId,
    pub claim_id: ClaimId,
    pub agent_id: AgentId,
    pub label: Label,
    pub confidence: f32,
    pub reasoning: String,
    pub sources: Vec<String>,
    pub evidence_quality: f32,
    pub model_tier_used: ModelTier,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
    /// Set when the agent observed cancellation before producing a real
    /// judgment (spec §5): the pool manager excludes these from consensus
    /// aggregation entirely rather than counting them as an `UNCERTAIN` vote.
    #[serde(default)]
    pub cancelled: bool,
    /// Set when the verdict was produced under a known degraded condition
    /// (e.g. `MODEL_UNAVAILABLE`, all tiers exhausted) rather than a clean
    /// run; surfaced up to `SubmissionResult.degraded` (§7).
    #[serde(default)]
    pub degraded: bool,
}

impl Verdict {
    /// Agent observed cancellation at a suspension point (§5). Non-contributing
    /// for consensus.
    pub fn cancelled(claim_id: ClaimId, agent_id: AgentId, reasoning: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            claim_id,
            agent_id,
            label: Label::Uncertain,
            confidence: 0.0,
            reasoning: reasoning.into(),
            sources: Vec::new(),
            evidence_quality: 0.0,
            model_tier_used: ModelTier::Cheap,
            latency_ms: 0,
            timestamp: Utc::now(),
            cancelled: true,
            degraded: false,
        }
    }

    /// All model tiers exhausted (`MODEL_UNAVAILABLE`, §7): unlike
    /// `cancelled`, this still contributes to consensus as an `UNCERTAIN`
    /// vote, but marks the result as degraded.
    pub fn model_unavailable(claim_id: ClaimId, agent_id: AgentId, reasoning: impl Into<String>, tier: ModelTier) -> Self {
        Self {
            id: Uuid::new_v4(),
            claim_id,
            agent_id,
            label: Label::Uncertain,
            confidence: 0.0,
            reasoning: reasoning.into(),
            sources: Vec::new(),
            evidence_quality: 0.0,
            model_tier_used: tier,
            latency_ms: 0,
            timestamp: Utc::now(),
            cancelled: false,
            degraded: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeType {
    SourceCredibility,
    EvidenceRelevance,
    LogicalFallacy,
    FactualAccuracy,
    Bias,
    Sufficiency,
    Recency,
    AlternativeExplanation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChallengeStrength {
    Weak,
    Moderate,
    Strong,
    Critical,
}

impl ChallengeStrength {
    pub fn weight(self) -> f32 {
        match self {
            ChallengeStrength::Weak => 0.1,
            ChallengeStrength::Moderate => 0.3,
            ChallengeStrength::Strong => 0.6,
            ChallengeStrength::Critical => 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub kind: ChallengeType,
    pub strength: ChallengeStrength,
    pub specificity: f32,
    pub verifiability: f32,
    pub impact: f32,
    pub target_verdict_id: VerdictId,
    pub text: String,
}

impl Challenge {
    /// `priority_score = strength_weight(strength) + 0.2*specificity + 0.3*impact`, clamped to 1.0.
    pub fn priority_score(&self) -> f32 {
        (self.strength.weight() + 0.2 * self.specificity + 0.3 * self.impact).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStance {
    Refute,
    PartiallyConcede,
    Concede,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub challenge_id: Uuid,
    pub stance: ResponseStance,
    pub text: String,
    pub supporting_evidence: Vec<EvidenceItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRound {
    pub round_index: u32,
    pub challenges: Vec<Challenge>,
    pub responses: Vec<Response>,
    pub round_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateOutcome {
    pub initial_verdict: Verdict,
    pub rounds: Vec<DebateRound>,
    pub refined_verdict: Verdict,
    pub quality_score: f32,
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Idle,
    Busy,
    Draining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: AgentId,
    pub capabilities: Vec<String>,
    pub domain_expertise: HashMap<Domain, f32>,
    pub availability: Availability,
    pub current_load: u32,
    pub reputation_overall: f32,
}

impl AgentProfile {
    pub fn has_capabilities(&self, required: &[String]) -> bool {
        required.iter().all(|c| self.capabilities.contains(c))
    }

    pub fn load_factor(&self, max_load: u32) -> f32 {
        if max_load == 0 {
            0.0
        } else {
            (self.current_load as f32 / max_load as f32).min(1.0)
        }
    }

    /// `ranking(agent, d) = 0.6*domain_expertise[d] + 0.3*reputation.overall + 0.1*(1 - load_factor)`
    pub fn ranking(&self, domain: Domain, max_load: u32) -> f32 {
        let expertise = self.domain_expertise.get(&domain).copied().unwrap_or(0.0);
        0.6 * expertise + 0.3 * self.reputation_overall + 0.1 * (1.0 - self.load_factor(max_load))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    VerificationRequest,
    VerificationResult,
    Challenge,
    Response,
    EvidenceShare,
    ConsensusVote,
    ReputationUpdate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    Unicast(AgentId),
    Broadcast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub from: AgentId,
    pub to: Recipient,
    pub kind: MessageKind,
    pub priority: Priority,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    pub ttl_ms: u64,
}

impl Message {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let deadline = self.enqueued_at + chrono::Duration::milliseconds(self.ttl_ms as i64);
        now > deadline
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionMode {
    Single,
    Multi,
    Adversarial,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionHints {
    pub language: Option<String>,
    pub domain_override: Option<Domain>,
    pub privacy: bool,
    pub urgency: Option<Urgency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusSummary {
    pub rule: String,
    pub quality: f32,
    pub agreement: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictView {
    pub label: Label,
    pub confidence: f32,
    pub reasoning: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub verdict: VerdictView,
    pub evidence_quality: f32,
    pub agents_consulted: Vec<AgentId>,
    pub debate: Option<DebateOutcome>,
    pub consensus: ConsensusSummary,
    pub elapsed_ms: u64,
    pub partial: bool,
    pub degraded: bool,
}
