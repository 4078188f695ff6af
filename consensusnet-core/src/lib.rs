//! ConsensusNet core: agent pool, message bus, evidence aggregation, model
//! routing, adversarial debate and trust-weighted consensus for
//! fact-verification requests.
//!
//! The single entry point is [`ConsensusNet::submit`].

pub mod agents;
pub mod bus;
pub mod consensus;
pub mod debate;
pub mod error;
pub mod evidence;
pub mod model_router;
pub mod persistence;
pub mod pool;
pub mod registry;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

use consensusnet_reputation::{DecayParams, ReputationStore, SourceCredibilityStore};

use agents::VerificationAgent;
use bus::MessageBus;
use consensus::ConsensusRule;
use error::{CoreError, CoreResult};
use evidence::EvidenceAggregator;
use model_router::ModelRouter;
use persistence::{NoopSink, PersistenceSink};
use pool::PoolManager;
use registry::{AgentRegistry, SharedRegistry};
use types::{AgentId, Claim, SubmissionMode, SubmissionResult};

pub use consensusnet_config::ConsensusNetConfig;
use consensusnet_config::ConsensusRuleName;

/// Maps the serializable `consensus.rule` config option to the engine's own
/// `ConsensusRule`; kept here rather than in `consensusnet-config` since that
/// crate has no dependency on `consensusnet-core`.
fn to_consensus_rule(name: ConsensusRuleName) -> ConsensusRule {
    match name {
        ConsensusRuleName::SimpleMajority => ConsensusRule::SimpleMajority,
        ConsensusRuleName::ConfidenceWeighted => ConsensusRule::ConfidenceWeighted,
        ConsensusRuleName::ReputationWeighted => ConsensusRule::ReputationWeighted,
        ConsensusRuleName::WeightedLabelConfidence => ConsensusRule::WeightedLabelConfidence,
    }
}

/// Top-level facade wiring the registry, bus, evidence aggregator, model
/// router and pool manager into the one external operation the rest of the
/// system needs: `Submit`.
pub struct ConsensusNet {
    registry: SharedRegistry,
    bus: Arc<MessageBus>,
    pool: PoolManager,
    persistence: Arc<dyn PersistenceSink>,
    reputation: Arc<ReputationStore>,
}

impl ConsensusNet {
    pub fn builder() -> ConsensusNetBuilder {
        ConsensusNetBuilder::default()
    }

    pub async fn submit(
        &self,
        claim_text: &str,
        mode: SubmissionMode,
        hints: types::SubmissionHints,
    ) -> CoreResult<SubmissionResult> {
        let claim = build_claim(claim_text, hints)?;
        let span = info_span!("submit", claim_id = %claim.id, mode = ?mode);

        async move {
            info!("submission received");
            let cancel = CancellationToken::new();
            let result = self.pool.submit(claim, mode, cancel).await?;
            if let Some(debate) = &result.debate {
                self.persistence
                    .record(persistence::PersistedRecord::Debate(debate.clone()))
                    .await;
            }
            Ok(result)
        }
        .instrument(span)
        .await
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn reputation(&self) -> &Arc<ReputationStore> {
        &self.reputation
    }
}

fn build_claim(claim_text: &str, hints: types::SubmissionHints) -> CoreResult<Claim> {
    if claim_text.is_empty() || claim_text.len() > Claim::MAX_LEN {
        return Err(CoreError::InputInvalid {
            reason: "claim is empty or exceeds the length cap".to_string(),
        });
    }

    let domain = hints.domain_override.unwrap_or_else(|| infer_domain(claim_text));
    let complexity = infer_complexity(claim_text);

    Ok(Claim {
        id: uuid::Uuid::new_v4(),
        text: claim_text.to_string(),
        normalized_text: claim_text.trim().to_lowercase(),
        domain,
        complexity,
        hints: types::ClaimHints {
            language: hints.language,
            urgency: hints.urgency,
            privacy: hints.privacy,
            domain_override: hints.domain_override,
        },
        created_at: chrono::Utc::now(),
    })
}

/// Heuristic, not ground truth (spec §3): a small keyword classifier
/// standing in for the source repository's NLP pipeline.
fn infer_domain(text: &str) -> types::Domain {
    let lower = text.to_lowercase();
    if lower.contains("vaccine") || lower.contains("disease") || lower.contains("health") {
        types::Domain::Health
    } else if lower.contains("hypothesis") || lower.contains("theorem") || lower.contains("proved") {
        types::Domain::Science
    } else if lower.contains("breaking") || lower.contains("today") || lower.contains("yesterday") {
        types::Domain::News
    } else if lower.contains("software") || lower.contains("api") || lower.contains("protocol") {
        types::Domain::Tech
    } else {
        types::Domain::General
    }
}

fn infer_complexity(text: &str) -> types::Complexity {
    let word_count = text.split_whitespace().count();
    if word_count > 40 {
        types::Complexity::Complex
    } else if word_count > 15 {
        types::Complexity::Moderate
    } else {
        types::Complexity::Simple
    }
}

#[derive(Default)]
pub struct ConsensusNetBuilder {
    agents: HashMap<AgentId, Arc<dyn VerificationAgent>>,
    evidence_sources: Vec<Arc<dyn evidence::EvidenceSource>>,
    cheap_backend: Option<Arc<dyn model_router::ModelBackend>>,
    reasoning_backend: Option<Arc<dyn model_router::ModelBackend>>,
    local_backend: Option<Arc<dyn model_router::ModelBackend>>,
    persistence: Option<Arc<dyn PersistenceSink>>,
    config: Option<ConsensusNetConfig>,
    reputation: Option<Arc<ReputationStore>>,
}

impl ConsensusNetBuilder {
    pub fn with_agent(mut self, agent: Arc<dyn VerificationAgent>) -> Self {
        self.agents.insert(agent.agent_id().clone(), agent);
        self
    }

    pub fn with_evidence_source(mut self, source: Arc<dyn evidence::EvidenceSource>) -> Self {
        self.evidence_sources.push(source);
        self
    }

    pub fn with_model_backends(
        mut self,
        cheap: Arc<dyn model_router::ModelBackend>,
        reasoning: Arc<dyn model_router::ModelBackend>,
        local: Arc<dyn model_router::ModelBackend>,
    ) -> Self {
        self.cheap_backend = Some(cheap);
        self.reasoning_backend = Some(reasoning);
        self.local_backend = Some(local);
        self
    }

    pub fn with_persistence(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.persistence = Some(sink);
        self
    }

    pub fn with_config(mut self, config: ConsensusNetConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Supplies a pre-populated reputation store (e.g. restored from a
    /// snapshot). Without this, a fresh store is created.
    pub fn with_reputation_store(mut self, reputation: Arc<ReputationStore>) -> Self {
        self.reputation = Some(reputation);
        self
    }

    pub fn build(self, agent_profiles: Vec<types::AgentProfile>) -> Result<ConsensusNet, String> {
        let config = self.config.unwrap_or_default();
        let registry = Arc::new(
            AgentRegistry::new(config.pool.parallelism)
                .with_settle_threshold(config.reputation.update_after_uses),
        );
        for profile in agent_profiles {
            registry.register(profile);
        }

        let evidence_aggregator = Arc::new(EvidenceAggregator::new(self.evidence_sources));

        let cheap = self.cheap_backend.ok_or("cheap model backend not configured")?;
        let reasoning = self.reasoning_backend.ok_or("reasoning model backend not configured")?;
        let local = self.local_backend.ok_or("local model backend not configured")?;
        let model_router = Arc::new(ModelRouter::new(cheap, reasoning, local));

        let bus = Arc::new(MessageBus::new());
        let reputation = self.reputation.unwrap_or_else(|| {
            Arc::new(ReputationStore::new(DecayParams {
                half_life_days: config.reputation.half_life_days as f64,
                alpha: consensusnet_reputation::DEFAULT_ALPHA,
            }))
        });
        let source_credibility = Arc::new(SourceCredibilityStore::with_beta(config.source.credibility_update_weight));

        let pool = PoolManager::new(
            registry.clone(),
            evidence_aggregator,
            model_router,
            self.agents,
            config.pool.queue_capacity,
        )
        .with_thresholds(config.consensus.threshold, 0.3)
        .with_reputation(reputation.clone())
        .with_source_credibility(source_credibility)
        .with_calibration(config.calibration)
        .with_rule(to_consensus_rule(config.consensus.rule))
        .with_parallelism(config.pool.parallelism)
        .with_adversarial(config.adversarial)
        .with_escalation_threshold(config.escalation.evidence_quality_threshold);

        Ok(ConsensusNet {
            registry,
            bus,
            pool,
            persistence: self.persistence.unwrap_or_else(|| Arc::new(NoopSink)),
            reputation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_health_domain_from_keyword() {
        assert_eq!(infer_domain("Vaccines cause autism."), types::Domain::Health);
    }

    #[test]
    fn infers_simple_complexity_for_short_claims() {
        assert_eq!(infer_complexity("Capital of Poland is Warsaw."), types::Complexity::Simple);
    }

    #[test]
    fn build_claim_rejects_empty_text() {
        let result = build_claim("", types::SubmissionHints::default());
        assert!(matches!(result, Err(CoreError::InputInvalid { .. })));
    }

    #[test]
    fn build_claim_rejects_overlong_text() {
        let long = "a".repeat(Claim::MAX_LEN + 1);
        let result = build_claim(&long, types::SubmissionHints::default());
        assert!(matches!(result, Err(CoreError::InputInvalid { .. })));
    }

    #[test]
    fn consensus_rule_name_maps_onto_matching_engine_rule() {
        assert_eq!(to_consensus_rule(ConsensusRuleName::SimpleMajority), ConsensusRule::SimpleMajority);
        assert_eq!(to_consensus_rule(ConsensusRuleName::ConfidenceWeighted), ConsensusRule::ConfidenceWeighted);
        assert_eq!(to_consensus_rule(ConsensusRuleName::ReputationWeighted), ConsensusRule::ReputationWeighted);
        assert_eq!(
            to_consensus_rule(ConsensusRuleName::WeightedLabelConfidence),
            ConsensusRule::WeightedLabelConfidence
        );
    }
}
