//! Agent Pool Manager (spec §4.6): `Submit(claim, mode) → Result`, scheduled
//! over a bounded work queue and routed to the Evidence Aggregator, Model
//! Router and Consensus/Debate engines.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use consensusnet_config::{AdversarialSettings, CalibrationSettings};
use consensusnet_reputation::{EventKind, GroundTruth, ReputationEvent, ReputationStore, SourceCredibilityStore};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agents::VerificationAgent;
use crate::consensus::{aggregate, aggregate_with_weights, ConsensusOutcome, ConsensusRule};
use crate::debate::{run_debate, DebateContext};
use crate::error::CoreError;
use crate::evidence::EvidenceAggregator;
use crate::model_router::{ModelRouter, DEFAULT_EVIDENCE_QUALITY_THRESHOLD};
use crate::registry::SharedRegistry;
use crate::types::{
    AgentId, Claim, ConsensusSummary, DebateOutcome, Domain, Label, SubmissionMode, SubmissionResult,
    Verdict, VerdictView,
};

pub const DEFAULT_MULTI_AGENT_COUNT: usize = 3;
pub const DEFAULT_CONSENSUS_THRESHOLD: f32 = 0.7;
pub const DEFAULT_DISAGREEMENT_THRESHOLD: f32 = 0.3;
pub const DEFAULT_PER_AGENT_DEADLINE_SECS: u64 = 10;
pub const DEFAULT_SINGLE_MULTI_DEADLINE_SECS: u64 = 30;
pub const DEFAULT_ADVERSARIAL_DEADLINE_SECS: u64 = 60;
/// `pool.parallelism` default (spec §6: "Max concurrent agent tasks").
pub const DEFAULT_PARALLELISM: u32 = 4;

pub struct PoolManager {
    registry: SharedRegistry,
    evidence_aggregator: Arc<EvidenceAggregator>,
    model_router: Arc<ModelRouter>,
    agents: HashMap<AgentId, Arc<dyn VerificationAgent>>,
    queue_permits: Arc<Semaphore>,
    /// Bounds the number of submissions actually doing agent/model work at
    /// once, distinct from `queue_permits` (which only bounds admission into
    /// the queue). Sized from `pool.parallelism`.
    work_permits: Arc<Semaphore>,
    consensus_threshold: f32,
    disagreement_threshold: f32,
    reputation: Option<Arc<ReputationStore>>,
    source_credibility: Option<Arc<SourceCredibilityStore>>,
    calibration: CalibrationSettings,
    adversarial: AdversarialSettings,
    rule: ConsensusRule,
    escalation_quality_threshold: f32,
}

impl PoolManager {
    pub fn new(
        registry: SharedRegistry,
        evidence_aggregator: Arc<EvidenceAggregator>,
        model_router: Arc<ModelRouter>,
        agents: HashMap<AgentId, Arc<dyn VerificationAgent>>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            registry,
            evidence_aggregator,
            model_router,
            agents,
            queue_permits: Arc::new(Semaphore::new(queue_capacity.max(1))),
            work_permits: Arc::new(Semaphore::new(DEFAULT_PARALLELISM as usize)),
            consensus_threshold: DEFAULT_CONSENSUS_THRESHOLD,
            disagreement_threshold: DEFAULT_DISAGREEMENT_THRESHOLD,
            reputation: None,
            source_credibility: None,
            calibration: CalibrationSettings::default(),
            adversarial: AdversarialSettings::default(),
            rule: ConsensusRule::default(),
            escalation_quality_threshold: DEFAULT_EVIDENCE_QUALITY_THRESHOLD,
        }
    }

    pub fn with_thresholds(mut self, consensus_threshold: f32, disagreement_threshold: f32) -> Self {
        self.consensus_threshold = consensus_threshold;
        self.disagreement_threshold = disagreement_threshold;
        self
    }

    /// Supplies the §9/SPEC_FULL §14 calibration constants (confidence blend
    /// weights, debate adjustment deltas) from configuration instead of the
    /// crate defaults.
    pub fn with_calibration(mut self, calibration: CalibrationSettings) -> Self {
        self.calibration = calibration;
        self
    }

    /// Selects the aggregation rule `submit` applies to a verdict set
    /// (`consensus.rule`, spec §4.9). Defaults to `WeightedLabelConfidence`.
    pub fn with_rule(mut self, rule: ConsensusRule) -> Self {
        self.rule = rule;
        self
    }

    /// Bounds concurrently in-flight agent work to `parallelism`
    /// (`pool.parallelism`, spec §6), independent of `queue_capacity`.
    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.work_permits = Arc::new(Semaphore::new(parallelism.max(1) as usize));
        self
    }

    /// Supplies `adversarial.max_rounds`/`adversarial.challenge_filter` to
    /// the debate engine instead of its built-in defaults.
    pub fn with_adversarial(mut self, adversarial: AdversarialSettings) -> Self {
        self.adversarial = adversarial;
        self
    }

    /// Supplies `escalation.evidence_quality_threshold` (spec §6, §4.4) to
    /// the model-tier selection each agent performs.
    pub fn with_escalation_threshold(mut self, threshold: f32) -> Self {
        self.escalation_quality_threshold = threshold;
        self
    }

    /// Opts into reputation-weighted consensus: verdicts are weighted by
    /// each agent's current `overall` reputation score instead of uniformly
    /// (spec §4.7, §4.9's `ReputationWeighted`/`WeightedLabelConfidence`
    /// rules), and consensus outcomes feed `ConsensusAligned` events back
    /// into the store.
    pub fn with_reputation(mut self, reputation: Arc<ReputationStore>) -> Self {
        self.reputation = Some(reputation);
        self
    }

    /// Opts into adaptive source-credibility tracking (spec §4.7.2): once a
    /// consensus outcome is reached, every source a contributing verdict
    /// cited is rewarded or penalized against whether it backed the winning
    /// label.
    pub fn with_source_credibility(mut self, store: Arc<SourceCredibilityStore>) -> Self {
        self.source_credibility = Some(store);
        self
    }

    fn weight_for(&self, agent_id: &AgentId) -> f32 {
        self.reputation
            .as_ref()
            .and_then(|store| store.overall(agent_id))
            .map(|record| record.overall())
            .unwrap_or(1.0)
    }

    /// Records a `ConsensusAligned` event for every agent whose verdict
    /// matched the final aggregated label. Disagreement alone doesn't imply
    /// an agent was wrong (no ground truth is available at this point), so
    /// only the positive signal is recorded here.
    fn record_consensus_alignment(&self, verdicts: &[Verdict], outcome: &ConsensusOutcome) {
        let Some(reputation) = &self.reputation else {
            return;
        };
        let now = chrono::Utc::now();
        for verdict in verdicts {
            if verdict.label == outcome.label {
                reputation.record(&ReputationEvent {
                    agent_id: verdict.agent_id.clone(),
                    kind: EventKind::ConsensusAligned,
                    domain: None,
                    ground_truth: GroundTruth::HigherTierConfirmation,
                    timestamp: now,
                });
            }
        }
    }

    pub async fn submit(
        &self,
        claim: Claim,
        mode: SubmissionMode,
        cancel: CancellationToken,
    ) -> Result<SubmissionResult, CoreError> {
        if claim.text.is_empty() || claim.text.len() > Claim::MAX_LEN {
            return Err(CoreError::InputInvalid {
                reason: "claim is empty or exceeds the length cap".to_string(),
            });
        }

        let queue_permit = self
            .queue_permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| CoreError::Overloaded)?;

        // `pool.parallelism` bounds actual concurrent agent work, distinct
        // from the queue's admission bound above: a submission can be
        // admitted immediately but still wait here for a worker slot.
        let work_permit = self
            .work_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| CoreError::Overloaded)?;

        let started = std::time::Instant::now();
        let candidates = self.registry.capable_agents(&["verify".to_string()], claim.domain);
        if candidates.is_empty() {
            return Err(CoreError::NoCapableAgent);
        }

        let effective_mode = if candidates.len() == 1 && mode != SubmissionMode::Single {
            info!("only one agent available, degrading submission mode to single");
            SubmissionMode::Single
        } else {
            mode
        };

        let result = match effective_mode {
            SubmissionMode::Single => {
                self.run_single(&claim, &candidates[0].agent_id, &cancel).await
            }
            SubmissionMode::Multi => self.run_multi(&claim, &candidates, &cancel).await,
            SubmissionMode::Adversarial => self.run_adversarial(&claim, &candidates, &cancel).await,
        };

        drop(work_permit);
        drop(queue_permit);
        result.map(|mut r| {
            r.elapsed_ms = started.elapsed().as_millis() as u64;
            r
        })
    }

    async fn run_single(
        &self,
        claim: &Claim,
        agent_id: &AgentId,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult, CoreError> {
        let verdict = self.verify_with(agent_id, claim, cancel).await?;
        if verdict.cancelled {
            return Err(CoreError::Cancelled);
        }
        self.registry.record_completion(agent_id);
        Ok(Self::single_verdict_result(verdict))
    }

    async fn run_multi(
        &self,
        claim: &Claim,
        candidates: &[crate::types::AgentProfile],
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult, CoreError> {
        let (verdicts, agents_consulted, partial) = self.gather_verdicts(claim, candidates, cancel).await?;
        let outcome = self.aggregate_verdicts(&verdicts);
        self.record_consensus_alignment(&verdicts, &outcome);
        self.record_source_credibility(&verdicts, &outcome);
        Ok(self.build_result(outcome, verdicts, agents_consulted, None, partial, false))
    }

    async fn run_adversarial(
        &self,
        claim: &Claim,
        candidates: &[crate::types::AgentProfile],
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult, CoreError> {
        let (verdicts, agents_consulted, partial) = self.gather_verdicts(claim, candidates, cancel).await?;
        let outcome = self.aggregate_verdicts(&verdicts);
        self.record_consensus_alignment(&verdicts, &outcome);
        self.record_source_credibility(&verdicts, &outcome);

        let disagreement = 1.0 - outcome.agreement;
        if outcome.quality < self.consensus_threshold || disagreement > self.disagreement_threshold {
            let context = DebateContext {
                claim: claim.clone(),
                initial_verdict: outcome.winning_verdict(&verdicts),
                supporting_agents: agents_consulted.clone(),
            };
            let debate_outcome = run_debate(context, &self.registry, &self.calibration, &self.adversarial, cancel).await;
            return Ok(self.build_result(
                outcome,
                verdicts,
                agents_consulted,
                Some(debate_outcome.clone()),
                partial,
                debate_outcome.degraded,
            ));
        }

        Ok(self.build_result(outcome, verdicts, agents_consulted, None, partial, false))
    }

    /// Applies the configured `consensus.rule` (spec §4.9), weighting by
    /// reputation when a store is attached and uniformly otherwise.
    fn aggregate_verdicts(&self, verdicts: &[Verdict]) -> ConsensusOutcome {
        if self.reputation.is_some() {
            let weights: Vec<f32> = verdicts.iter().map(|v| self.weight_for(&v.agent_id)).collect();
            aggregate_with_weights(verdicts, self.rule, &weights)
        } else {
            aggregate(verdicts, self.rule)
        }
    }

    /// Source-credibility update (spec §4.7.2): once a consensus label is
    /// reached, every source a contributing verdict cited is rewarded or
    /// penalized against whether that verdict's label matched the outcome.
    fn record_source_credibility(&self, verdicts: &[Verdict], outcome: &ConsensusOutcome) {
        let Some(store) = &self.source_credibility else {
            return;
        };
        let now = chrono::Utc::now();
        let performance = |verdict: &Verdict| if verdict.label == outcome.label { 1.0 } else { 0.0 };
        for verdict in verdicts {
            for source_id in &verdict.sources {
                let Some(source_tier) = self.evidence_aggregator.tier_for(source_id) else {
                    continue;
                };
                let tier = to_reputation_tier(source_tier);
                store.register(source_id, tier, now);
                store.update(source_id, tier, performance(verdict), GroundTruth::HigherTierConfirmation, now);
            }
        }
    }

    async fn gather_verdicts(
        &self,
        claim: &Claim,
        candidates: &[crate::types::AgentProfile],
        cancel: &CancellationToken,
    ) -> Result<(Vec<Verdict>, Vec<AgentId>, bool), CoreError> {
        let k = DEFAULT_MULTI_AGENT_COUNT.min(candidates.len());
        let chosen = select_diverse(candidates, k, claim.domain);

        let deadline = Duration::from_secs(DEFAULT_PER_AGENT_DEADLINE_SECS);
        let futures = chosen.iter().map(|agent_id| {
            let agent_id = agent_id.clone();
            let claim = claim.clone();
            let cancel = cancel.clone();
            async move {
                let result = tokio::time::timeout(deadline, self.verify_with(&agent_id, &claim, &cancel)).await;
                match result {
                    Ok(Ok(verdict)) => Some(verdict),
                    Ok(Err(_)) => None,
                    Err(_) => {
                        warn!(agent = %agent_id, "agent exceeded per-agent deadline");
                        None
                    }
                }
            }
        });

        let results = futures::future::join_all(futures).await;
        // Cancelled verdicts are non-contributing for consensus (spec §5):
        // an agent that observed cancellation mid-flight did not really
        // "respond", so it counts toward neither the verdict set nor quorum.
        let verdicts: Vec<Verdict> = results
            .into_iter()
            .flatten()
            .filter(|v| !v.cancelled)
            .collect();

        let required = chosen.len().div_ceil(2);
        if verdicts.len() < required {
            return Err(CoreError::Incomplete {
                responded: verdicts.len(),
                required,
            });
        }

        let partial = verdicts.len() < chosen.len();
        let agents_consulted: Vec<AgentId> = verdicts.iter().map(|v| v.agent_id.clone()).collect();
        Ok((verdicts, agents_consulted, partial))
    }

    async fn verify_with(
        &self,
        agent_id: &AgentId,
        claim: &Claim,
        cancel: &CancellationToken,
    ) -> Result<Verdict, CoreError> {
        let agent = self
            .agents
            .get(agent_id)
            .ok_or(CoreError::NoCapableAgent)?
            .clone();
        Ok(agent
            .verify(
                claim,
                &self.evidence_aggregator,
                &self.model_router,
                &self.calibration,
                self.escalation_quality_threshold,
                cancel,
            )
            .await)
    }

    fn single_verdict_result(verdict: Verdict) -> SubmissionResult {
        let label = verdict.label;
        let quality = verdict.confidence;
        let degraded = verdict.degraded;
        SubmissionResult {
            verdict: VerdictView {
                label,
                confidence: verdict.confidence,
                reasoning: verdict.reasoning.clone(),
                sources: verdict.sources.clone(),
            },
            evidence_quality: verdict.evidence_quality,
            agents_consulted: vec![verdict.agent_id.clone()],
            debate: None,
            consensus: ConsensusSummary {
                rule: "single".to_string(),
                quality,
                agreement: 1.0,
            },
            elapsed_ms: 0,
            partial: false,
            degraded,
        }
    }

    fn build_result(
        &self,
        outcome: ConsensusOutcome,
        verdicts: Vec<Verdict>,
        agents_consulted: Vec<AgentId>,
        debate: Option<DebateOutcome>,
        partial: bool,
        degraded: bool,
    ) -> SubmissionResult {
        let evidence_quality = if verdicts.is_empty() {
            0.0
        } else {
            verdicts.iter().map(|v| v.evidence_quality).sum::<f32>() / verdicts.len() as f32
        };
        let degraded = degraded || verdicts.iter().any(|v| v.degraded);

        let (label, confidence, reasoning, sources) = match &debate {
            Some(d) => (
                d.refined_verdict.label,
                d.refined_verdict.confidence,
                d.refined_verdict.reasoning.clone(),
                d.refined_verdict.sources.clone(),
            ),
            None => (
                outcome.label,
                outcome.confidence,
                format!("aggregated via {} rule", outcome.rule_name),
                verdicts.iter().flat_map(|v| v.sources.clone()).collect(),
            ),
        };

        SubmissionResult {
            verdict: VerdictView {
                label,
                confidence,
                reasoning,
                sources,
            },
            evidence_quality,
            agents_consulted,
            debate,
            consensus: ConsensusSummary {
                rule: outcome.rule_name.clone(),
                quality: outcome.quality,
                agreement: outcome.agreement,
            },
            elapsed_ms: 0,
            partial,
            degraded,
        }
    }
}

/// `consensusnet-reputation::SourceTier` deliberately mirrors this crate's
/// own `SourceTier` variant-for-variant so the reputation crate can stay
/// independent of core; this is the seam between the two.
fn to_reputation_tier(tier: crate::types::SourceTier) -> consensusnet_reputation::SourceTier {
    use crate::types::SourceTier as CoreTier;
    use consensusnet_reputation::SourceTier as RepTier;
    match tier {
        CoreTier::Academic => RepTier::Academic,
        CoreTier::Encyclopedic => RepTier::Encyclopedic,
        CoreTier::News => RepTier::News,
        CoreTier::PrimaryDocumentation => RepTier::PrimaryDocumentation,
        CoreTier::Web => RepTier::Web,
    }
}

/// Pick up to `k` agents with disjoint declared strengths: prefer including
/// at least one generalist and one domain specialist if any match, then
/// fill remaining slots by ranking order.
fn select_diverse(candidates: &[crate::types::AgentProfile], k: usize, domain: Domain) -> Vec<AgentId> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }
    let mut chosen = Vec::new();
    let specialist = candidates
        .iter()
        .find(|c| c.domain_expertise.get(&domain).copied().unwrap_or(0.0) >= 0.7);
    if let Some(s) = specialist {
        chosen.push(s.agent_id.clone());
    }
    for candidate in candidates {
        if chosen.len() >= k {
            break;
        }
        if !chosen.contains(&candidate.agent_id) {
            chosen.push(candidate.agent_id.clone());
        }
    }
    chosen.truncate(k);
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_router::{BackendError, CompletionResult, ModelBackend};
    use crate::registry::AgentRegistry;
    use crate::types::ModelTier;
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    struct NoopBackend(ModelTier);

    #[async_trait]
    impl ModelBackend for NoopBackend {
        fn tier(&self) -> ModelTier {
            self.0
        }
        async fn complete(&self, _: &str, _: Duration) -> Result<CompletionResult, BackendError> {
            Ok(CompletionResult {
                text: "TRUE|0.9|stub".to_string(),
                tokens_in: 0,
                tokens_out: 0,
                latency_ms: 0,
            })
        }
    }

    fn test_pool() -> PoolManager {
        let registry = Arc::new(AgentRegistry::new(4));
        let evidence_aggregator = Arc::new(EvidenceAggregator::new(vec![]));
        let model_router = Arc::new(ModelRouter::new(
            Arc::new(NoopBackend(ModelTier::Cheap)),
            Arc::new(NoopBackend(ModelTier::Reasoning)),
            Arc::new(NoopBackend(ModelTier::Local)),
        ));
        PoolManager::new(registry, evidence_aggregator, model_router, HashMap::new(), 8)
    }

    fn verdict(agent_id: &str, label: Label, confidence: f32) -> Verdict {
        Verdict {
            id: Uuid::new_v4(),
            claim_id: Uuid::new_v4(),
            agent_id: agent_id.to_string(),
            label,
            confidence,
            reasoning: String::new(),
            sources: vec![],
            evidence_quality: 0.8,
            model_tier_used: ModelTier::Cheap,
            latency_ms: 0,
            timestamp: Utc::now(),
            cancelled: false,
            degraded: false,
        }
    }

    #[test]
    fn without_reputation_store_uniform_weights_are_used() {
        let pool = test_pool();
        assert_eq!(pool.weight_for(&"anyone".to_string()), 1.0);
    }

    #[test]
    fn reputation_weighted_aggregation_favors_higher_reputation_agent() {
        let reputation = Arc::new(ReputationStore::default());
        let now = Utc::now();
        for _ in 0..10 {
            reputation.record(&ReputationEvent {
                agent_id: "trusted".to_string(),
                kind: EventKind::VerificationCorrect,
                domain: None,
                ground_truth: GroundTruth::ExternalFeedback,
                timestamp: now,
            });
        }
        let pool = test_pool().with_reputation(reputation);

        let verdicts = vec![verdict("trusted", Label::True, 0.6), verdict("untrusted", Label::False, 0.6)];
        let outcome = pool.aggregate_verdicts(&verdicts);
        assert_eq!(outcome.label, Label::True);
    }

    #[test]
    fn configured_rule_is_used_instead_of_the_default() {
        let pool = test_pool().with_rule(ConsensusRule::SimpleMajority);
        let verdicts = vec![
            verdict("a", Label::True, 0.1),
            verdict("b", Label::False, 0.95),
            verdict("c", Label::False, 0.95),
        ];
        let outcome = pool.aggregate_verdicts(&verdicts);
        // under simple majority, two low-confidence-irrelevant False votes
        // beat one True vote even though confidence-weighted rules would not.
        assert_eq!(outcome.label, Label::False);
        assert_eq!(outcome.rule_name, "simple_majority");
    }

    #[tokio::test]
    async fn parallelism_bounds_concurrent_work_permits() {
        let pool = test_pool().with_parallelism(2);
        let first = pool.work_permits.clone().try_acquire_owned().unwrap();
        let second = pool.work_permits.clone().try_acquire_owned().unwrap();
        assert!(pool.work_permits.clone().try_acquire_owned().is_err());
        drop(first);
        assert!(pool.work_permits.clone().try_acquire_owned().is_ok());
        drop(second);
    }

    #[test]
    fn cancelled_verdicts_are_excluded_from_consensus_contribution() {
        let cancelled = Verdict::cancelled(Uuid::new_v4(), "fled".to_string(), "cancelled mid-flight");
        let live = vec![verdict("a", Label::True, 0.8), cancelled, verdict("b", Label::True, 0.8)];
        let contributing: Vec<Verdict> = live.into_iter().filter(|v| !v.cancelled).collect();
        assert_eq!(contributing.len(), 2);
        assert!(contributing.iter().all(|v| v.label == Label::True));
    }

    #[tokio::test]
    async fn source_credibility_is_updated_after_consensus() {
        use crate::evidence::StaticEvidenceSource;
        use crate::types::{EvidenceItem, SourceTier, Stance};

        let source = Arc::new(StaticEvidenceSource {
            source_name: "a".to_string(),
            items: vec![EvidenceItem {
                content: "x".to_string(),
                source_id: "arxiv.org".to_string(),
                source_tier: SourceTier::Academic,
                credibility: 0.9,
                relevance: 0.9,
                timestamp: Utc::now(),
                stance: Stance::Supports,
            }],
        });
        let evidence_aggregator = Arc::new(EvidenceAggregator::new(vec![source]));
        evidence_aggregator.gather("claim", Domain::Science).await;

        let registry = Arc::new(AgentRegistry::new(4));
        let model_router = Arc::new(ModelRouter::new(
            Arc::new(NoopBackend(ModelTier::Cheap)),
            Arc::new(NoopBackend(ModelTier::Reasoning)),
            Arc::new(NoopBackend(ModelTier::Local)),
        ));
        let store = Arc::new(SourceCredibilityStore::new());
        let pool = PoolManager::new(registry, evidence_aggregator, model_router, HashMap::new(), 8)
            .with_source_credibility(store.clone());

        let mut winning = verdict("a", Label::True, 0.9);
        winning.sources = vec!["arxiv.org".to_string()];
        let outcome = pool.aggregate_verdicts(&[winning.clone()]);

        assert!(store.credibility("arxiv.org").is_none());
        pool.record_source_credibility(&[winning], &outcome);
        assert!(store.credibility("arxiv.org").is_some());
    }

    #[test]
    fn select_diverse_includes_specialist_first() {
        use std::collections::HashMap as Map;
        let mut expertise_a = Map::new();
        expertise_a.insert(Domain::Science, 0.9);
        let mut expertise_b = Map::new();
        expertise_b.insert(Domain::Science, 0.1);

        let candidates = vec![
            crate::types::AgentProfile {
                agent_id: "generalist".to_string(),
                capabilities: vec!["verify".to_string()],
                domain_expertise: expertise_b,
                availability: crate::types::Availability::Idle,
                current_load: 0,
                reputation_overall: 0.5,
            },
            crate::types::AgentProfile {
                agent_id: "science-specialist".to_string(),
                capabilities: vec!["verify".to_string()],
                domain_expertise: expertise_a,
                availability: crate::types::Availability::Idle,
                current_load: 0,
                reputation_overall: 0.5,
            },
        ];

        let chosen = select_diverse(&candidates, 2, Domain::Science);
        assert_eq!(chosen[0], "science-specialist");
    }
}
