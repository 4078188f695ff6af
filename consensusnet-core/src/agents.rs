//! Verification Agents (spec §4.5): the base `Verify(claim) → Verdict`
//! algorithm plus the three mandatory specializations (science, news, tech).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use consensusnet_config::CalibrationSettings;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::evidence::EvidenceAggregator;
use crate::model_router::{escalate_on_low_confidence, select_tier, ModelRouter};
use crate::types::{AgentId, Claim, Complexity, EvidenceBundle, Label, ModelTier, Stance, Verdict};

/// Structured output the model is instructed to produce; real backends
/// return this as JSON which is parsed by `parse_structured_output`.
#[derive(Debug, Clone)]
pub struct ParsedVerdict {
    pub label: Label,
    pub confidence: f32,
    pub reasoning: String,
}

/// Best-effort structured parse of a model completion. Accepts a small
/// pipe-delimited grammar (`LABEL|confidence|reasoning`) as a stand-in for
/// the real backend's JSON contract, kept intentionally simple since the
/// concrete model wire format is outside this core's scope.
pub fn parse_structured_output(text: &str) -> Option<ParsedVerdict> {
    let mut parts = text.splitn(3, '|');
    let label_str = parts.next()?.trim();
    let confidence_str = parts.next()?.trim();
    let reasoning = parts.next()?.trim().to_string();

    let label = match label_str.to_ascii_uppercase().as_str() {
        "TRUE" => Label::True,
        "FALSE" => Label::False,
        "UNCERTAIN" => Label::Uncertain,
        _ => return None,
    };
    let confidence: f32 = confidence_str.parse().ok()?;
    if !(0.0..=1.0).contains(&confidence) {
        return None;
    }

    Some(ParsedVerdict {
        label,
        confidence,
        reasoning,
    })
}

#[async_trait]
pub trait VerificationAgent: Send + Sync {
    fn agent_id(&self) -> &AgentId;

    /// Domain-specific complexity heuristic override (§4.5b).
    fn classify_complexity(&self, claim: &Claim) -> Complexity {
        claim.complexity
    }

    /// Prompt template override (§4.5b). Default binds claim text and a
    /// terse excerpt of the strongest evidence on each side.
    fn build_prompt(&self, claim: &Claim, evidence: &EvidenceBundle) -> String {
        let supporting: Vec<&str> = evidence
            .supporting
            .iter()
            .take(3)
            .map(|e| e.content.as_str())
            .collect();
        let contradicting: Vec<&str> = evidence
            .contradicting
            .iter()
            .take(3)
            .map(|e| e.content.as_str())
            .collect();
        format!(
            "Claim: {}\nSupporting evidence: {:?}\nContradicting evidence: {:?}\nRespond as LABEL|confidence|reasoning.",
            claim.text, supporting, contradicting
        )
    }

    async fn verify(
        &self,
        claim: &Claim,
        evidence_aggregator: &EvidenceAggregator,
        model_router: &ModelRouter,
        calibration: &CalibrationSettings,
        evidence_quality_threshold: f32,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Verdict {
        let started = std::time::Instant::now();

        if cancel.is_cancelled() {
            return Verdict::cancelled(claim.id, self.agent_id().clone(), "cancelled before start");
        }

        let evidence = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Verdict::cancelled(claim.id, self.agent_id().clone(), "cancelled during evidence gathering");
            }
            bundle = evidence_aggregator.gather(&claim.normalized_text, claim.domain) => bundle,
        };

        let complexity = self.classify_complexity(claim);
        let mut tier = select_tier(
            complexity,
            evidence.overall_quality,
            claim.hints.privacy,
            None,
            evidence_quality_threshold,
        );
        let prompt = self.build_prompt(claim, &evidence);

        let deadline = Duration::from_secs(10);
        let (completion, used_tier) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Verdict::cancelled(claim.id, self.agent_id().clone(), "cancelled during model call");
            }
            result = model_router.complete(tier, &prompt, deadline) => result,
        };
        tier = used_tier;

        let Some(completion) = completion else {
            warn!(agent = %self.agent_id(), "model unavailable across all tiers");
            let mut verdict = Verdict::model_unavailable(
                claim.id,
                self.agent_id().clone(),
                "model unavailable: all tiers exhausted",
                tier,
            );
            verdict.latency_ms = started.elapsed().as_millis() as u64;
            return verdict;
        };

        let mut parsed = parse_structured_output(&completion.text);
        if parsed.is_none() {
            debug!(agent = %self.agent_id(), "structured output unparsable, retrying once");
            let stricter_prompt = format!(
                "{prompt}\nYour previous answer was not in the required format. Respond ONLY as LABEL|confidence|reasoning."
            );
            let (retry, retry_tier) = model_router.complete(tier, &stricter_prompt, deadline).await;
            tier = retry_tier;
            parsed = retry.and_then(|c| parse_structured_output(&c.text));
        }

        let parsed = match parsed {
            Some(p) => p,
            None => ParsedVerdict {
                label: Label::Uncertain,
                confidence: 0.0,
                reasoning: "failed to parse structured model output after retry".to_string(),
            },
        };

        if parsed.label != Label::Uncertain && parsed.confidence < crate::model_router::LOW_CONFIDENCE_RETRY_THRESHOLD {
            tier = escalate_on_low_confidence(tier, parsed.confidence);
        }

        let mut final_confidence = (calibration.model_confidence_weight * parsed.confidence
            + calibration.evidence_quality_weight * evidence.overall_quality)
            .clamp(0.0, 1.0);
        let mut label = parsed.label;

        let support_count = evidence.supporting.len();
        let contradict_count = evidence.contradicting.len();
        if support_count > 0 && contradict_count > 0 {
            let ratio = support_count.max(contradict_count) as f32 / support_count.min(contradict_count) as f32;
            if ratio < 1.5 {
                label = Label::Uncertain;
                final_confidence = final_confidence.min(0.6);
            }
        }

        if evidence.overall_quality < 0.1 {
            label = Label::Uncertain;
        }

        Verdict {
            id: Uuid::new_v4(),
            claim_id: claim.id,
            agent_id: self.agent_id().clone(),
            label,
            confidence: final_confidence,
            reasoning: parsed.reasoning,
            sources: evidence
                .all_items()
                .map(|item| item.source_id.clone())
                .collect(),
            evidence_quality: evidence.overall_quality,
            model_tier_used: tier,
            latency_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
            cancelled: false,
            degraded: false,
        }
    }
}

/// Generalist agent: no specialization overrides.
pub struct GeneralistAgent {
    pub id: AgentId,
}

#[async_trait]
impl VerificationAgent for GeneralistAgent {
    fn agent_id(&self) -> &AgentId {
        &self.id
    }
}

/// Prefers peer-reviewed evidence; penalizes news-tier items by deprioritizing
/// them out of the prompt excerpt.
pub struct ScienceAgent {
    pub id: AgentId,
}

#[async_trait]
impl VerificationAgent for ScienceAgent {
    fn agent_id(&self) -> &AgentId {
        &self.id
    }

    fn classify_complexity(&self, claim: &Claim) -> Complexity {
        // Scientific claims default to at least moderate scrutiny.
        match claim.complexity {
            Complexity::Simple => Complexity::Moderate,
            other => other,
        }
    }

    fn build_prompt(&self, claim: &Claim, evidence: &EvidenceBundle) -> String {
        let mut ranked: Vec<_> = evidence.all_items().collect();
        ranked.sort_by(|a, b| {
            academic_priority(a.source_tier)
                .cmp(&academic_priority(b.source_tier))
                .then(b.credibility.partial_cmp(&a.credibility).unwrap_or(std::cmp::Ordering::Equal))
        });
        let excerpts: Vec<&str> = ranked.iter().take(4).map(|e| e.content.as_str()).collect();
        format!(
            "Scientific claim: {}\nPeer-reviewed-prioritized evidence: {:?}\nRespond as LABEL|confidence|reasoning.",
            claim.text, excerpts
        )
    }
}

fn academic_priority(tier: crate::types::SourceTier) -> u8 {
    use crate::types::SourceTier::*;
    match tier {
        Academic => 0,
        PrimaryDocumentation => 1,
        Encyclopedic => 2,
        News => 4,
        Web => 3,
    }
}

/// Applies a recency weight to evidence relevance: `0.5 + 0.5·exp(-age_hours/24)`.
pub struct NewsAgent {
    pub id: AgentId,
}

impl NewsAgent {
    pub fn recency_weight(age_hours: f32) -> f32 {
        0.5 + 0.5 * (-age_hours / 24.0).exp()
    }
}

#[async_trait]
impl VerificationAgent for NewsAgent {
    fn agent_id(&self) -> &AgentId {
        &self.id
    }

    fn build_prompt(&self, claim: &Claim, evidence: &EvidenceBundle) -> String {
        let now = Utc::now();
        let mut ranked: Vec<_> = evidence.all_items().collect();
        ranked.sort_by(|a, b| {
            let age_a = (now - a.timestamp).num_hours().max(0) as f32;
            let age_b = (now - b.timestamp).num_hours().max(0) as f32;
            let score_a = a.relevance * Self::recency_weight(age_a);
            let score_b = b.relevance * Self::recency_weight(age_b);
            score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
        });
        let excerpts: Vec<&str> = ranked.iter().take(4).map(|e| e.content.as_str()).collect();
        format!(
            "Breaking/news claim: {}\nRecency-weighted evidence: {:?}\nRespond as LABEL|confidence|reasoning.",
            claim.text, excerpts
        )
    }
}

/// Prefers primary documentation over encyclopedic or news sources.
pub struct TechAgent {
    pub id: AgentId,
}

#[async_trait]
impl VerificationAgent for TechAgent {
    fn agent_id(&self) -> &AgentId {
        &self.id
    }

    fn build_prompt(&self, claim: &Claim, evidence: &EvidenceBundle) -> String {
        let mut ranked: Vec<_> = evidence.all_items().collect();
        ranked.sort_by(|a, b| {
            let pref = |t: crate::types::SourceTier| -> u8 {
                use crate::types::SourceTier::*;
                match t {
                    PrimaryDocumentation => 0,
                    Academic => 1,
                    Encyclopedic => 2,
                    Web => 3,
                    News => 4,
                }
            };
            pref(a.source_tier).cmp(&pref(b.source_tier))
        });
        let excerpts: Vec<&str> = ranked.iter().take(4).map(|e| e.content.as_str()).collect();
        format!(
            "Technical claim: {}\nDocumentation-prioritized evidence: {:?}\nRespond as LABEL|confidence|reasoning.",
            claim.text, excerpts
        )
    }
}

pub fn shared_agent(agent: impl VerificationAgent + 'static) -> Arc<dyn VerificationAgent> {
    Arc::new(agent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_structured_output() {
        let parsed = parse_structured_output("TRUE|0.9|boils at standard pressure").unwrap();
        assert_eq!(parsed.label, Label::True);
        assert!((parsed.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        assert!(parse_structured_output("TRUE|1.5|bad").is_none());
    }

    #[test]
    fn rejects_unknown_label() {
        assert!(parse_structured_output("MAYBE|0.5|bad").is_none());
    }

    #[test]
    fn news_recency_weight_decays_with_age() {
        let fresh = NewsAgent::recency_weight(0.0);
        let stale = NewsAgent::recency_weight(240.0);
        assert!(fresh > stale);
        assert!(fresh <= 1.0);
        assert!(stale >= 0.5);
    }
}
