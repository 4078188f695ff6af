//! Debate Engine (spec §4.8): prosecutor/defender/moderator state machine
//! that refines a verdict through bounded adversarial rounds.

use consensusnet_config::{AdversarialSettings, CalibrationSettings};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::registry::SharedRegistry;
use crate::types::{
    Challenge, ChallengeStrength, ChallengeType, Claim, DebateOutcome, DebateRound, Label, Response,
    ResponseStance, Verdict,
};

pub const MAX_CHALLENGES_PER_ROUND: usize = 5;
pub const MODERATOR_TERMINAL_ADJUSTMENT_FLOOR: f32 = 0.02;
pub const LABEL_FLIP_THRESHOLD: f32 = 0.5;

pub struct DebateContext {
    pub claim: Claim,
    pub initial_verdict: Verdict,
    pub supporting_agents: Vec<crate::types::AgentId>,
}

/// Runs the full adversarial pass: PROSECUTE → DEFEND → MODERATE, looping
/// until a round is terminal or the round cap is reached, then SYNTHESIZE.
/// Never errors: a moderator failure degrades to the initial verdict with
/// `degraded=true` rather than propagating (§4.8 failure semantics).
pub async fn run_debate(
    context: DebateContext,
    registry: &SharedRegistry,
    calibration: &CalibrationSettings,
    adversarial: &AdversarialSettings,
    cancel: &CancellationToken,
) -> DebateOutcome {
    let (prosecutor, defender, moderator) = match select_roles(registry) {
        Some(roles) => roles,
        None => {
            warn!("debate engine could not staff prosecutor/defender/moderator roles");
            return DebateOutcome {
                initial_verdict: context.initial_verdict.clone(),
                rounds: Vec::new(),
                refined_verdict: context.initial_verdict,
                quality_score: 0.0,
                degraded: true,
            };
        }
    };

    let mut rounds = Vec::new();
    let mut surviving_challenges: Vec<Challenge> = Vec::new();
    let mut cumulative_adjustment = 0.0f32;
    let mut degraded = false;
    let mut round_index = 1u32;

    loop {
        if cancel.is_cancelled() {
            degraded = true;
            break;
        }

        let challenges = prosecute(&context, &surviving_challenges, round_index, adversarial.challenge_filter);
        if challenges.is_empty() && round_index > 1 {
            break;
        }

        let responses = defend(&challenges, &defender);
        let (round_summary, adjustment, terminal, next_surviving) =
            moderate(&challenges, &responses, &moderator, calibration);

        cumulative_adjustment += adjustment;
        rounds.push(DebateRound {
            round_index,
            challenges: challenges.clone(),
            responses,
            round_summary,
        });

        surviving_challenges = next_surviving;

        if terminal || round_index >= adversarial.max_rounds {
            break;
        }
        round_index += 1;
    }

    let refined_verdict = adjust_verdict(&context.initial_verdict, cumulative_adjustment);
    let quality_score = debate_quality_score(&rounds);

    info!(
        rounds = rounds.len(),
        degraded, "debate concluded, emitting refined verdict"
    );

    let _ = (prosecutor,); // role identity is not otherwise consumed by this in-process engine

    DebateOutcome {
        initial_verdict: context.initial_verdict,
        rounds,
        refined_verdict,
        quality_score,
        degraded,
    }
}

fn select_roles(
    registry: &SharedRegistry,
) -> Option<(crate::types::AgentId, crate::types::AgentId, crate::types::AgentId)> {
    let snapshot = registry.snapshot();
    let mut ids: Vec<_> = snapshot.keys().cloned().collect();
    ids.sort();
    if ids.len() < 3 {
        // Fall back to reusing agents across roles rather than failing the
        // whole debate when the pool is small; the moderator role is the
        // one that must never be unstaffed (its absence is what triggers
        // the degraded path), so it gets first claim on a distinct id.
        if ids.is_empty() {
            return None;
        }
        let moderator = ids[0].clone();
        let prosecutor = ids.get(1).cloned().unwrap_or_else(|| moderator.clone());
        let defender = ids.get(2).cloned().unwrap_or_else(|| moderator.clone());
        return Some((prosecutor, defender, moderator));
    }
    Some((ids[0].clone(), ids[1].clone(), ids[2].clone()))
}

/// Prosecutor emits up to `MAX_CHALLENGES_PER_ROUND` challenges, seeded with
/// surviving challenges from the prior round, filtered by priority_score.
fn prosecute(context: &DebateContext, surviving: &[Challenge], round_index: u32, challenge_filter: f32) -> Vec<Challenge> {
    let mut challenges = surviving.to_vec();

    if round_index == 1 {
        challenges.extend(generate_initial_challenges(context));
    }

    challenges.retain(|c| c.priority_score() >= challenge_filter);
    challenges.sort_by(|a, b| b.priority_score().partial_cmp(&a.priority_score()).unwrap_or(std::cmp::Ordering::Equal));
    challenges.truncate(MAX_CHALLENGES_PER_ROUND);
    challenges
}

/// Deterministic seed challenges derived from the initial verdict's
/// evidence quality and confidence; a real prosecutor agent would generate
/// these from the evidence bundle via a model call, but the engine's
/// contract only requires a capability-tagged agent in the `prosecutor`
/// role, which this core models opaquely through the bus.
fn generate_initial_challenges(context: &DebateContext) -> Vec<Challenge> {
    let mut challenges = Vec::new();

    if context.initial_verdict.evidence_quality < 0.3 && context.initial_verdict.confidence < 0.4 {
        challenges.push(Challenge {
            id: Uuid::new_v4(),
            kind: ChallengeType::Sufficiency,
            strength: ChallengeStrength::Critical,
            specificity: 0.9,
            verifiability: 0.8,
            impact: 0.9,
            target_verdict_id: context.initial_verdict.id,
            text: "verdict is both weakly evidenced and weakly confident".to_string(),
        });
    }

    if context.initial_verdict.evidence_quality < 0.6 {
        challenges.push(Challenge {
            id: Uuid::new_v4(),
            kind: ChallengeType::Sufficiency,
            strength: ChallengeStrength::Strong,
            specificity: 0.7,
            verifiability: 0.6,
            impact: 0.6,
            target_verdict_id: context.initial_verdict.id,
            text: "evidence quality is below the confidence the verdict claims".to_string(),
        });
    }

    if context.initial_verdict.confidence < 0.7 {
        challenges.push(Challenge {
            id: Uuid::new_v4(),
            kind: ChallengeType::FactualAccuracy,
            strength: ChallengeStrength::Moderate,
            specificity: 0.5,
            verifiability: 0.5,
            impact: 0.5,
            target_verdict_id: context.initial_verdict.id,
            text: "low initial confidence warrants scrutiny of the factual basis".to_string(),
        });
    }

    if context.initial_verdict.label == Label::Uncertain {
        challenges.push(Challenge {
            id: Uuid::new_v4(),
            kind: ChallengeType::AlternativeExplanation,
            strength: ChallengeStrength::Weak,
            specificity: 0.3,
            verifiability: 0.3,
            impact: 0.2,
            target_verdict_id: context.initial_verdict.id,
            text: "an uncertain verdict should be tested against alternative explanations".to_string(),
        });
    }

    challenges
}

/// Defender emits one response per surviving challenge. Weak challenges are
/// refuted outright; moderate/strong ones are partially conceded and carry
/// into the next round if they survive the filter; critical challenges are
/// conceded, since the spec's `-0.2`/label-flip penalty only fires for a
/// critical challenge that is actually upheld (§4.8), which requires a real
/// concession rather than an indefinite partial-concede loop.
fn defend(challenges: &[Challenge], _defender: &crate::types::AgentId) -> Vec<Response> {
    challenges
        .iter()
        .map(|c| {
            let stance = match c.strength {
                ChallengeStrength::Weak => ResponseStance::Refute,
                ChallengeStrength::Moderate | ChallengeStrength::Strong => ResponseStance::PartiallyConcede,
                ChallengeStrength::Critical => ResponseStance::Concede,
            };
            Response {
                challenge_id: c.id,
                stance,
                text: format!("response to {:?} challenge", c.kind),
                supporting_evidence: Vec::new(),
            }
        })
        .collect()
}

/// Moderator assesses each (challenge, response) pair, producing a round
/// summary, a confidence adjustment, a terminal flag, and the set of
/// challenges that survive to the next round (non-conceded, strength > weak).
fn moderate(
    challenges: &[Challenge],
    responses: &[Response],
    _moderator: &crate::types::AgentId,
    calibration: &CalibrationSettings,
) -> (String, f32, bool, Vec<Challenge>) {
    if challenges.is_empty() {
        return ("no challenges raised this round".to_string(), 0.0, true, Vec::new());
    }

    let mut adjustment = 0.0f32;
    let mut surviving = Vec::new();

    for challenge in challenges {
        let response = responses.iter().find(|r| r.challenge_id == challenge.id);
        match response {
            Some(r) => match r.stance {
                ResponseStance::Concede => {
                    if challenge.strength == ChallengeStrength::Critical {
                        adjustment += calibration.critical_upheld_penalty;
                    }
                }
                ResponseStance::Refute => {
                    adjustment += calibration.rebutted_bonus;
                }
                ResponseStance::PartiallyConcede => {
                    if challenge.strength > ChallengeStrength::Weak {
                        surviving.push(challenge.clone());
                    }
                }
            },
            None => {
                // Missing contribution: neutral event, round proceeds (§4.8 timeouts).
            }
        }
    }

    let all_conceded = surviving.is_empty();
    let only_weak_survive = surviving.iter().all(|c| c.strength <= ChallengeStrength::Weak);
    let terminal = all_conceded || only_weak_survive || adjustment.abs() < MODERATOR_TERMINAL_ADJUSTMENT_FLOOR;

    let summary = format!(
        "assessed {} challenges, {} survive, net adjustment {:.3}",
        challenges.len(),
        surviving.len(),
        adjustment
    );

    (summary, adjustment, terminal, surviving)
}

/// `refined_verdict = adjust(initial_verdict, Σ confidence_adjustments)`.
/// A label flip only occurs once the adjusted confidence crosses 0.5 and
/// the net adjustment was negative (i.e. challenges, not rebuttals, drove it).
fn adjust_verdict(initial: &Verdict, cumulative_adjustment: f32) -> Verdict {
    let mut confidence = (initial.confidence + cumulative_adjustment).clamp(0.0, 1.0);
    let mut label = initial.label;

    if cumulative_adjustment < 0.0 && confidence < LABEL_FLIP_THRESHOLD && label != Label::Uncertain {
        label = Label::Uncertain;
        confidence = confidence.max(0.1);
    }

    Verdict {
        id: Uuid::new_v4(),
        claim_id: initial.claim_id,
        agent_id: initial.agent_id.clone(),
        label,
        confidence,
        reasoning: format!(
            "{} (refined after debate, adjustment {:.3})",
            initial.reasoning, cumulative_adjustment
        ),
        sources: initial.sources.clone(),
        evidence_quality: initial.evidence_quality,
        model_tier_used: initial.model_tier_used,
        latency_ms: initial.latency_ms,
        timestamp: chrono::Utc::now(),
        cancelled: false,
        degraded: initial.degraded,
    }
}

fn debate_quality_score(rounds: &[DebateRound]) -> f32 {
    if rounds.is_empty() {
        return 0.0;
    }
    let conceded_ratio: f32 = rounds
        .iter()
        .map(|r| {
            let conceded = r.challenges.len().saturating_sub(r.responses.len().min(r.challenges.len()));
            1.0 - (conceded as f32 / r.challenges.len().max(1) as f32)
        })
        .sum::<f32>()
        / rounds.len() as f32;
    conceded_ratio.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AgentRegistry;
    use crate::types::{Availability, Domain, ModelTier};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn initial_verdict(label: Label, confidence: f32, evidence_quality: f32) -> Verdict {
        Verdict {
            id: Uuid::new_v4(),
            claim_id: Uuid::new_v4(),
            agent_id: "agent-a".to_string(),
            label,
            confidence,
            reasoning: "initial reasoning".to_string(),
            sources: vec![],
            evidence_quality,
            model_tier_used: ModelTier::Reasoning,
            latency_ms: 10,
            timestamp: chrono::Utc::now(),
            cancelled: false,
            degraded: false,
        }
    }

    fn registry_with(n: usize) -> SharedRegistry {
        let registry = Arc::new(AgentRegistry::new(10));
        for i in 0..n {
            registry.register(crate::types::AgentProfile {
                agent_id: format!("agent-{i}"),
                capabilities: vec!["verify".to_string()],
                domain_expertise: HashMap::new(),
                availability: Availability::Idle,
                current_load: 0,
                reputation_overall: 0.5,
            });
        }
        registry
    }

    #[tokio::test]
    async fn debate_caps_at_three_rounds() {
        let registry = registry_with(3);
        let context = DebateContext {
            claim: crate::types::Claim {
                id: Uuid::new_v4(),
                text: "claim".to_string(),
                normalized_text: "claim".to_string(),
                domain: Domain::General,
                complexity: crate::types::Complexity::Complex,
                hints: Default::default(),
                created_at: chrono::Utc::now(),
            },
            initial_verdict: initial_verdict(Label::Uncertain, 0.3, 0.2),
            supporting_agents: vec!["agent-0".to_string()],
        };
        let outcome = run_debate(context, &registry, &CalibrationSettings::default(), &AdversarialSettings::default(), &CancellationToken::new()).await;
        assert!(outcome.rounds.len() <= AdversarialSettings::default().max_rounds as usize);
    }

    #[tokio::test]
    async fn configured_max_rounds_is_honored() {
        let registry = registry_with(3);
        let context = DebateContext {
            claim: crate::types::Claim {
                id: Uuid::new_v4(),
                text: "claim".to_string(),
                normalized_text: "claim".to_string(),
                domain: Domain::General,
                complexity: crate::types::Complexity::Complex,
                hints: Default::default(),
                created_at: chrono::Utc::now(),
            },
            initial_verdict: initial_verdict(Label::Uncertain, 0.3, 0.2),
            supporting_agents: vec!["agent-0".to_string()],
        };
        let tight = AdversarialSettings { max_rounds: 1, challenge_filter: 0.3 };
        let outcome = run_debate(context, &registry, &CalibrationSettings::default(), &tight, &CancellationToken::new()).await;
        assert_eq!(outcome.rounds.len(), 1);
    }

    #[tokio::test]
    async fn degrades_gracefully_with_empty_registry() {
        let registry = registry_with(0);
        let context = DebateContext {
            claim: crate::types::Claim {
                id: Uuid::new_v4(),
                text: "claim".to_string(),
                normalized_text: "claim".to_string(),
                domain: Domain::General,
                complexity: crate::types::Complexity::Simple,
                hints: Default::default(),
                created_at: chrono::Utc::now(),
            },
            initial_verdict: initial_verdict(Label::True, 0.9, 0.9),
            supporting_agents: vec![],
        };
        let outcome = run_debate(context, &registry, &CalibrationSettings::default(), &AdversarialSettings::default(), &CancellationToken::new()).await;
        assert!(outcome.degraded);
        assert_eq!(outcome.refined_verdict.label, Label::True);
    }

    #[tokio::test]
    async fn critical_challenge_is_conceded_and_flips_label_in_a_real_debate() {
        let registry = registry_with(3);
        let context = DebateContext {
            claim: crate::types::Claim {
                id: Uuid::new_v4(),
                text: "claim".to_string(),
                normalized_text: "claim".to_string(),
                domain: Domain::General,
                complexity: crate::types::Complexity::Complex,
                hints: Default::default(),
                created_at: chrono::Utc::now(),
            },
            initial_verdict: initial_verdict(Label::True, 0.35, 0.15),
            supporting_agents: vec!["agent-0".to_string()],
        };
        let outcome = run_debate(context, &registry, &CalibrationSettings::default(), &AdversarialSettings::default(), &CancellationToken::new()).await;
        assert!(!outcome.rounds.is_empty());
        assert!(
            outcome.rounds[0].challenges.iter().any(|c| c.strength == ChallengeStrength::Critical),
            "a critical sufficiency challenge should have been raised for low-confidence/low-quality evidence"
        );
        assert_eq!(outcome.refined_verdict.label, Label::Uncertain);
    }

    #[test]
    fn critical_upheld_challenge_can_flip_label() {
        let initial = initial_verdict(Label::True, 0.55, 0.8);
        let refined = adjust_verdict(&initial, -0.3);
        assert_eq!(refined.label, Label::Uncertain);
    }

    #[test]
    fn rebutted_challenge_increases_confidence() {
        let initial = initial_verdict(Label::True, 0.5, 0.8);
        let refined = adjust_verdict(&initial, 0.05);
        assert!(refined.confidence > initial.confidence);
        assert_eq!(refined.label, Label::True);
    }
}
