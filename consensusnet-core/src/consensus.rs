//! Consensus Engine (spec §4.9): combines a verdict set into one aggregate
//! label with a quality/agreement score, pluggable by aggregation rule.

use crate::types::{Label, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusRule {
    SimpleMajority,
    ConfidenceWeighted,
    ReputationWeighted,
    WeightedLabelConfidence,
}

impl Default for ConsensusRule {
    fn default() -> Self {
        ConsensusRule::WeightedLabelConfidence
    }
}

#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    pub label: Label,
    pub confidence: f32,
    pub agreement: f32,
    pub quality: f32,
    pub rule_name: String,
}

impl ConsensusOutcome {
    /// The verdict among the input set closest to the winning label, used
    /// as the debate engine's starting point when it needs one concrete
    /// verdict to refine rather than a synthetic aggregate.
    pub fn winning_verdict(&self, verdicts: &[Verdict]) -> Verdict {
        verdicts
            .iter()
            .filter(|v| v.label == self.label)
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
            .or_else(|| verdicts.iter().max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal)))
            .cloned()
            .unwrap_or_else(|| {
                Verdict::cancelled(
                    verdicts.first().map(|v| v.claim_id).unwrap_or_default(),
                    "consensus-engine".to_string(),
                    "no verdicts to synthesize from",
                )
            })
    }
}

/// Agent trust weight used when aggregating: `reputation.overall` in the
/// claim's domain. Callers that don't have a reputation store handy (tests,
/// `confidence_weighted`/`simple_majority` rules) pass 1.0 uniformly.
pub fn aggregate(verdicts: &[Verdict], rule: ConsensusRule) -> ConsensusOutcome {
    aggregate_with_weights(verdicts, rule, &vec![1.0; verdicts.len()])
}

pub fn aggregate_with_weights(verdicts: &[Verdict], rule: ConsensusRule, weights: &[f32]) -> ConsensusOutcome {
    if verdicts.is_empty() {
        return ConsensusOutcome {
            label: Label::Uncertain,
            confidence: 0.0,
            agreement: 1.0,
            quality: 0.0,
            rule_name: rule_name(rule),
        };
    }

    let labels = [Label::True, Label::False, Label::Uncertain];
    let mut scores = [0.0f32; 3];

    for (i, verdict) in verdicts.iter().enumerate() {
        let weight = weights.get(i).copied().unwrap_or(1.0);
        let contribution = match rule {
            ConsensusRule::SimpleMajority => 1.0,
            ConsensusRule::ConfidenceWeighted => verdict.confidence,
            ConsensusRule::ReputationWeighted => weight,
            ConsensusRule::WeightedLabelConfidence => weight * verdict.confidence,
        };
        let idx = labels.iter().position(|l| *l == verdict.label).unwrap();
        scores[idx] += contribution;
    }

    let total: f32 = scores.iter().sum();
    let max_score = scores.iter().cloned().fold(f32::MIN, f32::max);
    let tied_at_max = scores.iter().filter(|s| (*s - max_score).abs() < 1e-6).count();
    // argmax over {True, False, Uncertain}; any tie at the maximum (including a
    // three-way tie) is broken toward UNCERTAIN rather than favoring whichever
    // label happens to be scanned first.
    let winner_idx = if tied_at_max > 1 {
        2
    } else {
        scores.iter().position(|s| (*s - max_score).abs() < 1e-6).unwrap_or(2)
    };
    let label = labels[winner_idx];

    let confidence = if total > 0.0 { scores[winner_idx] / total } else { 0.0 };
    let agreement = 1.0 - normalized_entropy(&scores, total);
    let quality = 0.5 * confidence + 0.5 * agreement;

    ConsensusOutcome {
        label,
        confidence: confidence.clamp(0.0, 1.0),
        agreement: agreement.clamp(0.0, 1.0),
        quality: quality.clamp(0.0, 1.0),
        rule_name: rule_name(rule),
    }
}

fn normalized_entropy(scores: &[f32; 3], total: f32) -> f32 {
    if total <= 0.0 {
        return 0.0;
    }
    let mut entropy = 0.0f32;
    for score in scores {
        if *score <= 0.0 {
            continue;
        }
        let p = score / total;
        entropy -= p * p.ln();
    }
    let max_entropy = (scores.len() as f32).ln();
    if max_entropy <= 0.0 {
        0.0
    } else {
        (entropy / max_entropy).clamp(0.0, 1.0)
    }
}

fn rule_name(rule: ConsensusRule) -> String {
    match rule {
        ConsensusRule::SimpleMajority => "simple_majority",
        ConsensusRule::ConfidenceWeighted => "confidence_weighted",
        ConsensusRule::ReputationWeighted => "reputation_weighted",
        ConsensusRule::WeightedLabelConfidence => "weighted_label_confidence",
    }
    .to_string()
}
