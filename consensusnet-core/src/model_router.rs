//! Model Router (spec §4.4): chooses a model tier from evidence quality,
//! claim complexity and the privacy flag, and drives the abstract
//! `ModelBackend.Complete` call with tier-ladder escalation on failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use consensusnet_resilience::{CircuitBreaker, CircuitBreakerConfig};
use tracing::{debug, warn};

use crate::types::{Complexity, ModelTier};

/// Default for `escalation.evidence_quality_threshold`: below this, a claim
/// escalates past the cheap tier regardless of complexity.
pub const DEFAULT_EVIDENCE_QUALITY_THRESHOLD: f32 = 0.65;
pub const LOW_CONFIDENCE_RETRY_THRESHOLD: f32 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    Transient,
    RateLimited,
    Permanent,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("model backend error: {kind:?}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub text: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub latency_ms: u64,
}

/// External chat-completion collaborator; concrete provider SDKs sit behind
/// this seam and never leak into the rest of the core.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn tier(&self) -> ModelTier;

    async fn complete(&self, prompt: &str, deadline: Duration) -> Result<CompletionResult, BackendError>;
}

/// Deterministic tier selection per §4.4. `previous_tier` is `Some` only
/// when this is a retry within the same verification; escalation never
/// downgrades and at most one escalation happens per verification.
pub fn select_tier(
    complexity: Complexity,
    evidence_quality: f32,
    privacy: bool,
    previous_tier: Option<ModelTier>,
    quality_threshold: f32,
) -> ModelTier {
    if privacy {
        return ModelTier::Local;
    }

    if let Some(prev) = previous_tier {
        // Already escalated once; never go back down to cheap.
        return match prev {
            ModelTier::Cheap => escalate_from_initial(complexity, evidence_quality, quality_threshold),
            other => other,
        };
    }

    escalate_from_initial(complexity, evidence_quality, quality_threshold)
}

/// `quality_threshold` is `escalation.evidence_quality_threshold` (spec §6,
/// default 0.65): below it, or for a complex claim, escalate past cheap.
fn escalate_from_initial(complexity: Complexity, evidence_quality: f32, quality_threshold: f32) -> ModelTier {
    if evidence_quality >= quality_threshold && complexity != Complexity::Complex {
        ModelTier::Cheap
    } else {
        ModelTier::Reasoning
    }
}

/// Escalate a tier after a low-confidence cheap-tier result. No-op for
/// anything but `Cheap`, matching "at most one escalation" and
/// "escalation never downgrades".
pub fn escalate_on_low_confidence(tier: ModelTier, confidence: f32) -> ModelTier {
    if tier == ModelTier::Cheap && confidence < LOW_CONFIDENCE_RETRY_THRESHOLD {
        ModelTier::Reasoning
    } else {
        tier
    }
}

pub struct ModelRouter {
    cheap: Arc<dyn ModelBackend>,
    reasoning: Arc<dyn ModelBackend>,
    local: Arc<dyn ModelBackend>,
    cheap_breaker: CircuitBreaker,
    reasoning_breaker: CircuitBreaker,
    local_breaker: CircuitBreaker,
}

impl ModelRouter {
    pub fn new(
        cheap: Arc<dyn ModelBackend>,
        reasoning: Arc<dyn ModelBackend>,
        local: Arc<dyn ModelBackend>,
    ) -> Self {
        let breaker = |name: &str| {
            CircuitBreaker::new(CircuitBreakerConfig {
                name: Some(name.to_string()),
                ..CircuitBreakerConfig::default()
            })
        };
        Self {
            cheap,
            reasoning,
            local,
            cheap_breaker: breaker("model-cheap"),
            reasoning_breaker: breaker("model-reasoning"),
            local_breaker: breaker("model-local"),
        }
    }

    fn backend_for(&self, tier: ModelTier) -> &Arc<dyn ModelBackend> {
        match tier {
            ModelTier::Cheap => &self.cheap,
            ModelTier::Reasoning => &self.reasoning,
            ModelTier::Local => &self.local,
        }
    }

    fn breaker_for(&self, tier: ModelTier) -> &CircuitBreaker {
        match tier {
            ModelTier::Cheap => &self.cheap_breaker,
            ModelTier::Reasoning => &self.reasoning_breaker,
            ModelTier::Local => &self.local_breaker,
        }
    }

    /// Routes a single completion call through that tier's circuit breaker,
    /// translating the breaker's boxed error back into a `BackendError` (a
    /// breaker trip itself is treated as transient; the caller's retry/
    /// fall-through ladder handles it the same way).
    async fn call_backend(
        &self,
        tier: ModelTier,
        prompt: &str,
        deadline: Duration,
    ) -> Result<CompletionResult, BackendError> {
        let backend = self.backend_for(tier).clone();
        let prompt = prompt.to_string();
        let result = self
            .breaker_for(tier)
            .execute(
                move || {
                    Box::pin(async move {
                        backend
                            .complete(&prompt, deadline)
                            .await
                            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
                    })
                },
                None,
            )
            .await;

        result.map_err(|err| match err.downcast::<BackendError>() {
            Ok(backend_err) => *backend_err,
            Err(other) => BackendError {
                kind: BackendErrorKind::Transient,
                message: other.to_string(),
            },
        })
    }

    /// Run a completion at `tier`, classifying failures and falling through
    /// the ladder: `transient` retries once with jitter, `rate_limited`
    /// backs off and tries the next tier up, `permanent` falls straight to
    /// `local`. Returns `None` if every avenue is exhausted
    /// (`MODEL_UNAVAILABLE`, spec §7).
    pub async fn complete(
        &self,
        tier: ModelTier,
        prompt: &str,
        deadline: Duration,
    ) -> (Option<CompletionResult>, ModelTier) {
        match self.call_backend(tier, prompt, deadline).await {
            Ok(result) => (Some(result), tier),
            Err(err) => {
                warn!(?tier, kind = ?err.kind, "model backend call failed");
                match err.kind {
                    BackendErrorKind::Transient => {
                        let jitter_ms = 50 + fastrand_u64(100);
                        tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
                        match self.call_backend(tier, prompt, deadline).await {
                            Ok(result) => (Some(result), tier),
                            Err(_) => self.fall_through(tier, prompt, deadline).await,
                        }
                    }
                    BackendErrorKind::RateLimited | BackendErrorKind::Permanent => {
                        self.fall_through(tier, prompt, deadline).await
                    }
                }
            }
        }
    }

    async fn fall_through(
        &self,
        tier: ModelTier,
        prompt: &str,
        deadline: Duration,
    ) -> (Option<CompletionResult>, ModelTier) {
        let next = match tier {
            ModelTier::Cheap => ModelTier::Reasoning,
            ModelTier::Reasoning => ModelTier::Local,
            ModelTier::Local => {
                debug!("local tier exhausted, no further fallback");
                return (None, tier);
            }
        };
        debug!(?tier, ?next, "falling through to next tier");
        match self.call_backend(next, prompt, deadline).await {
            Ok(result) => (Some(result), next),
            Err(_) if next != ModelTier::Local => {
                Box::pin(self.fall_through(next, prompt, deadline)).await
            }
            Err(_) => (None, next),
        }
    }
}

fn fastrand_u64(bound: u64) -> u64 {
    if bound == 0 {
        0
    } else {
        fastrand::u64(0..bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_quality_simple_claim_selects_cheap() {
        let tier = select_tier(Complexity::Simple, 0.9, false, None, DEFAULT_EVIDENCE_QUALITY_THRESHOLD);
        assert_eq!(tier, ModelTier::Cheap);
    }

    #[test]
    fn complex_claim_selects_reasoning_even_with_high_quality() {
        let tier = select_tier(Complexity::Complex, 0.95, false, None, DEFAULT_EVIDENCE_QUALITY_THRESHOLD);
        assert_eq!(tier, ModelTier::Reasoning);
    }

    #[test]
    fn privacy_flag_always_selects_local() {
        let tier = select_tier(Complexity::Simple, 0.95, true, None, DEFAULT_EVIDENCE_QUALITY_THRESHOLD);
        assert_eq!(tier, ModelTier::Local);
    }

    #[test]
    fn escalation_never_downgrades() {
        let tier = select_tier(Complexity::Simple, 0.95, false, Some(ModelTier::Reasoning), DEFAULT_EVIDENCE_QUALITY_THRESHOLD);
        assert_eq!(tier, ModelTier::Reasoning);
    }

    #[test]
    fn lower_quality_threshold_keeps_more_claims_on_cheap_tier() {
        let tier = select_tier(Complexity::Simple, 0.7, false, None, 0.65);
        assert_eq!(tier, ModelTier::Cheap);
        let tier = select_tier(Complexity::Simple, 0.7, false, None, 0.8);
        assert_eq!(tier, ModelTier::Reasoning);
    }

    #[test]
    fn low_confidence_cheap_result_escalates_once() {
        let escalated = escalate_on_low_confidence(ModelTier::Cheap, 0.4);
        assert_eq!(escalated, ModelTier::Reasoning);
        // a second low-confidence result at reasoning tier does not escalate further here;
        // that decision belongs to the caller's "at most one escalation" bookkeeping.
        let unchanged = escalate_on_low_confidence(ModelTier::Reasoning, 0.4);
        assert_eq!(unchanged, ModelTier::Reasoning);
    }
}
