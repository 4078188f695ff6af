//! Evidence Aggregator (spec §4.3): fans a claim out to every registered
//! `EvidenceSource`, bounds each call and the whole fan-out, dedups by
//! content, and folds the result into an `EvidenceBundle`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use consensusnet_resilience::{CircuitBreaker, CircuitBreakerConfig};
use dashmap::DashMap;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::types::{Domain, EvidenceBundle, EvidenceItem, SourceTier, Stance};

/// Per-source call budget (spec §4.3).
pub const SOURCE_TIMEOUT_MS: u64 = 2_000;
/// Whole-fan-out budget (spec §4.3).
pub const TOTAL_TIMEOUT_MS: u64 = 8_000;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EvidenceError {
    #[error("source {source} timed out")]
    SourceTimeout { source: String },
    #[error("source {source} returned an error: {message}")]
    SourceFailed { source: String, message: String },
}

/// A collaborator the aggregator fans a claim out to.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, claim_text: &str, domain: Domain) -> Result<Vec<EvidenceItem>, EvidenceError>;
}

/// Deterministic in-memory source used by tests and local demos.
pub struct StaticEvidenceSource {
    pub source_name: String,
    pub items: Vec<EvidenceItem>,
}

#[async_trait]
impl EvidenceSource for StaticEvidenceSource {
    fn name(&self) -> &str {
        &self.source_name
    }

    async fn fetch(&self, _claim_text: &str, _domain: Domain) -> Result<Vec<EvidenceItem>, EvidenceError> {
        Ok(self.items.clone())
    }
}

pub struct EvidenceAggregator {
    sources: Vec<Arc<dyn EvidenceSource>>,
    source_timeout: Duration,
    total_timeout: Duration,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    /// Most recently observed tier for each `source_id`, so a caller that
    /// only has a `Verdict.sources` id (spec §4.7.2 source-credibility
    /// update) can recover the tier needed to apply its credibility bounds.
    known_tiers: DashMap<String, SourceTier>,
}

impl EvidenceAggregator {
    pub fn new(sources: Vec<Arc<dyn EvidenceSource>>) -> Self {
        Self {
            sources,
            source_timeout: Duration::from_millis(SOURCE_TIMEOUT_MS),
            total_timeout: Duration::from_millis(TOTAL_TIMEOUT_MS),
            breakers: DashMap::new(),
            known_tiers: DashMap::new(),
        }
    }

    /// Tier last observed for `source_id`, if this aggregator has ever
    /// returned evidence from it.
    pub fn tier_for(&self, source_id: &str) -> Option<SourceTier> {
        self.known_tiers.get(source_id).map(|t| *t)
    }

    pub fn with_timeouts(mut self, source_timeout: Duration, total_timeout: Duration) -> Self {
        self.source_timeout = source_timeout;
        self.total_timeout = total_timeout;
        self
    }

    /// Per-source circuit breaker, created lazily on first use and shared
    /// across calls so a source that keeps failing trips its breaker and
    /// stops being hammered, independent of the other sources.
    fn breaker_for(&self, source_name: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(source_name.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
                    name: Some(source_name.to_string()),
                    ..CircuitBreakerConfig::default()
                }))
            })
            .clone()
    }

    /// Fan out to every source concurrently, bounded by `total_timeout`
    /// overall and `source_timeout` per source. A source that times out or
    /// errors simply contributes nothing; the bundle is never an error, per
    /// spec §4.3's "evidence shortage degrades to UNCERTAIN, not a hard
    /// failure" rule.
    pub async fn gather(&self, claim_text: &str, domain: Domain) -> EvidenceBundle {
        let per_source = self.sources.iter().map(|source| {
            let source = source.clone();
            let claim_text = claim_text.to_string();
            let timeout = self.source_timeout;
            let breaker = self.breaker_for(source.name());
            async move {
                let source_name = source.name().to_string();
                let result = breaker
                    .execute(
                        move || {
                            let source = source.clone();
                            let claim_text = claim_text.clone();
                            let source_name = source_name.clone();
                            Box::pin(async move {
                                match tokio::time::timeout(timeout, source.fetch(&claim_text, domain)).await
                                {
                                    Ok(Ok(items)) => Ok(items),
                                    Ok(Err(err)) => {
                                        Err(Box::new(err) as Box<dyn std::error::Error + Send + Sync>)
                                    }
                                    Err(_) => Err(Box::new(EvidenceError::SourceTimeout {
                                        source: source_name,
                                    })
                                        as Box<dyn std::error::Error + Send + Sync>),
                                }
                            })
                        },
                        None,
                    )
                    .await;

                match result {
                    Ok(items) => items,
                    Err(err) => {
                        warn!(source = %source.name(), error = %err, "evidence source unavailable");
                        Vec::new()
                    }
                }
            }
        });

        let fan_out = join_all(per_source);
        let results = match tokio::time::timeout(self.total_timeout, fan_out).await {
            Ok(results) => results,
            Err(_) => {
                warn!("evidence fan-out exceeded total timeout, returning partial results");
                Vec::new()
            }
        };

        let all_items: Vec<EvidenceItem> = results.into_iter().flatten().collect();
        for item in &all_items {
            self.known_tiers.insert(item.source_id.clone(), item.source_tier);
        }
        Self::fold(all_items, domain)
    }

    /// Dedup by content, keeping the highest-credibility duplicate, then
    /// bucket by stance and compute the overall quality score.
    fn fold(items: Vec<EvidenceItem>, domain: Domain) -> EvidenceBundle {
        let mut by_content: HashMap<String, EvidenceItem> = HashMap::new();
        for item in items {
            by_content
                .entry(item.content.clone())
                .and_modify(|existing| {
                    if item.credibility > existing.credibility {
                        *existing = item.clone();
                    }
                })
                .or_insert(item);
        }

        let mut supporting = Vec::new();
        let mut contradicting = Vec::new();
        let mut neutral = Vec::new();
        for item in by_content.into_values() {
            match item.stance {
                Stance::Supports => supporting.push(item),
                Stance::Contradicts => contradicting.push(item),
                Stance::Neutral => neutral.push(item),
            }
        }

        // §4.3 step 5: overall_quality = clamp(sum(credibility * relevance) / max_expected, 0, 1).
        // `max_expected` is a domain-specific constant (e.g. 4.0 for `health`);
        // the invariant `overall_quality = 0 <=> bundle has no items` holds
        // since every summed term is non-negative and a non-empty bundle has
        // at least one item whose credibility/relevance are both > 0.
        let max_expected = max_expected_items(domain);
        let count = supporting.len() + contradicting.len() + neutral.len();
        let weighted_sum: f32 = supporting
            .iter()
            .chain(contradicting.iter())
            .chain(neutral.iter())
            .map(|i| i.credibility * i.relevance)
            .sum();
        // A tiny floor for the degenerate case of a non-empty bundle whose
        // items all carry zero credibility/relevance, so the `overall_quality
        // = 0 <=> no items` invariant (spec §3) holds even then; it is far
        // below any value the credibility*relevance formula would itself
        // produce for real evidence, so it never overrides the formula.
        let floor = if count > 0 { f32::EPSILON } else { 0.0 };
        let overall_quality = (weighted_sum / max_expected as f32).max(floor).clamp(0.0, 1.0);

        debug!(count, overall_quality, "folded evidence bundle");

        EvidenceBundle {
            supporting,
            contradicting,
            neutral,
            overall_quality,
        }
    }
}

/// Domain-specific `max_expected` constant from §4.3 step 5 (spec gives 4.0
/// for `health` as the worked example); narrower domains expect fewer
/// independent high-quality sources to exist before quality saturates.
fn max_expected_items(domain: Domain) -> usize {
    match domain {
        Domain::Health => 4,
        Domain::Science => 5,
        Domain::News => 5,
        Domain::Tech => 4,
        Domain::General => 4,
    }
}
