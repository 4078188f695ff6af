//! Adaptive source credibility tracking (spec §4.7.2): each evidence source
//! carries a credibility score that drifts toward its recent performance but
//! never leaves its tier's floor/ceiling band.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::types::{GroundTruth, SourceCredibility, SourceTier};

/// Weight given to the EMA's old value; the complement goes to the new
/// performance sample (`credibility_new = 0.7·credibility_old + 0.3·performance_score`).
pub const CREDIBILITY_RETENTION: f32 = 0.7;
pub const PERFORMANCE_WEIGHT: f32 = 1.0 - CREDIBILITY_RETENTION;

pub struct SourceCredibilityStore {
    sources: DashMap<String, Mutex<(SourceTier, SourceCredibility)>>,
    beta: f32,
}

impl SourceCredibilityStore {
    pub fn new() -> Self {
        Self::with_beta(PERFORMANCE_WEIGHT)
    }

    /// Builds a store whose adaptation weight β (`source.credibility_update_weight`)
    /// comes from configuration rather than the crate default.
    pub fn with_beta(beta: f32) -> Self {
        Self {
            sources: DashMap::new(),
            beta: beta.clamp(0.0, 1.0),
        }
    }

    pub fn credibility(&self, source_id: &str) -> Option<f32> {
        self.sources.get(source_id).map(|lock| lock.lock().1.credibility)
    }

    /// Initializes a source at the midpoint of its tier's band, or returns
    /// the existing entry if already tracked.
    pub fn register(&self, source_id: &str, tier: SourceTier, at: DateTime<Utc>) -> f32 {
        let (floor, ceiling) = tier.credibility_bounds();
        let midpoint = floor + (ceiling - floor) / 2.0;
        let entry = self
            .sources
            .entry(source_id.to_string())
            .or_insert_with(|| Mutex::new((tier, SourceCredibility::new(midpoint, at))));
        entry.lock().1.credibility
    }

    /// Updates a source's credibility given a [0,1] performance score for its
    /// most recent contribution (e.g. 1.0 if its evidence supported the
    /// eventual consensus, 0.0 if contradicted). `ground_truth` of
    /// `AdversarialOutcome` applies the update at half weight, matching the
    /// agent-reputation rule (SPEC_FULL §14).
    pub fn update(
        &self,
        source_id: &str,
        tier: SourceTier,
        performance_score: f32,
        ground_truth: GroundTruth,
        at: DateTime<Utc>,
    ) -> f32 {
        let (floor, ceiling) = tier.credibility_bounds();
        let entry = self.sources.entry(source_id.to_string()).or_insert_with(|| {
            let midpoint = floor + (ceiling - floor) / 2.0;
            Mutex::new((tier, SourceCredibility::new(midpoint, at)))
        });
        let mut guard = entry.lock();
        let (_, credibility) = &mut *guard;

        let beta = match ground_truth {
            GroundTruth::AdversarialOutcome => self.beta / 2.0,
            GroundTruth::ExternalFeedback | GroundTruth::HigherTierConfirmation => self.beta,
        };
        let retention = 1.0 - beta;

        let new_value = retention * credibility.credibility + beta * performance_score.clamp(0.0, 1.0);
        credibility.credibility = new_value.clamp(floor, ceiling);
        credibility.sample_count += 1;
        credibility.last_update = at;
        credibility.credibility
    }
}

impl Default for SourceCredibilityStore {
    fn default() -> Self {
        Self::new()
    }
}
