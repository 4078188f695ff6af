//! Agent Registry (spec §4.2): capability-indexed lookup and ranking over
//! registered `AgentProfile`s, with heartbeat-based liveness.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::types::{AgentId, AgentProfile, Availability, Domain};

/// Default window after which a registered agent is considered dead if no
/// heartbeat has refreshed it.
pub const HEARTBEAT_TIMEOUT_MS: i64 = 15_000;

/// An agent is "unsettled" until it has accrued this many completed tasks;
/// its ranking is discounted slightly while unsettled (SPEC_FULL §12). This
/// default mirrors `reputation.update_after_uses`; `AgentRegistry::with_settle_threshold`
/// overrides it from configuration.
pub const DEFAULT_SETTLE_THRESHOLD: u32 = 10;

struct RegistryEntry {
    profile: AgentProfile,
    last_heartbeat: DateTime<Utc>,
    completed_tasks: u32,
}

/// Capability-indexed registry of verification agents.
pub struct AgentRegistry {
    entries: DashMap<AgentId, RegistryEntry>,
    max_load: u32,
    settle_threshold: u32,
}

impl AgentRegistry {
    pub fn new(max_load: u32) -> Self {
        Self {
            entries: DashMap::new(),
            max_load,
            settle_threshold: DEFAULT_SETTLE_THRESHOLD,
        }
    }

    /// Overrides the cold-start discount window from `reputation.update_after_uses`.
    pub fn with_settle_threshold(mut self, settle_threshold: u32) -> Self {
        self.settle_threshold = settle_threshold;
        self
    }

    pub fn register(&self, profile: AgentProfile) {
        let id = profile.agent_id.clone();
        self.entries.insert(
            id,
            RegistryEntry {
                profile,
                last_heartbeat: Utc::now(),
                completed_tasks: 0,
            },
        );
    }

    pub fn deregister(&self, agent_id: &str) {
        self.entries.remove(agent_id);
    }

    pub fn heartbeat(&self, agent_id: &str) {
        if let Some(mut entry) = self.entries.get_mut(agent_id) {
            entry.last_heartbeat = Utc::now();
        }
    }

    pub fn record_completion(&self, agent_id: &str) {
        if let Some(mut entry) = self.entries.get_mut(agent_id) {
            entry.completed_tasks = entry.completed_tasks.saturating_add(1);
        }
    }

    /// Drop any entry whose heartbeat has aged past `HEARTBEAT_TIMEOUT_MS`.
    pub fn sweep_dead(&self) {
        let now = Utc::now();
        let dead: Vec<AgentId> = self
            .entries
            .iter()
            .filter(|e| {
                (now - e.value().last_heartbeat).num_milliseconds() > HEARTBEAT_TIMEOUT_MS
            })
            .map(|e| e.key().clone())
            .collect();
        for id in dead {
            warn!(agent_id = %id, "deregistering agent on missed heartbeat");
            self.entries.remove(&id);
        }
    }

    /// Return agents satisfying `required` capabilities, sorted by
    /// `ranking()` descending, with a lexicographic `agent_id` tie-break so
    /// selection is deterministic across runs.
    pub fn capable_agents(&self, required: &[String], domain: Domain) -> Vec<AgentProfile> {
        let mut candidates: Vec<(f32, AgentProfile)> = self
            .entries
            .iter()
            .filter(|e| e.value().profile.availability != Availability::Draining)
            .filter(|e| e.value().profile.has_capabilities(required))
            .map(|e| {
                let entry = e.value();
                let mut score = entry.profile.ranking(domain, self.max_load);
                if entry.completed_tasks < self.settle_threshold {
                    score *= 0.9;
                }
                (score, entry.profile.clone())
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.agent_id.cmp(&b.1.agent_id))
        });

        debug!(count = candidates.len(), "ranked capable agents");
        candidates.into_iter().map(|(_, p)| p).collect()
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentProfile> {
        self.entries.get(agent_id).map(|e| e.profile.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_load(&self, agent_id: &str, load: u32) {
        if let Some(mut entry) = self.entries.get_mut(agent_id) {
            entry.profile.current_load = load;
        }
    }

    pub fn set_availability(&self, agent_id: &str, availability: Availability) {
        if let Some(mut entry) = self.entries.get_mut(agent_id) {
            entry.profile.availability = availability;
        }
    }

    pub fn snapshot(&self) -> HashMap<AgentId, AgentProfile> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().profile.clone()))
            .collect()
    }
}

pub type SharedRegistry = Arc<AgentRegistry>;

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, expertise: f32, load: u32) -> AgentProfile {
        let mut domain_expertise = HashMap::new();
        domain_expertise.insert(Domain::Science, expertise);
        AgentProfile {
            agent_id: id.to_string(),
            capabilities: vec!["verify".to_string()],
            domain_expertise,
            availability: Availability::Idle,
            current_load: load,
            reputation_overall: 0.5,
        }
    }

    #[test]
    fn ranks_higher_expertise_first() {
        let registry = AgentRegistry::new(10);
        registry.register(profile("low", 0.2, 0));
        registry.register(profile("high", 0.9, 0));
        // push both past the settle threshold so discount doesn't skew order
        for _ in 0..DEFAULT_SETTLE_THRESHOLD {
            registry.record_completion("low");
            registry.record_completion("high");
        }
        let ranked = registry.capable_agents(&["verify".to_string()], Domain::Science);
        assert_eq!(ranked[0].agent_id, "high");
    }

    #[test]
    fn excludes_draining_agents() {
        let registry = AgentRegistry::new(10);
        registry.register(profile("a", 0.5, 0));
        registry.set_availability("a", Availability::Draining);
        let ranked = registry.capable_agents(&["verify".to_string()], Domain::Science);
        assert!(ranked.is_empty());
    }

    #[test]
    fn excludes_missing_capability() {
        let registry = AgentRegistry::new(10);
        registry.register(profile("a", 0.5, 0));
        let ranked = registry.capable_agents(&["translate".to_string()], Domain::Science);
        assert!(ranked.is_empty());
    }

    #[test]
    fn tie_break_is_lexicographic() {
        let registry = AgentRegistry::new(10);
        registry.register(profile("bravo", 0.5, 0));
        registry.register(profile("alpha", 0.5, 0));
        for _ in 0..DEFAULT_SETTLE_THRESHOLD {
            registry.record_completion("bravo");
            registry.record_completion("alpha");
        }
        let ranked = registry.capable_agents(&["verify".to_string()], Domain::Science);
        assert_eq!(ranked[0].agent_id, "alpha");
    }
}
