//! ConsensusNet — agent reputation and source credibility (spec §3, §4.7).
//!
//! Reputation is event-sourced: every verification, challenge, and
//! consensus outcome emits a `ReputationEvent`, which the store folds into
//! an exponentially-decayed `ReputationRecord` per agent (and per domain).
//! `SourceCredibilityStore` tracks the analogous signal for evidence
//! sources, clamped to each source tier's trust band.

pub mod source_credibility;
pub mod store;
pub mod types;

pub use source_credibility::{SourceCredibilityStore, CREDIBILITY_RETENTION, PERFORMANCE_WEIGHT};
pub use store::{DecayParams, ReputationStore, DEFAULT_ALPHA, DEFAULT_HALF_LIFE_DAYS, DEFAULT_SETTLE_THRESHOLD};
pub use types::{
    AgentId, Dimension, Domain, EventKind, GroundTruth, ReputationError, ReputationEvent,
    ReputationRecord, SourceCredibility, SourceTier,
};
