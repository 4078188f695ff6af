//! ConsensusNet — centralized, validated configuration.
//!
//! Loads a layered configuration (defaults → file → environment) into an
//! immutable `ConsensusNetConfig`, validating every option against its
//! declared range before handing out clones to subcomponents.

pub mod config;
pub mod loader;
pub mod validation;

pub use config::{
    AdversarialSettings, CalibrationSettings, ConsensusNetConfig, ConsensusRuleName, ConsensusSettings,
    EscalationSettings, PoolSettings, ReputationSettings, SourceSettings,
};
pub use loader::{ConfigLoadResult, ConfigLoader, ConfigLoaderBuilder, ConfigSource, MergeStrategy};
pub use validation::{ConfigError, ConfigResult};
