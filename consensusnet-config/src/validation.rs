//! Typed configuration errors raised at load time (spec §6: "values outside
//! declared ranges are rejected at load time with a precise error").

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("option {option} is out of range: {reason}")]
    OutOfRange { option: String, reason: String },

    #[error("failed to parse configuration source: {0}")]
    Parse(String),

    #[error("configuration file not found: {0}")]
    NotFound(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
