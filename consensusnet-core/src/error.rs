//! Error taxonomy surfaced on `SubmissionResult.error` (spec §7).

use thiserror::Error;

/// Core error kinds. Transient leaf errors (source timeouts, single-tier
/// model errors) never reach this enum — they are recovered locally by the
/// evidence aggregator and model router. Only structural failures and
/// terminal outcomes are represented here.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CoreError {
    #[error("claim is empty or exceeds the length cap")]
    InputInvalid { reason: String },

    #[error("no agent in the registry satisfies the required capability set")]
    NoCapableAgent,

    #[error("pool work queue is full")]
    Overloaded,

    #[error("fewer than the required quorum of agents responded in time")]
    Incomplete { responded: usize, required: usize },

    #[error("request was cancelled")]
    Cancelled,

    #[error("internal invariant violation: {message}")]
    Internal { message: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<CoreError> for String {
    fn from(err: CoreError) -> Self {
        err.to_string()
    }
}
