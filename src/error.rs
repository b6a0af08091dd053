use thiserror::Error;

/// Library-fault layer only: fetch failures and invalid configuration. Gate,
/// planner, and scorer rejections are never represented here — they are
/// first-class `reason`-carrying values returned from their own functions.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no exchange reachable for this tick: {0}")]
    FetchError(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
