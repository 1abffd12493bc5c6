//! Error types for pipeline construction.
//!
//! Engine/transcoder failures at synthesis time are swallowed per-segment
//! (logged, never surfaced — see [`crate::worker`]) and carried internally as
//! `anyhow::Error`; they never reach this enum. `PipelineError` is reserved
//! for the smaller set of mistakes that are only detectable at construction
//! time, where a caller benefits from a typed, matchable error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no model registered under the name '{0}'")]
    UnknownModel(String),

    #[error("failed to construct engine for model '{model}': {source}")]
    EngineConstruction {
        model: String,
        #[source]
        source: anyhow::Error,
    },
}
