//! Designated failure values and the shipped error type.
//!
//! Tasks and proxies stay generic in their error type; the engine only needs
//! the ability to synthesize a handful of designated failures (cancellation,
//! bottom, and friends). That capability is the [`Failure`] trait, and
//! [`PipelineError`] is the implementation shipped with the crate.

use thiserror::Error;

/// Errors an execution substrate must be able to synthesize.
///
/// Implement this for your own error type to run pipelines with it; the
/// designated values let the engine report cancellation, invalid states and
/// unsupported operations without knowing anything else about the type.
pub trait Failure: Clone + Send + Sync + 'static {
    /// Operator-requested cancellation, distinguished from domain failure so
    /// callers can treat it specially (e.g. not retry).
    fn cancelled() -> Self;

    /// A computation observed in an invalid or uninitialized state, or a
    /// fault that escaped the computation itself.
    fn bottom() -> Self;

    /// A filtered value did not match the predicate.
    fn predicate_failed() -> Self;

    /// Effect extraction was asked of a pipeline that never lifted one.
    fn no_lifted_effect() -> Self;

    /// True if this value is the cancellation failure.
    fn is_cancelled(&self) -> bool;
}

/// Errors produced by pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The context's cancellation token was signaled.
    #[error("operation cancelled")]
    Cancelled,

    /// A computation was observed in an invalid or uninitialized state.
    #[error("bottom: computation in an invalid or uninitialized state")]
    Bottom,

    /// A filtered value did not match the predicate.
    #[error("predicate failed")]
    PredicateFailed,

    /// Effect extraction found no lifted effect to extract.
    #[error("no lifted effect to extract")]
    NoLiftedEffect,

    /// A domain failure raised by pipeline logic.
    #[error("{0}")]
    Message(String),
}

impl PipelineError {
    /// A domain failure carrying a message.
    pub fn msg(message: impl Into<String>) -> Self {
        PipelineError::Message(message.into())
    }
}

impl Failure for PipelineError {
    fn cancelled() -> Self {
        PipelineError::Cancelled
    }

    fn bottom() -> Self {
        PipelineError::Bottom
    }

    fn predicate_failed() -> Self {
        PipelineError::PredicateFailed
    }

    fn no_lifted_effect() -> Self {
        PipelineError::NoLiftedEffect
    }

    fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}
