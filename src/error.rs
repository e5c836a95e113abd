//! Error types for run setup and evolution.

use crate::gp::{EvalError, SymbolError};
use thiserror::Error;

/// Problems detected before the first generation runs.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// The symbol code space cannot hold the requested layout.
    #[error(transparent)]
    Symbols(#[from] SymbolError),
    /// The worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl SetupError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors that end an evolution run.
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// Setup failed; no generation ran.
    #[error(transparent)]
    Setup(#[from] SetupError),
    /// A genome could not be evaluated. This means a genetic operator
    /// produced a corrupted genome.
    #[error("evaluation failed: {0}")]
    Eval(#[from] EvalError),
}

impl From<SymbolError> for EvolutionError {
    fn from(e: SymbolError) -> Self {
        Self::Setup(e.into())
    }
}

impl From<rayon::ThreadPoolBuildError> for EvolutionError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::Setup(e.into())
    }
}
