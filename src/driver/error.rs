//! Driver-level error conditions, layered over the lower-level
//! evaluator/interpreter errors they wrap.

use crate::evaluator::EvaluatorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("population size must be at least 1, got {0}")]
    EmptyPopulation(usize),
    #[error("offspring pool size must be at least 1, got {0}")]
    EmptyPool(usize),
}

#[derive(Debug, Error)]
pub enum AlgorithmError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),
    #[error(transparent)]
    Evaluation(#[from] EvaluatorError),
    #[error("offspring generator produced no individuals this generation")]
    EmptyMatingResult,
}
