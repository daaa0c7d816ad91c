//! Parallel symbolic-regression engine.
//!
//! An individual is a sum of coefficient-weighted, unary-function-wrapped
//! monomials over a dataset's input variables:
//! `y(x) = Σᵢ coefficient[i] · function[i]( Πⱼ xⱼ^{exponent[i][j]} )`.
//! Populations of these are evolved by a single-objective generational
//! driver or an NSGA-II multi-objective driver (accuracy vs. complexity),
//! using pluggable creators, variation operators, offspring generators,
//! reinserters, a nonlinear-least-squares local search for coefficient
//! refinement, and non-dominated sorting.
//!
//! No CLI, CSV loading, or file/wire format is part of this crate: callers
//! provide a [`dataset::Dataset`] already in memory and drive a
//! [`driver::GeneticProgrammingAlgorithm`] or [`driver::Nsga2Algorithm`]
//! directly.

pub mod dataset;
pub mod dispatch;
pub mod driver;
pub mod evaluator;
pub mod format;
pub mod function;
pub mod individual;
pub mod interpreter;
pub mod local_search;
pub mod metrics;
pub mod nondominated;
pub mod operators;
pub mod random;

pub use dataset::{Dataset, Range, Variable};
pub use driver::{GeneticProgrammingAlgorithm, GeneticProgrammingAlgorithmBuilder, Nsga2Algorithm, Nsga2AlgorithmBuilder};
pub use evaluator::{ErrorMetric, Evaluator, EvaluatorBuilder};
pub use function::{FunctionCatalog, FunctionKind};
pub use individual::{Individual, Population};
pub use interpreter::Interpreter;
pub use random::{EngineRandomGenerator, RandomGenerator};
