//! Evolutionary drivers: single-objective generational search and the
//! NSGA-II multi-objective variant, sharing a context/error vocabulary.

pub mod context;
pub mod error;
pub mod gp;
pub mod nsga2;

pub use context::AlgorithmContext;
pub use error::{AlgorithmError, InitializationError};
pub use gp::{GeneticProgrammingAlgorithm, GeneticProgrammingAlgorithmBuilder};
pub use nsga2::{Nsga2Algorithm, Nsga2AlgorithmBuilder};
