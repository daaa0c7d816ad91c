//! Every evolutionary operator (creator, mutation, crossover, selection,
//! reinsertion, offspring generation) implements the tiny [`GeneticOperator`]
//! reflection hook plus a stage-specific trait, so the driver can compose
//! and swap them without caring about the concrete type.

use std::fmt::Debug;

pub mod creator;
pub mod crossover;
pub mod mutation;
pub mod offspring;
pub mod reinsertion;
pub mod selection;

pub use creator::CreatorOperator;
pub use crossover::CrossoverOperator;
pub use mutation::MutationOperator;
pub use offspring::{
    BasicOffspringGenerator, BroodOffspringGenerator, OffspringGenerator, OffspringSelectionGenerator,
    PolygenicOffspringGenerator,
};
pub use reinsertion::Reinserter;
pub use selection::SelectionOperator;

pub trait GeneticOperator: Debug {
    fn name(&self) -> String;
}
