//! Samples a fresh individual from scratch: every term gets a unit
//! coefficient, a catalog-sampled unary wrapper, and a uniformly-drawn
//! exponent vector.

use super::GeneticOperator;
use crate::function::FunctionCatalog;
use crate::individual::Individual;
use crate::random::RandomGenerator;

pub trait CreatorOperator: GeneticOperator {
    /// `terms` ≥ 1, `exponent_bound` ≥ 0. `birth` tags the new individual
    /// with a caller-assigned stable index.
    fn create(
        &self,
        rng: &mut impl RandomGenerator,
        terms: usize,
        exponent_bound: f64,
        variables: usize,
        birth: u64,
    ) -> Individual;
}

/// Draws `function[i]` uniformly among unary kinds and each
/// `exponent[i][j]` uniformly from `[-bound-1, +bound+1]`.
#[derive(Debug, Clone)]
pub struct BalancedCreator {
    catalog: FunctionCatalog,
}

impl BalancedCreator {
    pub fn new(catalog: FunctionCatalog) -> Self {
        BalancedCreator { catalog }
    }
}

impl GeneticOperator for BalancedCreator {
    fn name(&self) -> String {
        "BalancedCreator".into()
    }
}

impl CreatorOperator for BalancedCreator {
    fn create(
        &self,
        rng: &mut impl RandomGenerator,
        terms: usize,
        exponent_bound: f64,
        variables: usize,
        birth: u64,
    ) -> Individual {
        debug_assert!(terms >= 1);
        debug_assert!(exponent_bound >= 0.0);
        let mut coefficient = Vec::with_capacity(terms);
        let mut function = Vec::with_capacity(terms);
        let mut exponent = Vec::with_capacity(terms);
        let lo = -exponent_bound - 1.0;
        let hi = exponent_bound + 1.0;
        for _ in 0..terms {
            coefficient.push(1.0);
            let kind = self
                .catalog
                .sample(rng.rng(), 1, 1)
                .expect("catalog must admit at least one unary kind");
            function.push(kind);
            let exps: Vec<f64> = (0..variables).map(|_| rng.gen_range_f64(lo, hi)).collect();
            exponent.push(exps);
        }
        Individual::new(coefficient, function, exponent, birth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::EngineRandomGenerator;

    #[test]
    fn created_individual_satisfies_invariants() {
        let creator = BalancedCreator::new(FunctionCatalog::arithmetic());
        let mut rng = EngineRandomGenerator::new_from_seed(Some(1));
        let ind = creator.create(&mut rng, 5, 3.0, 2, 0);
        assert_eq!(ind.length(), 5);
        assert_eq!(ind.coefficients(), &[1.0; 5]);
        for e in ind.exponents() {
            assert_eq!(e.len(), 2);
            for &v in e {
                assert!((-4.0..4.0).contains(&v));
            }
        }
    }

    #[test]
    fn functions_are_always_unary() {
        let creator = BalancedCreator::new(FunctionCatalog::full());
        let mut rng = EngineRandomGenerator::new_from_seed(Some(2));
        for _ in 0..50 {
            let ind = creator.create(&mut rng, 3, 1.0, 1, 0);
            for f in ind.functions() {
                assert!(f.is_unary());
            }
        }
    }
}
