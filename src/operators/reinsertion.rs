//! Merges an offspring pool back into the surviving population.

use super::GeneticOperator;
use crate::individual::Population;

pub trait Reinserter: GeneticOperator {
    /// Produce the next-generation population from the current one plus a
    /// freshly generated offspring pool.
    fn reinsert(&self, population: Population, pool: Population, compare: &dyn Fn(&crate::individual::Individual, &crate::individual::Individual) -> bool) -> Population;
}

/// Keeps the best `|population|` individuals out of `population ++ pool`.
#[derive(Debug, Clone, Default)]
pub struct KeepBestReinserter;

impl GeneticOperator for KeepBestReinserter {
    fn name(&self) -> String {
        "KeepBestReinserter".into()
    }
}

impl Reinserter for KeepBestReinserter {
    fn reinsert(&self, population: Population, pool: Population, compare: &dyn Fn(&crate::individual::Individual, &crate::individual::Individual) -> bool) -> Population {
        let target_size = population.len();
        let mut combined = population.into_vec();
        combined.extend(pool.into_vec());
        combined.sort_by(|a, b| {
            if compare(a, b) {
                std::cmp::Ordering::Less
            } else if compare(b, a) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
        combined.truncate(target_size);
        Population::new(combined)
    }
}

/// Replaces the worst individuals in `population` with the best
/// individuals from `pool`, keeping `population`'s size.
#[derive(Debug, Clone, Default)]
pub struct ReplaceWorstReinserter;

impl GeneticOperator for ReplaceWorstReinserter {
    fn name(&self) -> String {
        "ReplaceWorstReinserter".into()
    }
}

impl Reinserter for ReplaceWorstReinserter {
    fn reinsert(&self, population: Population, pool: Population, compare: &dyn Fn(&crate::individual::Individual, &crate::individual::Individual) -> bool) -> Population {
        let target_size = population.len();
        let mut pop_vec = population.into_vec();
        let mut pool_vec = pool.into_vec();
        let by = |a: &crate::individual::Individual, b: &crate::individual::Individual| {
            if compare(a, b) {
                std::cmp::Ordering::Less
            } else if compare(b, a) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        };
        pop_vec.sort_by(by);
        pool_vec.sort_by(by);
        let offset = target_size.min(pool_vec.len());
        let keep = target_size - offset;
        let mut next = pop_vec[..keep].to_vec();
        next.extend(pool_vec[..offset].iter().cloned());
        Population::new(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionKind;
    use crate::individual::Individual;

    fn individual(fitness: f64, birth: u64) -> Individual {
        let mut ind = Individual::new(vec![1.0], vec![FunctionKind::Identity], vec![vec![1.0]], birth);
        ind.set_fitness(vec![fitness]);
        ind
    }

    fn lower_is_better(a: &Individual, b: &Individual) -> bool {
        a.fitness()[0] < b.fitness()[0]
    }

    #[test]
    fn keep_best_keeps_lowest_fitness_overall() {
        let pop = Population::new(vec![individual(5.0, 0), individual(3.0, 1)]);
        let pool = Population::new(vec![individual(1.0, 2), individual(9.0, 3)]);
        let next = KeepBestReinserter.reinsert(pop, pool, &lower_is_better);
        assert_eq!(next.len(), 2);
        let fitnesses: Vec<f64> = next.iter().map(|i| i.fitness()[0]).collect();
        assert!(fitnesses.contains(&1.0));
        assert!(fitnesses.contains(&3.0));
    }

    #[test]
    fn replace_worst_keeps_population_size() {
        let pop = Population::new(vec![individual(5.0, 0), individual(3.0, 1), individual(8.0, 2)]);
        let pool = Population::new(vec![individual(1.0, 3)]);
        let next = ReplaceWorstReinserter.reinsert(pop, pool, &lower_is_better);
        assert_eq!(next.len(), 3);
        let fitnesses: Vec<f64> = next.iter().map(|i| i.fitness()[0]).collect();
        assert!(fitnesses.contains(&1.0));
        assert!(!fitnesses.contains(&8.0));
    }
}
