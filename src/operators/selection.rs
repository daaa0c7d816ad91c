//! Chooses a parent index out of a population. Every selector is
//! comparator-agnostic: it takes a `Comparator` closure so the same
//! selector code serves single-objective (lower fitness wins) and
//! multi-objective (crowded comparison on rank + survival score) driving.

use super::GeneticOperator;
use crate::individual::Population;
use crate::random::RandomGenerator;
use ordered_float::OrderedFloat;

/// `true` if `lhs` is preferred over `rhs`. Single-objective drivers
/// compare `fitness[0]`; NSGA-II compares `(rank, survival_score)`.
pub trait Comparator: Fn(&crate::individual::Individual, &crate::individual::Individual) -> bool {}
impl<T: Fn(&crate::individual::Individual, &crate::individual::Individual) -> bool> Comparator for T {}

pub trait SelectionOperator: GeneticOperator {
    fn select(&self, rng: &mut impl RandomGenerator, population: &Population, compare: &dyn Comparator) -> usize;
}

/// Draws `tournament_size` candidates uniformly and keeps the one
/// preferred by `compare`.
#[derive(Debug, Clone)]
pub struct TournamentSelector {
    pub tournament_size: usize,
}

impl GeneticOperator for TournamentSelector {
    fn name(&self) -> String {
        "TournamentSelector".into()
    }
}

impl SelectionOperator for TournamentSelector {
    fn select(&self, rng: &mut impl RandomGenerator, population: &Population, compare: &dyn Comparator) -> usize {
        let n = population.len();
        let individuals = population.as_slice();
        let mut best = rng.gen_range_usize(0, n);
        for _ in 1..self.tournament_size.max(1) {
            let curr = rng.gen_range_usize(0, n);
            if compare(&individuals[curr], &individuals[best]) {
                best = curr;
            }
        }
        best
    }
}

/// Like `TournamentSelector`, but compares by precomputed rank position
/// (the index into a pre-sorted order) rather than invoking `compare`
/// per draw — cheaper when the whole population is already ordered.
#[derive(Debug, Clone)]
pub struct RankTournamentSelector {
    pub tournament_size: usize,
}

impl GeneticOperator for RankTournamentSelector {
    fn name(&self) -> String {
        "RankTournamentSelector".into()
    }
}

impl RankTournamentSelector {
    /// `ranked_indices[k]` is the population index of the k-th best
    /// individual, precomputed once per generation by `compare`.
    pub fn prepare(population: &Population, compare: &dyn Comparator) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..population.len()).collect();
        let individuals = population.as_slice();
        indices.sort_by(|&i, &j| {
            if compare(&individuals[i], &individuals[j]) {
                std::cmp::Ordering::Less
            } else if compare(&individuals[j], &individuals[i]) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
        indices
    }

    pub fn select_from_ranked(&self, rng: &mut impl RandomGenerator, ranked_indices: &[usize]) -> usize {
        let n = ranked_indices.len();
        let mut best_rank = rng.gen_range_usize(0, n);
        for _ in 1..self.tournament_size.max(1) {
            let curr_rank = rng.gen_range_usize(0, n);
            if curr_rank < best_rank {
                best_rank = curr_rank;
            }
        }
        ranked_indices[best_rank]
    }
}

impl SelectionOperator for RankTournamentSelector {
    fn select(&self, rng: &mut impl RandomGenerator, population: &Population, compare: &dyn Comparator) -> usize {
        let ranked = Self::prepare(population, compare);
        self.select_from_ranked(rng, &ranked)
    }
}

/// Selects proportionally to `weight(individual)` via cumulative-sum
/// sampling (fitness-proportionate / "roulette wheel" selection).
#[derive(Debug, Clone)]
pub struct ProportionalSelector;

impl GeneticOperator for ProportionalSelector {
    fn name(&self) -> String {
        "ProportionalSelector".into()
    }
}

impl ProportionalSelector {
    /// Builds a cumulative-weight table where lower fitness gets higher
    /// weight (`vmax - fitness`), so the fittest (lowest) individual is
    /// proportionally most likely to be drawn.
    pub fn select_weighted(&self, rng: &mut impl RandomGenerator, population: &Population, objective: usize) -> usize {
        let individuals = population.as_slice();
        let vmax = individuals
            .iter()
            .map(|i| OrderedFloat(i.fitness()[objective]))
            .max()
            .map(OrderedFloat::into_inner)
            .unwrap_or(f64::MIN);
        let mut cumulative = Vec::with_capacity(individuals.len());
        let mut running = 0.0;
        for ind in individuals {
            running += vmax - ind.fitness()[objective];
            cumulative.push(running);
        }
        let total = *cumulative.last().unwrap_or(&0.0);
        if total <= 0.0 {
            return rng.gen_range_usize(0, individuals.len());
        }
        let target = rng.gen_range_f64(0.0, total - f64::EPSILON);
        cumulative
            .iter()
            .position(|&c| c >= target)
            .unwrap_or(individuals.len() - 1)
    }
}

impl SelectionOperator for ProportionalSelector {
    fn select(&self, rng: &mut impl RandomGenerator, population: &Population, _compare: &dyn Comparator) -> usize {
        self.select_weighted(rng, population, 0)
    }
}

/// Uniformly-random selection, ignoring fitness entirely.
#[derive(Debug, Clone, Default)]
pub struct RandomSelector;

impl GeneticOperator for RandomSelector {
    fn name(&self) -> String {
        "RandomSelector".into()
    }
}

impl SelectionOperator for RandomSelector {
    fn select(&self, rng: &mut impl RandomGenerator, population: &Population, _compare: &dyn Comparator) -> usize {
        rng.gen_range_usize(0, population.len())
    }
}

/// Default single-objective comparator: lower `fitness[0]` wins.
pub fn single_objective_minimize(a: &crate::individual::Individual, b: &crate::individual::Individual) -> bool {
    a.fitness()[0] < b.fitness()[0]
}

/// NSGA-II crowded comparison: lower rank wins; ties broken by higher
/// survival (crowding) score.
pub fn crowded_comparison(a: &crate::individual::Individual, b: &crate::individual::Individual) -> bool {
    if a.rank() != b.rank() {
        a.rank() < b.rank()
    } else {
        a.survival_score() > b.survival_score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionKind;
    use crate::individual::Individual;
    use crate::random::EngineRandomGenerator;

    fn population_with_fitness(values: &[f64]) -> Population {
        Population::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &f)| {
                    let mut ind = Individual::new(vec![1.0], vec![FunctionKind::Identity], vec![vec![1.0]], i as u64);
                    ind.set_fitness(vec![f]);
                    ind
                })
                .collect(),
        )
    }

    #[test]
    fn tournament_prefers_lower_fitness_eventually() {
        let pop = population_with_fitness(&[5.0, 1.0, 4.0, 3.0]);
        let selector = TournamentSelector { tournament_size: 4 };
        let mut rng = EngineRandomGenerator::new_from_seed(Some(1));
        let mut best_count = 0;
        for _ in 0..50 {
            let idx = selector.select(&mut rng, &pop, &single_objective_minimize);
            if idx == 1 {
                best_count += 1;
            }
        }
        assert!(best_count > 20, "tournament should pick the best more than half the time, got {best_count}/50");
    }

    #[test]
    fn proportional_selector_favors_lower_fitness() {
        let pop = population_with_fitness(&[10.0, 1.0]);
        let selector = ProportionalSelector;
        let mut rng = EngineRandomGenerator::new_from_seed(Some(2));
        let mut counts = [0usize; 2];
        for _ in 0..2000 {
            counts[selector.select_weighted(&mut rng, &pop, 0)] += 1;
        }
        assert!(counts[1] > counts[0]);
    }

    #[test]
    fn crowded_comparison_prefers_lower_rank() {
        let mut a = Individual::new(vec![1.0], vec![FunctionKind::Identity], vec![vec![1.0]], 0);
        a.set_rank(0);
        a.set_survival_score(0.1);
        let mut b = Individual::new(vec![1.0], vec![FunctionKind::Identity], vec![vec![1.0]], 1);
        b.set_rank(1);
        b.set_survival_score(10.0);
        assert!(crowded_comparison(&a, &b));
    }
}
