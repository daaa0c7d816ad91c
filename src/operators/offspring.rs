//! Combines selection, crossover, mutation, and (via the caller-supplied
//! `evaluate` closure) the evaluator and optional local search into one
//! offspring, with configurable acceptance policy.

use super::crossover::CrossoverOperator;
use super::mutation::MutationOperator;
use super::selection::{Comparator, SelectionOperator};
use super::GeneticOperator;
use crate::evaluator::EvaluationBudget;
use crate::individual::{Individual, Population};
use crate::random::RandomGenerator;

/// Common surface over the four acceptance policies below, so a driver
/// can be generic over "however offspring get produced" without caring
/// which one.
pub trait OffspringGenerator {
    fn generate(
        &self,
        rng: &mut impl RandomGenerator,
        population: &Population,
        compare: &dyn Comparator,
        evaluate: &mut dyn FnMut(&mut Individual),
    ) -> Option<Individual>;

    /// Termination probe: true once the generator considers the run done.
    /// Defaults to the evaluator's own budget exhaustion; a generator with
    /// its own stopping signal (e.g. one tracking stagnation) can override.
    fn terminate(&self, budget: &EvaluationBudget) -> bool {
        budget.budget_exhausted()
    }
}

/// Shared recombination step: select two parents, cross with probability
/// `p_crossover`, mutate with probability `p_mutation`, then evaluate.
fn recombine<S, X, M>(
    rng: &mut impl RandomGenerator,
    population: &Population,
    female_selector: &S,
    male_selector: &S,
    crossover: &X,
    mutation: &M,
    p_crossover: f64,
    p_mutation: f64,
    max_length: usize,
    compare: &dyn Comparator,
    evaluate: &mut dyn FnMut(&mut Individual),
) -> (Individual, Individual, Option<Individual>)
where
    S: SelectionOperator,
    X: CrossoverOperator,
    M: MutationOperator,
{
    let i = female_selector.select(rng, population, compare);
    let j = male_selector.select(rng, population, compare);
    let parent1 = population.as_slice()[i].clone();
    let parent2 = population.as_slice()[j].clone();

    let mut child = if rng.gen_bool(p_crossover) {
        crossover.cross(rng, &parent1, &parent2)
    } else {
        parent1.clone()
    };
    if rng.gen_bool(p_mutation) {
        child = mutation.mutate(rng, child, max_length);
    }
    evaluate(&mut child);
    (parent1, parent2, Some(child))
}

/// Always accepts the recombined child.
#[derive(Debug, Clone)]
pub struct BasicOffspringGenerator<S, X, M> {
    pub female_selector: S,
    pub male_selector: S,
    pub crossover: X,
    pub mutation: M,
    pub p_crossover: f64,
    pub p_mutation: f64,
    pub max_length: usize,
}

impl<S: std::fmt::Debug, X: std::fmt::Debug, M: std::fmt::Debug> GeneticOperator for BasicOffspringGenerator<S, X, M> {
    fn name(&self) -> String {
        "BasicOffspringGenerator".into()
    }
}

impl<S, X, M> BasicOffspringGenerator<S, X, M>
where
    S: SelectionOperator,
    X: CrossoverOperator,
    M: MutationOperator,
{
    pub fn generate(
        &self,
        rng: &mut impl RandomGenerator,
        population: &Population,
        compare: &dyn Comparator,
        evaluate: &mut dyn FnMut(&mut Individual),
    ) -> Option<Individual> {
        let (_, _, child) = recombine(
            rng,
            population,
            &self.female_selector,
            &self.male_selector,
            &self.crossover,
            &self.mutation,
            self.p_crossover,
            self.p_mutation,
            self.max_length,
            compare,
            evaluate,
        );
        child
    }
}

impl<S, X, M> OffspringGenerator for BasicOffspringGenerator<S, X, M>
where
    S: SelectionOperator,
    X: CrossoverOperator,
    M: MutationOperator,
{
    fn generate(
        &self,
        rng: &mut impl RandomGenerator,
        population: &Population,
        compare: &dyn Comparator,
        evaluate: &mut dyn FnMut(&mut Individual),
    ) -> Option<Individual> {
        BasicOffspringGenerator::generate(self, rng, population, compare, evaluate)
    }
}

/// Accepts the child only if it is not Pareto-dominated by a threshold
/// vector `q[i] = max(f1[i], f2[i]) - comparison_factor * |f1[i] - f2[i]|`
/// built from its two parents — i.e. the offspring must be at least as
/// good as a relaxed version of the better parent on every objective.
#[derive(Debug, Clone)]
pub struct OffspringSelectionGenerator<S, X, M> {
    pub female_selector: S,
    pub male_selector: S,
    pub crossover: X,
    pub mutation: M,
    pub p_crossover: f64,
    pub p_mutation: f64,
    pub max_length: usize,
    pub comparison_factor: f64,
}

impl<S: std::fmt::Debug, X: std::fmt::Debug, M: std::fmt::Debug> GeneticOperator for OffspringSelectionGenerator<S, X, M> {
    fn name(&self) -> String {
        "OffspringSelectionGenerator".into()
    }
}

impl<S, X, M> OffspringSelectionGenerator<S, X, M>
where
    S: SelectionOperator,
    X: CrossoverOperator,
    M: MutationOperator,
{
    pub fn generate(
        &self,
        rng: &mut impl RandomGenerator,
        population: &Population,
        compare: &dyn Comparator,
        evaluate: &mut dyn FnMut(&mut Individual),
    ) -> Option<Individual> {
        let (p1, p2, child) = recombine(
            rng,
            population,
            &self.female_selector,
            &self.male_selector,
            &self.crossover,
            &self.mutation,
            self.p_crossover,
            self.p_mutation,
            self.max_length,
            compare,
            evaluate,
        );
        let child = child?;
        let n = child.fitness().len().min(p1.fitness().len()).min(p2.fitness().len());
        let q: Vec<f64> = (0..n)
            .map(|i| {
                let f1 = p1.fitness()[i];
                let f2 = p2.fitness()[i];
                f1.max(f2) - self.comparison_factor * (f1 - f2).abs()
            })
            .collect();
        // not dominated by q: the child must be at least as good as q on
        // some objective, i.e. q does not dominate the child.
        let q_dominates = (0..n).all(|i| q[i] <= child.fitness()[i]) && (0..n).any(|i| q[i] < child.fitness()[i]);
        if q_dominates {
            None
        } else {
            Some(child)
        }
    }
}

impl<S, X, M> OffspringGenerator for OffspringSelectionGenerator<S, X, M>
where
    S: SelectionOperator,
    X: CrossoverOperator,
    M: MutationOperator,
{
    fn generate(
        &self,
        rng: &mut impl RandomGenerator,
        population: &Population,
        compare: &dyn Comparator,
        evaluate: &mut dyn FnMut(&mut Individual),
    ) -> Option<Individual> {
        OffspringSelectionGenerator::generate(self, rng, population, compare, evaluate)
    }
}

fn brood_best(offspring: Vec<Individual>, compare: &dyn Comparator) -> Option<Individual> {
    offspring.into_iter().reduce(|best, candidate| {
        if compare(&candidate, &best) {
            candidate
        } else {
            best
        }
    })
}

/// Creates `brood_size` offspring from the *same* two selected parents,
/// then keeps the best by `compare`.
#[derive(Debug, Clone)]
pub struct BroodOffspringGenerator<S, X, M> {
    pub female_selector: S,
    pub male_selector: S,
    pub crossover: X,
    pub mutation: M,
    pub p_crossover: f64,
    pub p_mutation: f64,
    pub max_length: usize,
    pub brood_size: usize,
}

impl<S: std::fmt::Debug, X: std::fmt::Debug, M: std::fmt::Debug> GeneticOperator for BroodOffspringGenerator<S, X, M> {
    fn name(&self) -> String {
        "BroodOffspringGenerator".into()
    }
}

impl<S, X, M> BroodOffspringGenerator<S, X, M>
where
    S: SelectionOperator,
    X: CrossoverOperator,
    M: MutationOperator,
{
    pub fn generate(
        &self,
        rng: &mut impl RandomGenerator,
        population: &Population,
        compare: &dyn Comparator,
        evaluate: &mut dyn FnMut(&mut Individual),
    ) -> Option<Individual> {
        let i = self.female_selector.select(rng, population, compare);
        let j = self.male_selector.select(rng, population, compare);
        let parent1 = population.as_slice()[i].clone();
        let parent2 = population.as_slice()[j].clone();

        let mut brood = Vec::with_capacity(self.brood_size.max(1));
        for _ in 0..self.brood_size.max(1) {
            let mut child = if rng.gen_bool(self.p_crossover) {
                self.crossover.cross(rng, &parent1, &parent2)
            } else {
                parent1.clone()
            };
            if rng.gen_bool(self.p_mutation) {
                child = self.mutation.mutate(rng, child, self.max_length);
            }
            evaluate(&mut child);
            brood.push(child);
        }
        brood_best(brood, compare)
    }
}

impl<S, X, M> OffspringGenerator for BroodOffspringGenerator<S, X, M>
where
    S: SelectionOperator,
    X: CrossoverOperator,
    M: MutationOperator,
{
    fn generate(
        &self,
        rng: &mut impl RandomGenerator,
        population: &Population,
        compare: &dyn Comparator,
        evaluate: &mut dyn FnMut(&mut Individual),
    ) -> Option<Individual> {
        BroodOffspringGenerator::generate(self, rng, population, compare, evaluate)
    }
}

/// Like `BroodOffspringGenerator`, but draws a fresh parent pair for each
/// of the `brood_size` offspring rather than fixing one pair.
#[derive(Debug, Clone)]
pub struct PolygenicOffspringGenerator<S, X, M> {
    pub female_selector: S,
    pub male_selector: S,
    pub crossover: X,
    pub mutation: M,
    pub p_crossover: f64,
    pub p_mutation: f64,
    pub max_length: usize,
    pub brood_size: usize,
}

impl<S: std::fmt::Debug, X: std::fmt::Debug, M: std::fmt::Debug> GeneticOperator for PolygenicOffspringGenerator<S, X, M> {
    fn name(&self) -> String {
        "PolygenicOffspringGenerator".into()
    }
}

impl<S, X, M> PolygenicOffspringGenerator<S, X, M>
where
    S: SelectionOperator,
    X: CrossoverOperator,
    M: MutationOperator,
{
    pub fn generate(
        &self,
        rng: &mut impl RandomGenerator,
        population: &Population,
        compare: &dyn Comparator,
        evaluate: &mut dyn FnMut(&mut Individual),
    ) -> Option<Individual> {
        let mut brood = Vec::with_capacity(self.brood_size.max(1));
        for _ in 0..self.brood_size.max(1) {
            let (_, _, child) = recombine(
                rng,
                population,
                &self.female_selector,
                &self.male_selector,
                &self.crossover,
                &self.mutation,
                self.p_crossover,
                self.p_mutation,
                self.max_length,
                compare,
                evaluate,
            );
            if let Some(child) = child {
                brood.push(child);
            }
        }
        brood_best(brood, compare)
    }
}

impl<S, X, M> OffspringGenerator for PolygenicOffspringGenerator<S, X, M>
where
    S: SelectionOperator,
    X: CrossoverOperator,
    M: MutationOperator,
{
    fn generate(
        &self,
        rng: &mut impl RandomGenerator,
        population: &Population,
        compare: &dyn Comparator,
        evaluate: &mut dyn FnMut(&mut Individual),
    ) -> Option<Individual> {
        PolygenicOffspringGenerator::generate(self, rng, population, compare, evaluate)
    }
}
