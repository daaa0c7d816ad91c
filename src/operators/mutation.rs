//! Each mutation consumes an individual and returns a new one satisfying
//! all invariants; none of them raise. An operator that cannot satisfy its
//! invariants (typically at the length boundary) returns the input
//! unchanged (§4.H failure policy).

use super::creator::CreatorOperator;
use super::GeneticOperator;
use crate::function::FunctionCatalog;
use crate::individual::Individual;
use crate::random::RandomGenerator;
use rand_distr::{Distribution, Normal};

pub trait MutationOperator: GeneticOperator {
    fn mutate(&self, rng: &mut impl RandomGenerator, individual: Individual, max_length: usize) -> Individual;
}

/// Perturbs one randomly chosen coefficient by a `N(0, sigma)` sample.
#[derive(Debug, Clone)]
pub struct OnePointMutation {
    pub sigma: f64,
}

impl GeneticOperator for OnePointMutation {
    fn name(&self) -> String {
        "OnePointMutation".into()
    }
}

impl MutationOperator for OnePointMutation {
    fn mutate(&self, rng: &mut impl RandomGenerator, mut individual: Individual, _max_length: usize) -> Individual {
        if individual.length() == 0 {
            return individual;
        }
        let i = rng.gen_range_usize(0, individual.length());
        let normal = Normal::new(0.0, self.sigma).expect("sigma must be positive and finite");
        let mut coeff = individual.get_coefficients();
        coeff[i] += normal.sample(rng.rng());
        individual.set_coefficients(coeff).expect("length unchanged");
        individual
    }
}

/// Independently perturbs every coefficient by an `N(0, sigma)` sample.
#[derive(Debug, Clone)]
pub struct MultiPointMutation {
    pub sigma: f64,
}

impl GeneticOperator for MultiPointMutation {
    fn name(&self) -> String {
        "MultiPointMutation".into()
    }
}

impl MutationOperator for MultiPointMutation {
    fn mutate(&self, rng: &mut impl RandomGenerator, mut individual: Individual, _max_length: usize) -> Individual {
        let normal = Normal::new(0.0, self.sigma).expect("sigma must be positive and finite");
        let mut coeff = individual.get_coefficients();
        for c in coeff.iter_mut() {
            *c += normal.sample(rng.rng());
        }
        individual.set_coefficients(coeff).expect("length unchanged");
        individual
    }
}

/// Replaces one coefficient with a value drawn from a weighted finite set
/// (typically mathematical constants: 0, 1, π, e, …).
#[derive(Debug, Clone)]
pub struct DiscreteMutation {
    pub values: Vec<f64>,
    pub weights: Vec<f64>,
}

impl GeneticOperator for DiscreteMutation {
    fn name(&self) -> String {
        "DiscreteMutation".into()
    }
}

impl MutationOperator for DiscreteMutation {
    fn mutate(&self, rng: &mut impl RandomGenerator, mut individual: Individual, _max_length: usize) -> Individual {
        if individual.length() == 0 || self.values.is_empty() {
            return individual;
        }
        let i = rng.gen_range_usize(0, individual.length());
        let total: f64 = self.weights.iter().sum();
        let mut r = rng.gen_range_f64(0.0, total);
        let mut chosen = *self.values.last().unwrap();
        for (value, weight) in self.values.iter().zip(&self.weights) {
            if r < *weight {
                chosen = *value;
                break;
            }
            r -= weight;
        }
        let mut coeff = individual.get_coefficients();
        coeff[i] = chosen;
        individual.set_coefficients(coeff).expect("length unchanged");
        individual
    }
}

/// Replaces `function[i]` with a freshly sampled unary kind.
#[derive(Debug, Clone)]
pub struct ChangeFunctionMutation {
    catalog: FunctionCatalog,
}

impl ChangeFunctionMutation {
    pub fn new(catalog: FunctionCatalog) -> Self {
        ChangeFunctionMutation { catalog }
    }
}

impl GeneticOperator for ChangeFunctionMutation {
    fn name(&self) -> String {
        "ChangeFunctionMutation".into()
    }
}

impl MutationOperator for ChangeFunctionMutation {
    fn mutate(&self, rng: &mut impl RandomGenerator, mut individual: Individual, _max_length: usize) -> Individual {
        if individual.length() == 0 {
            return individual;
        }
        let i = rng.gen_range_usize(0, individual.length());
        match self.catalog.sample(rng.rng(), 1, 1) {
            Ok(kind) => {
                let (coeff, _, exponent) = individual.term(i);
                individual.set_term(i, coeff, kind, exponent.to_vec());
                individual
            }
            Err(_) => individual,
        }
    }
}

/// Prepends a freshly created block of `k ≤ MaxLength - L` new terms.
#[derive(Debug, Clone)]
pub struct InsertInteractionMutation<C> {
    creator: C,
    exponent_bound: f64,
}

impl<C: CreatorOperator> InsertInteractionMutation<C> {
    pub fn new(creator: C, exponent_bound: f64) -> Self {
        InsertInteractionMutation { creator, exponent_bound }
    }
}

impl<C: CreatorOperator + std::fmt::Debug> GeneticOperator for InsertInteractionMutation<C> {
    fn name(&self) -> String {
        "InsertInteractionMutation".into()
    }
}

impl<C: CreatorOperator + std::fmt::Debug> MutationOperator for InsertInteractionMutation<C> {
    fn mutate(&self, rng: &mut impl RandomGenerator, individual: Individual, max_length: usize) -> Individual {
        if individual.length() >= max_length {
            return individual;
        }
        let available = max_length - individual.length();
        let k = rng.gen_range_usize(1, available + 1);
        let variables = individual.exponents().first().map_or(0, |e| e.len());
        let block = self.creator.create(rng, k, self.exponent_bound, variables, individual.birth());

        let mut coefficient = block.get_coefficients();
        let mut function = block.functions().to_vec();
        let mut exponent = block.exponents().to_vec();
        coefficient.extend_from_slice(individual.coefficients());
        function.extend_from_slice(individual.functions());
        exponent.extend_from_slice(individual.exponents());
        Individual::new(coefficient, function, exponent, individual.birth())
    }
}

/// Deletes one term, never term 0; no-op when `L = 1`.
#[derive(Debug, Clone, Default)]
pub struct RemoveInteractionMutation;

impl GeneticOperator for RemoveInteractionMutation {
    fn name(&self) -> String {
        "RemoveInteractionMutation".into()
    }
}

impl MutationOperator for RemoveInteractionMutation {
    fn mutate(&self, rng: &mut impl RandomGenerator, mut individual: Individual, _max_length: usize) -> Individual {
        if individual.length() == 1 {
            return individual;
        }
        let index = rng.gen_range_usize(1, individual.length());
        individual.remove_term(index);
        individual
    }
}

/// Regenerates a suffix of terms from the creator, keeping `L` unchanged.
#[derive(Debug, Clone)]
pub struct ReplaceInteractionMutation<C> {
    creator: C,
    exponent_bound: f64,
}

impl<C: CreatorOperator> ReplaceInteractionMutation<C> {
    pub fn new(creator: C, exponent_bound: f64) -> Self {
        ReplaceInteractionMutation { creator, exponent_bound }
    }
}

impl<C: CreatorOperator + std::fmt::Debug> GeneticOperator for ReplaceInteractionMutation<C> {
    fn name(&self) -> String {
        "ReplaceInteractionMutation".into()
    }
}

impl<C: CreatorOperator + std::fmt::Debug> MutationOperator for ReplaceInteractionMutation<C> {
    fn mutate(&self, rng: &mut impl RandomGenerator, individual: Individual, _max_length: usize) -> Individual {
        let len = individual.length();
        if len == 0 {
            return individual;
        }
        let suffix_start = rng.gen_range_usize(0, len);
        let suffix_len = len - suffix_start;
        let variables = individual.exponents().first().map_or(0, |e| e.len());
        let fresh = self
            .creator
            .create(rng, suffix_len, self.exponent_bound, variables, individual.birth());

        let mut coefficient = individual.coefficients()[..suffix_start].to_vec();
        let mut function = individual.functions()[..suffix_start].to_vec();
        let mut exponent = individual.exponents()[..suffix_start].to_vec();
        coefficient.extend_from_slice(fresh.coefficients());
        function.extend_from_slice(fresh.functions());
        exponent.extend_from_slice(fresh.exponents());
        Individual::new(coefficient, function, exponent, individual.birth())
    }
}

/// Randomly permutes the `exponent` vectors across existing terms;
/// coefficients and functions are left in place.
#[derive(Debug, Clone, Default)]
pub struct ShuffleInteractionsMutation;

impl GeneticOperator for ShuffleInteractionsMutation {
    fn name(&self) -> String {
        "ShuffleInteractionsMutation".into()
    }
}

impl MutationOperator for ShuffleInteractionsMutation {
    fn mutate(&self, rng: &mut impl RandomGenerator, individual: Individual, _max_length: usize) -> Individual {
        let len = individual.length();
        if len < 2 {
            return individual;
        }
        let mut order: Vec<usize> = (0..len).collect();
        rng.shuffle_usize(&mut order);
        let exponent: Vec<Vec<f64>> = order.iter().map(|&i| individual.exponents()[i].clone()).collect();
        Individual::new(
            individual.coefficients().to_vec(),
            individual.functions().to_vec(),
            exponent,
            individual.birth(),
        )
    }
}

/// The closed set of mutation kinds `MultiMutation` can draw from. Kept as
/// an enum rather than `Box<dyn MutationOperator>` since
/// `MutationOperator::mutate` is generic over the RNG type and so isn't
/// object-safe.
#[derive(Debug, Clone)]
pub enum AnyMutation<C: Clone> {
    OnePoint(OnePointMutation),
    MultiPoint(MultiPointMutation),
    Discrete(DiscreteMutation),
    ChangeFunction(ChangeFunctionMutation),
    InsertInteraction(InsertInteractionMutation<C>),
    RemoveInteraction(RemoveInteractionMutation),
    ReplaceInteraction(ReplaceInteractionMutation<C>),
    ShuffleInteractions(ShuffleInteractionsMutation),
}

impl<C: CreatorOperator + Clone + std::fmt::Debug> AnyMutation<C> {
    fn apply(&self, rng: &mut impl RandomGenerator, individual: Individual, max_length: usize) -> Individual {
        match self {
            AnyMutation::OnePoint(op) => op.mutate(rng, individual, max_length),
            AnyMutation::MultiPoint(op) => op.mutate(rng, individual, max_length),
            AnyMutation::Discrete(op) => op.mutate(rng, individual, max_length),
            AnyMutation::ChangeFunction(op) => op.mutate(rng, individual, max_length),
            AnyMutation::InsertInteraction(op) => op.mutate(rng, individual, max_length),
            AnyMutation::RemoveInteraction(op) => op.mutate(rng, individual, max_length),
            AnyMutation::ReplaceInteraction(op) => op.mutate(rng, individual, max_length),
            AnyMutation::ShuffleInteractions(op) => op.mutate(rng, individual, max_length),
        }
    }
}

/// Weighted mixture of child mutations: draws one operator per invocation
/// with probability proportional to its assigned weight.
#[derive(Debug, Clone)]
pub struct MultiMutation<C: Clone> {
    operators: Vec<(AnyMutation<C>, f64)>,
}

impl<C: CreatorOperator + Clone + std::fmt::Debug> MultiMutation<C> {
    pub fn new(operators: Vec<(AnyMutation<C>, f64)>) -> Self {
        MultiMutation { operators }
    }
}

impl<C: CreatorOperator + Clone + std::fmt::Debug> GeneticOperator for MultiMutation<C> {
    fn name(&self) -> String {
        "MultiMutation".into()
    }
}

impl<C: CreatorOperator + Clone + std::fmt::Debug> MutationOperator for MultiMutation<C> {
    fn mutate(&self, rng: &mut impl RandomGenerator, individual: Individual, max_length: usize) -> Individual {
        if self.operators.is_empty() {
            return individual;
        }
        let total: f64 = self.operators.iter().map(|(_, w)| w).sum();
        let mut r = rng.gen_range_f64(0.0, total);
        for (op, weight) in &self.operators {
            if r < *weight {
                return op.apply(rng, individual, max_length);
            }
            r -= weight;
        }
        self.operators.last().unwrap().0.apply(rng, individual, max_length)
    }
}
