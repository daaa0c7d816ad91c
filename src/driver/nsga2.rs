//! NSGA-II: the single-objective loop plus a non-dominated-sort pass that
//! assigns ranks and crowding distances after each generation, and an
//! environmental-selection reinsertion that keeps full fronts until the
//! next would overflow, splitting that front by crowding distance.

use std::time::{Duration, Instant};

use derive_builder::Builder;
use rayon::prelude::*;

use crate::dataset::Range;
use crate::evaluator::Evaluator;
use crate::individual::{Individual, Population};
use crate::interpreter::Interpreter;
use crate::local_search::LocalSearch;
use crate::nondominated::{assign_ranks, Fronts, NonDominatedSorter};
use crate::operators::creator::CreatorOperator;
use crate::operators::offspring::OffspringGenerator;
use crate::operators::selection::crowded_comparison;
use crate::random::{EngineRandomGenerator, RandomGenerator};

use super::context::AlgorithmContext;
use super::error::{AlgorithmError, InitializationError};

#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub generation: usize,
    pub first_front_size: usize,
    pub mean_length: f64,
    pub elapsed: Duration,
    pub residual_evaluations: usize,
    pub jacobian_evaluations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    AfterEvaluation,
    AfterOffspring,
}

/// Per-objective crowding distance (Deb et al. 2002): boundary points in
/// each objective get infinite distance; interior points accumulate the
/// normalized gap between their neighbors, summed across objectives.
fn crowding_distances(fitness: &[Vec<f64>]) -> Vec<f64> {
    let n = fitness.len();
    let mut distance = vec![0.0f64; n];
    if n == 0 {
        return distance;
    }
    let m = fitness[0].len();
    for obj in 0..m {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| fitness[a][obj].total_cmp(&fitness[b][obj]));
        distance[order[0]] = f64::INFINITY;
        distance[order[n - 1]] = f64::INFINITY;
        let lo = fitness[order[0]][obj];
        let hi = fitness[order[n - 1]][obj];
        let span = hi - lo;
        if span <= 0.0 || n < 3 {
            continue;
        }
        for k in 1..n - 1 {
            let prev = fitness[order[k - 1]][obj];
            let next = fitness[order[k + 1]][obj];
            distance[order[k]] += (next - prev) / span;
        }
    }
    distance
}

#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct Nsga2Algorithm<C, G, L, N>
where
    C: CreatorOperator,
    G: OffspringGenerator,
    L: LocalSearch,
    N: NonDominatedSorter,
{
    creator: C,
    offspring_generator: G,
    evaluator: Evaluator<L>,
    sorter: N,
    num_variables: usize,
    population_size: usize,
    pool_size: usize,
    num_generations: usize,
    max_length: usize,
    #[builder(default = "0.0")]
    exponent_bound: f64,
    #[builder(default = "1e-9")]
    eps: f64,
    #[builder(default = "None")]
    time_limit: Option<Duration>,
    #[builder(default = "EngineRandomGenerator::new_from_seed(None)")]
    rng: EngineRandomGenerator,
    #[builder(setter(skip), default = "None")]
    population: Option<Population>,
    #[builder(setter(skip), default = "0")]
    current_generation: usize,
    #[builder(setter(skip), default = "None")]
    started_at: Option<Instant>,
}

impl<C, G, L, N> Nsga2Algorithm<C, G, L, N>
where
    C: CreatorOperator,
    G: OffspringGenerator + Sync,
    L: LocalSearch + Sync,
    N: NonDominatedSorter,
{
    pub fn context(&self) -> AlgorithmContext {
        let mut ctx = AlgorithmContext::new(
            self.num_variables,
            self.population_size,
            self.pool_size,
            self.num_generations,
            self.max_length,
            self.exponent_bound,
        );
        ctx.set_current_generation(self.current_generation);
        ctx
    }

    pub fn population(&self) -> Option<&Population> {
        self.population.as_ref()
    }

    /// The non-dominated set of the current population (`rank == 0`).
    pub fn best(&self) -> Vec<&Individual> {
        self.population
            .as_ref()
            .map(|p| p.iter().filter(|i| i.rank() == 0).collect())
            .unwrap_or_default()
    }

    fn time_exceeded(&self) -> bool {
        match (self.time_limit, self.started_at) {
            (Some(limit), Some(start)) => start.elapsed() >= limit,
            _ => false,
        }
    }

    /// Non-dominated sort of `combined`, assigning rank and crowding
    /// distance (stored as `survival_score`) in place, then keeps the
    /// fittest `population_size` individuals, splitting the last front
    /// that would overflow by crowding distance.
    fn environmental_selection(&self, mut combined: Population) -> (Population, Fronts) {
        let fronts = assign_ranks(&mut combined, &self.sorter, self.eps);

        let mut distance_of = vec![0.0f64; combined.len()];
        for front in &fronts {
            let front_fitness: Vec<Vec<f64>> =
                front.iter().map(|&i| combined.as_slice()[i].fitness().to_vec()).collect();
            let distances = crowding_distances(&front_fitness);
            for (&idx, d) in front.iter().zip(distances) {
                distance_of[idx] = d;
            }
        }
        for (i, individual) in combined.iter_mut().enumerate() {
            individual.set_survival_score(distance_of[i]);
        }

        let mut survivors: Vec<usize> = Vec::with_capacity(self.population_size);
        for front in &fronts {
            if survivors.len() + front.len() <= self.population_size {
                survivors.extend(front.iter().copied());
            } else {
                let remaining = self.population_size - survivors.len();
                if remaining > 0 {
                    let mut ordered = front.clone();
                    ordered.sort_by(|&a, &b| distance_of[b].total_cmp(&distance_of[a]));
                    survivors.extend(ordered.into_iter().take(remaining));
                }
                break;
            }
        }
        (combined.selected(&survivors), fronts)
    }

    pub fn initialize(&mut self, interpreter: &Interpreter, target: &[f64], range: Range) -> Result<(), AlgorithmError> {
        if self.population_size == 0 {
            return Err(InitializationError::EmptyPopulation(0).into());
        }
        if self.pool_size == 0 {
            return Err(InitializationError::EmptyPool(0).into());
        }

        let mut creator_rngs: Vec<EngineRandomGenerator> =
            (0..self.population_size).map(|_| self.rng.spawn_child()).collect();
        let mut individuals: Vec<Individual> = creator_rngs
            .iter_mut()
            .enumerate()
            .map(|(i, rng)| {
                self.creator
                    .create(rng, self.max_length, self.exponent_bound, self.num_variables, i as u64)
            })
            .collect();

        let mut eval_rngs: Vec<EngineRandomGenerator> =
            (0..self.population_size).map(|_| self.rng.spawn_child()).collect();
        let evaluator = &self.evaluator;
        individuals
            .par_iter_mut()
            .zip(eval_rngs.par_iter_mut())
            .for_each(|(individual, rng)| {
                let mut fitness = evaluator
                    .evaluate(rng, interpreter, individual, target, range)
                    .unwrap_or_else(|_| vec![f64::MAX]);
                fitness.push(individual.length() as f64);
                individual.set_fitness(fitness);
            });

        let (population, _fronts) = self.environmental_selection(Population::new(individuals));
        self.population = Some(population);
        self.current_generation = 0;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    pub fn next(&mut self, interpreter: &Interpreter, target: &[f64], range: Range) -> Result<(), AlgorithmError> {
        let population = self
            .population
            .clone()
            .expect("initialize() must run before next()");

        let mut gen_rngs: Vec<EngineRandomGenerator> = (0..self.pool_size).map(|_| self.rng.spawn_child()).collect();
        let mut eval_rngs: Vec<EngineRandomGenerator> = (0..self.pool_size).map(|_| self.rng.spawn_child()).collect();

        let offspring_generator = &self.offspring_generator;
        let evaluator = &self.evaluator;
        let offspring: Vec<Individual> = gen_rngs
            .par_iter_mut()
            .zip(eval_rngs.par_iter_mut())
            .filter_map(|(gen_rng, eval_rng)| {
                let mut evaluate = |child: &mut Individual| {
                    let mut fitness = evaluator
                        .evaluate(eval_rng, interpreter, child, target, range)
                        .unwrap_or_else(|_| vec![f64::MAX]);
                    fitness.push(child.length() as f64);
                    child.set_fitness(fitness);
                };
                offspring_generator.generate(gen_rng, &population, &crowded_comparison, &mut evaluate)
            })
            .collect();

        if offspring.is_empty() {
            log::warn!("generation {} produced an empty offspring pool", self.current_generation);
            return Err(AlgorithmError::EmptyMatingResult);
        }

        let combined = population.merge(Population::new(offspring));
        let (survivors, _fronts) = self.environmental_selection(combined);
        self.population = Some(survivors);
        self.current_generation += 1;
        Ok(())
    }

    fn report(&self, elapsed: Duration) -> GenerationReport {
        let population = self.population.as_ref().expect("population initialized");
        GenerationReport {
            generation: self.current_generation,
            first_front_size: population.iter().filter(|i| i.rank() == 0).count(),
            mean_length: population.mean_length(),
            elapsed,
            residual_evaluations: self.evaluator.budget().residual_evaluations(),
            jacobian_evaluations: self.evaluator.budget().jacobian_evaluations(),
        }
    }

    pub fn run(
        &mut self,
        interpreter: &Interpreter,
        target: &[f64],
        range: Range,
        mut report: impl FnMut(ReportStage, &GenerationReport),
    ) -> Result<Population, AlgorithmError> {
        if self.population.is_none() {
            self.initialize(interpreter, target, range)?;
        }
        let run_start = Instant::now();
        report(ReportStage::AfterEvaluation, &self.report(run_start.elapsed()));

        loop {
            if self.current_generation >= self.num_generations {
                log::debug!("stopping: generation limit {} reached", self.num_generations);
                break;
            }
            if self.offspring_generator.terminate(self.evaluator.budget()) {
                log::debug!("stopping: generator reports termination");
                break;
            }
            if self.time_exceeded() {
                log::debug!("stopping: time limit elapsed");
                break;
            }

            let gen_start = Instant::now();
            match self.next(interpreter, target, range) {
                Ok(()) => {}
                Err(AlgorithmError::EmptyMatingResult) => break,
                Err(e) => return Err(e),
            }
            report(ReportStage::AfterOffspring, &self.report(gen_start.elapsed()));
        }

        Ok(self.population.clone().expect("population initialized"))
    }
}
