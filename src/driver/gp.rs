//! Single-objective generational loop: creator-initialized parents are
//! evaluated, then each generation spends a worker pool producing
//! `pool_size` offspring that get reinserted into the parent population,
//! until a termination condition fires.

use std::time::{Duration, Instant};

use derive_builder::Builder;
use rayon::prelude::*;

use crate::dataset::Range;
use crate::evaluator::Evaluator;
use crate::individual::{Individual, Population};
use crate::interpreter::Interpreter;
use crate::local_search::LocalSearch;
use crate::operators::creator::CreatorOperator;
use crate::operators::offspring::OffspringGenerator;
use crate::operators::reinsertion::Reinserter;
use crate::operators::selection::single_objective_minimize;
use crate::random::{EngineRandomGenerator, RandomGenerator};

use super::context::AlgorithmContext;
use super::error::{AlgorithmError, InitializationError};

/// Per-generation snapshot handed to the reporting callback.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub generation: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub mean_length: f64,
    pub elapsed: Duration,
    pub residual_evaluations: usize,
    pub jacobian_evaluations: usize,
}

/// Marks which half of a generation just finished, for the two-callback
/// reporting contract (once after evaluation, once after offspring
/// generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    AfterEvaluation,
    AfterOffspring,
}

#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct GeneticProgrammingAlgorithm<C, G, R, L>
where
    C: CreatorOperator,
    G: OffspringGenerator,
    R: Reinserter,
    L: LocalSearch,
{
    creator: C,
    offspring_generator: G,
    reinserter: R,
    evaluator: Evaluator<L>,
    num_variables: usize,
    population_size: usize,
    pool_size: usize,
    num_generations: usize,
    max_length: usize,
    #[builder(default = "0.0")]
    exponent_bound: f64,
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

impl<C, G, R, L> GeneticProgrammingAlgorithm<C, G, R, L>
where
    C: CreatorOperator,
    G: OffspringGenerator + Sync,
    R: Reinserter,
    L: LocalSearch + Sync,
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

    pub fn best(&self) -> Option<&Individual> {
        self.population.as_ref().and_then(Population::best)
    }

    fn time_exceeded(&self) -> bool {
        match (self.time_limit, self.started_at) {
            (Some(limit), Some(start)) => start.elapsed() >= limit,
            _ => false,
        }
    }

    /// Samples `population_size` fresh individuals and scores them,
    /// seeding the run.
    pub fn initialize(
        &mut self,
        interpreter: &Interpreter,
        target: &[f64],
        range: Range,
    ) -> Result<(), AlgorithmError> {
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
                let fitness = evaluator
                    .evaluate(rng, interpreter, individual, target, range)
                    .unwrap_or_else(|_| vec![f64::MAX]);
                individual.set_fitness(fitness);
            });

        self.population = Some(Population::new(individuals));
        self.current_generation = 0;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    /// Runs one generation: produce `pool_size` offspring in parallel,
    /// reinsert into the parent population, and advance the counter.
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
                    let fitness = evaluator
                        .evaluate(eval_rng, interpreter, child, target, range)
                        .unwrap_or_else(|_| vec![f64::MAX]);
                    child.set_fitness(fitness);
                };
                offspring_generator.generate(gen_rng, &population, &single_objective_minimize, &mut evaluate)
            })
            .collect();

        if offspring.is_empty() {
            log::warn!("generation {} produced an empty offspring pool", self.current_generation);
            return Err(AlgorithmError::EmptyMatingResult);
        }

        let pool = Population::new(offspring);
        self.population = Some(
            self.reinserter
                .reinsert(population, pool, &single_objective_minimize),
        );
        self.current_generation += 1;
        Ok(())
    }

    fn report(&self, elapsed: Duration) -> GenerationReport {
        let population = self.population.as_ref().expect("population initialized");
        GenerationReport {
            generation: self.current_generation,
            best_fitness: population.best().map(|i| i.fitness()[0]).unwrap_or(f64::MAX),
            mean_fitness: population.mean_fitness(0),
            mean_length: population.mean_length(),
            elapsed,
            residual_evaluations: self.evaluator.budget().residual_evaluations(),
            jacobian_evaluations: self.evaluator.budget().jacobian_evaluations(),
        }
    }

    /// Initializes (if not already) and iterates generations until the
    /// generation limit, evaluator budget, configured time limit, or an
    /// empty mating pool stops the run. Invokes `report` once after the
    /// initial evaluation and once per completed generation.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::dispatch::DispatchTable;
    use crate::evaluator::{ErrorMetric, EvaluatorBuilder};
    use crate::function::FunctionCatalog;
    use crate::local_search::LevenbergMarquardt;
    use crate::operators::creator::BalancedCreator;
    use crate::operators::crossover::IndividualCrossover;
    use crate::operators::mutation::OnePointMutation;
    use crate::operators::offspring::BasicOffspringGenerator;
    use crate::operators::reinsertion::KeepBestReinserter;
    use crate::operators::selection::TournamentSelector;
    use ndarray::Array2;

    fn make_dataset() -> Dataset {
        let values: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        let arr = Array2::from_shape_vec((20, 1), values).unwrap();
        Dataset::new(arr, &["x"])
    }

    fn make_algorithm() -> GeneticProgrammingAlgorithm<
        BalancedCreator,
        BasicOffspringGenerator<TournamentSelector, IndividualCrossover, OnePointMutation>,
        KeepBestReinserter,
        LevenbergMarquardt,
    > {
        let evaluator = EvaluatorBuilder::default()
            .metric(ErrorMetric::Mse)
            .linear_scaling(true)
            .build()
            .unwrap();
        GeneticProgrammingAlgorithmBuilder::default()
            .creator(BalancedCreator::new(FunctionCatalog::arithmetic()))
            .offspring_generator(BasicOffspringGenerator {
                female_selector: TournamentSelector { tournament_size: 3 },
                male_selector: TournamentSelector { tournament_size: 3 },
                crossover: IndividualCrossover::new(0.5, 4),
                mutation: OnePointMutation { sigma: 0.2 },
                p_crossover: 0.9,
                p_mutation: 0.3,
                max_length: 4,
            })
            .reinserter(KeepBestReinserter)
            .evaluator(evaluator)
            .num_variables(1)
            .population_size(10)
            .pool_size(10)
            .num_generations(5)
            .max_length(4)
            .rng(EngineRandomGenerator::new_from_seed(Some(11)))
            .build()
            .unwrap()
    }

    #[test]
    fn initialize_fills_population_with_finite_fitness() {
        let dataset = make_dataset();
        let dispatch = DispatchTable::new();
        let interpreter = Interpreter::new(&dataset, &dispatch);
        let target: Vec<f64> = (1..=20).map(|v| 2.0 * v as f64).collect();
        let range = Range::new(0, 20).unwrap();

        let mut algorithm = make_algorithm();
        algorithm.initialize(&interpreter, &target, range).unwrap();
        let population = algorithm.population().unwrap();
        assert_eq!(population.len(), 10);
        assert!(population.iter().all(|i| i.fitness()[0].is_finite()));
    }

    #[test]
    fn run_improves_or_holds_best_fitness_over_generations() {
        let dataset = make_dataset();
        let dispatch = DispatchTable::new();
        let interpreter = Interpreter::new(&dataset, &dispatch);
        let target: Vec<f64> = (1..=20).map(|v| 2.0 * v as f64).collect();
        let range = Range::new(0, 20).unwrap();

        let mut algorithm = make_algorithm();
        let mut first_best = None;
        let mut last_best = None;
        algorithm
            .run(&interpreter, &target, range, |stage, report| match stage {
                ReportStage::AfterEvaluation => first_best = Some(report.best_fitness),
                ReportStage::AfterOffspring => last_best = Some(report.best_fitness),
            })
            .unwrap();

        assert!(first_best.is_some());
        let last = last_best.unwrap_or_else(|| first_best.unwrap());
        assert!(last <= first_best.unwrap() + 1e-9);
    }
}
