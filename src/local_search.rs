//! Coefficient refinement. The individual's structure (functions and
//! exponents) is held fixed; only `coefficient` is searched over, since the
//! model is linear in its coefficients given that structure.

use crate::dataset::Range;
use crate::individual::Individual;
use crate::interpreter::Interpreter;
use crate::random::RandomGenerator;
use faer::linalg::solvers::{PartialPivLu, Solve};
use faer::Mat;
use faer_ext::IntoFaer;
use ndarray::Array2;

/// Report from one `optimize` call.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationSummary {
    pub initial_cost: f64,
    pub final_cost: f64,
    pub iterations: usize,
    pub success: bool,
    pub final_parameters: Vec<f64>,
}

impl OptimizationSummary {
    fn new(initial_cost: f64, final_cost: f64, iterations: usize, final_parameters: Vec<f64>) -> Self {
        let success = final_cost.is_finite() && final_cost < initial_cost;
        OptimizationSummary {
            initial_cost,
            final_cost,
            iterations,
            success,
            final_parameters,
        }
    }
}

/// Pluggable coefficient optimizer.
pub trait LocalSearch {
    fn optimize(
        &self,
        rng: &mut impl RandomGenerator,
        interpreter: &Interpreter,
        individual: &Individual,
        target: &[f64],
        range: Range,
    ) -> OptimizationSummary;
}

fn residuals(interpreter: &Interpreter, individual: &Individual, coeff: &[f64], target: &[f64], range: Range) -> Vec<f64> {
    let pred = interpreter
        .evaluate(individual, coeff, range)
        .expect("range and coefficient shape already validated by the caller");
    pred.iter().zip(target).map(|(p, y)| p - y).collect()
}

fn sum_squared(residuals: &[f64]) -> f64 {
    0.5 * residuals.iter().map(|r| r * r).sum::<f64>()
}

/// Gauss-Newton / Levenberg-Marquardt: since `prediction` is linear in
/// `coefficient`, the Jacobian doesn't depend on the current coefficients,
/// so damped normal equations converge in very few iterations.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    pub max_iterations: usize,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    pub tolerance: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        LevenbergMarquardt {
            max_iterations: 20,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 10.0,
            tolerance: 1e-10,
        }
    }
}

impl LevenbergMarquardt {
    /// Solves `(JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr` and returns `δ`, building the
    /// normal equations via `faer`'s matrix product over the Jacobian
    /// bridged in from `ndarray` rather than hand-rolled accumulation loops.
    fn damped_step(jac: &Array2<f64>, res: &[f64], lambda: f64) -> Vec<f64> {
        let l = jac.ncols();
        let n = jac.nrows();
        let j = jac.view().into_faer();
        let r = Mat::<f64>::from_fn(n, 1, |row, _| res[row]);

        let mut jtj = j.transpose() * j;
        let jtr = j.transpose() * &r;
        for a in 0..l {
            jtj[(a, a)] += lambda * jtj[(a, a)].max(1e-12);
        }
        let neg_jtr = Mat::<f64>::from_fn(l, 1, |row, _| -jtr[(row, 0)]);

        let lu = PartialPivLu::new(jtj.as_ref());
        let delta = lu.solve(neg_jtr.as_ref());
        (0..l).map(|i| delta[(i, 0)]).collect()
    }
}

impl LocalSearch for LevenbergMarquardt {
    fn optimize(
        &self,
        _rng: &mut impl RandomGenerator,
        interpreter: &Interpreter,
        individual: &Individual,
        target: &[f64],
        range: Range,
    ) -> OptimizationSummary {
        let mut coeff = individual.get_coefficients();
        let res0 = residuals(interpreter, individual, &coeff, target, range);
        let initial_cost = sum_squared(&res0);
        let mut current_cost = initial_cost;
        let mut lambda = self.initial_lambda;
        let mut iterations = 0;

        for _ in 0..self.max_iterations {
            iterations += 1;
            let jac = interpreter
                .jac_rev(individual, &coeff, range)
                .expect("range and coefficient shape already validated");
            let res = residuals(interpreter, individual, &coeff, target, range);
            let delta = Self::damped_step(&jac, &res, lambda);
            let candidate: Vec<f64> = coeff.iter().zip(&delta).map(|(c, d)| c + d).collect();
            let candidate_res = residuals(interpreter, individual, &candidate, target, range);
            let candidate_cost = sum_squared(&candidate_res);

            if candidate_cost.is_finite() && candidate_cost < current_cost {
                let improvement = current_cost - candidate_cost;
                coeff = candidate;
                current_cost = candidate_cost;
                lambda /= self.lambda_down;
                if improvement < self.tolerance {
                    break;
                }
            } else {
                lambda *= self.lambda_up;
                if !lambda.is_finite() {
                    break;
                }
            }
        }

        OptimizationSummary::new(initial_cost, current_cost, iterations, coeff)
    }
}

/// Mini-batch stochastic gradient descent: each step draws a random
/// sub-range of rows, computes the gradient of the squared error on that
/// batch, and takes a fixed-size step.
#[derive(Debug, Clone)]
pub struct MiniBatchSgd {
    pub steps: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl Default for MiniBatchSgd {
    fn default() -> Self {
        MiniBatchSgd {
            steps: 200,
            batch_size: 16,
            learning_rate: 1e-2,
        }
    }
}

impl LocalSearch for MiniBatchSgd {
    fn optimize(
        &self,
        rng: &mut impl RandomGenerator,
        interpreter: &Interpreter,
        individual: &Individual,
        target: &[f64],
        range: Range,
    ) -> OptimizationSummary {
        let mut coeff = individual.get_coefficients();
        let res0 = residuals(interpreter, individual, &coeff, target, range);
        let initial_cost = sum_squared(&res0);
        let n_rows = range.size();
        let batch = self.batch_size.min(n_rows).max(1);
        let mut iterations = 0;

        for _ in 0..self.steps {
            iterations += 1;
            let start = if n_rows > batch {
                range.start() + rng.gen_range_usize(0, n_rows - batch + 1)
            } else {
                range.start()
            };
            let sub = Range::new(start, start + batch).expect("start + batch stays within range");
            let sub_target = &target[(start - range.start())..(start - range.start() + batch)];
            let jac = interpreter
                .jac_rev(individual, &coeff, sub)
                .expect("sub-range stays within dataset");
            let res = residuals(interpreter, individual, &coeff, sub_target, sub);

            let l = coeff.len();
            let mut grad = vec![0.0; l];
            for term in 0..l {
                let mut s = 0.0;
                for row in 0..batch {
                    s += jac[[row, term]] * res[row];
                }
                grad[term] = s / batch as f64;
            }
            for (c, g) in coeff.iter_mut().zip(&grad) {
                *c -= self.learning_rate * g;
            }
        }

        let final_res = residuals(interpreter, individual, &coeff, target, range);
        let final_cost = sum_squared(&final_res);
        OptimizationSummary::new(initial_cost, final_cost, iterations, coeff)
    }
}

/// Simulated annealing over the coefficient vector: perturbs every
/// coefficient by Gaussian noise scaled by the current temperature, accepts
/// improving moves unconditionally and worsening ones with probability
/// `exp(-Δcost / temperature)`, then cools geometrically.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealingSearch {
    pub epochs: usize,
    pub initial_temperature: f64,
    pub min_temperature: f64,
    pub cooling_rate: f64,
    pub perturbation_scale: f64,
}

impl Default for SimulatedAnnealingSearch {
    fn default() -> Self {
        SimulatedAnnealingSearch {
            epochs: 200,
            initial_temperature: 1.0,
            min_temperature: 1e-4,
            cooling_rate: 0.95,
            perturbation_scale: 0.1,
        }
    }
}

impl LocalSearch for SimulatedAnnealingSearch {
    fn optimize(
        &self,
        rng: &mut impl RandomGenerator,
        interpreter: &Interpreter,
        individual: &Individual,
        target: &[f64],
        range: Range,
    ) -> OptimizationSummary {
        let mut coeff = individual.get_coefficients();
        let res0 = residuals(interpreter, individual, &coeff, target, range);
        let initial_cost = sum_squared(&res0);
        let mut current_cost = initial_cost;
        let mut best = coeff.clone();
        let mut best_cost = initial_cost;
        let mut temperature = self.initial_temperature;
        let mut iterations = 0;

        for _ in 0..self.epochs {
            if temperature < self.min_temperature {
                break;
            }
            iterations += 1;
            let candidate: Vec<f64> = coeff
                .iter()
                .map(|c| {
                    let noise = (rng.gen_range_f64(-1.0, 1.0)) * self.perturbation_scale * temperature;
                    c + noise
                })
                .collect();
            let candidate_res = residuals(interpreter, individual, &candidate, target, range);
            let candidate_cost = sum_squared(&candidate_res);

            let accept = if candidate_cost.is_finite() && candidate_cost < current_cost {
                true
            } else if candidate_cost.is_finite() {
                let delta = candidate_cost - current_cost;
                let bypass_probability = (-delta / temperature).exp();
                rng.gen_bool(bypass_probability.min(1.0).max(0.0))
            } else {
                false
            };

            if accept {
                coeff = candidate;
                current_cost = candidate_cost;
                if current_cost < best_cost {
                    best_cost = current_cost;
                    best = coeff.clone();
                }
            }
            temperature *= self.cooling_rate;
        }

        OptimizationSummary::new(initial_cost, best_cost, iterations, best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchTable;
    use crate::function::FunctionKind;
    use crate::random::EngineRandomGenerator;
    use ndarray::array;

    fn linear_dataset() -> crate::dataset::Dataset {
        crate::dataset::Dataset::new(
            array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]],
            &["x"],
        )
    }

    #[test]
    fn levenberg_marquardt_recovers_linear_coefficient() {
        let dataset = linear_dataset();
        let dispatch = DispatchTable::new();
        let interpreter = Interpreter::new(&dataset, &dispatch);
        let individual = Individual::new(vec![0.1], vec![FunctionKind::Identity], vec![vec![1.0]], 0);
        let target: Vec<f64> = (1..=8).map(|x| 3.0 * x as f64).collect();
        let range = Range::new(0, 8).unwrap();
        let mut rng = EngineRandomGenerator::new_from_seed(Some(1));

        let summary = LevenbergMarquardt::default().optimize(&mut rng, &interpreter, &individual, &target, range);
        assert!(summary.success);
        assert!((summary.final_parameters[0] - 3.0).abs() < 1e-6, "{:?}", summary.final_parameters);
    }

    #[test]
    fn mini_batch_sgd_reduces_cost() {
        let dataset = linear_dataset();
        let dispatch = DispatchTable::new();
        let interpreter = Interpreter::new(&dataset, &dispatch);
        let individual = Individual::new(vec![0.1], vec![FunctionKind::Identity], vec![vec![1.0]], 0);
        let target: Vec<f64> = (1..=8).map(|x| 3.0 * x as f64).collect();
        let range = Range::new(0, 8).unwrap();
        let mut rng = EngineRandomGenerator::new_from_seed(Some(2));

        let search = MiniBatchSgd {
            steps: 500,
            batch_size: 4,
            learning_rate: 1e-3,
        };
        let summary = search.optimize(&mut rng, &interpreter, &individual, &target, range);
        assert!(summary.final_cost < summary.initial_cost);
    }

    #[test]
    fn simulated_annealing_never_reports_worse_than_initial() {
        let dataset = linear_dataset();
        let dispatch = DispatchTable::new();
        let interpreter = Interpreter::new(&dataset, &dispatch);
        let individual = Individual::new(vec![0.1], vec![FunctionKind::Identity], vec![vec![1.0]], 0);
        let target: Vec<f64> = (1..=8).map(|x| 3.0 * x as f64).collect();
        let range = Range::new(0, 8).unwrap();
        let mut rng = EngineRandomGenerator::new_from_seed(Some(3));

        let summary = SimulatedAnnealingSearch::default().optimize(&mut rng, &interpreter, &individual, &target, range);
        assert!(summary.final_cost <= summary.initial_cost);
    }

    #[test]
    fn success_flag_is_false_when_cost_does_not_improve() {
        let dataset = linear_dataset();
        let dispatch = DispatchTable::new();
        let interpreter = Interpreter::new(&dataset, &dispatch);
        let individual = Individual::new(vec![3.0], vec![FunctionKind::Identity], vec![vec![1.0]], 0);
        let target: Vec<f64> = (1..=8).map(|x| 3.0 * x as f64).collect();
        let range = Range::new(0, 8).unwrap();
        let mut rng = EngineRandomGenerator::new_from_seed(Some(4));

        let search = LevenbergMarquardt {
            max_iterations: 1,
            ..Default::default()
        };
        let summary = search.optimize(&mut rng, &interpreter, &individual, &target, range);
        assert_eq!(summary.initial_cost, 0.0);
        assert!(!summary.success);
    }
}
