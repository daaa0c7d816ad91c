//! Scores an individual against a dataset: optional local search, predict,
//! optional linear scaling, then the configured error metric. Also exposes
//! BIC/AIC and a multi-evaluator aggregate, all sharing the same budget
//! accounting.

use crate::dataset::Range;
use crate::individual::Individual;
use crate::interpreter::Interpreter;
use crate::local_search::LocalSearch;
use crate::metrics;
use crate::random::RandomGenerator;
use derive_builder::Builder;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Sentinel fitness for non-finite metric results, mirroring
/// `std::numeric_limits<Scalar>::max()`.
pub const ERR_MAX: f64 = f64::MAX;

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluation budget of {budget} residual+Jacobian evaluations exhausted")]
    BudgetExhausted { budget: usize },
}

/// Which closed-form error function `Evaluator` scores predictions against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMetric {
    Sse,
    Mse,
    Rmse,
    Mae,
    Nmse,
    R2,
    SquaredCorrelation,
}

impl ErrorMetric {
    fn compute(self, predictions: &[f64], targets: &[f64]) -> f64 {
        match self {
            ErrorMetric::Sse => metrics::sse(predictions, targets, None),
            ErrorMetric::Mse => metrics::mse(predictions, targets, None),
            ErrorMetric::Rmse => metrics::rmse(predictions, targets, None),
            ErrorMetric::Mae => metrics::mae(predictions, targets, None),
            ErrorMetric::Nmse => metrics::nmse(predictions, targets, None),
            ErrorMetric::R2 => -metrics::r2_score(predictions, targets, None),
            ErrorMetric::SquaredCorrelation => metrics::squared_correlation_minimizing(predictions, targets, None),
        }
    }
}

/// Ordinary-least-squares fit of `target ≈ a·prediction + b`; falls back to
/// `a = 1, b = 0` if the predictions have zero variance.
fn fit_linear_scale(predictions: &[f64], targets: &[f64]) -> (f64, f64) {
    let n = predictions.len() as f64;
    if n == 0.0 {
        return (1.0, 0.0);
    }
    let mean_p = predictions.iter().sum::<f64>() / n;
    let mean_t = targets.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_p = 0.0;
    for (&p, &t) in predictions.iter().zip(targets) {
        cov += (p - mean_p) * (t - mean_t);
        var_p += (p - mean_p) * (p - mean_p);
    }
    let a = if var_p > 0.0 { cov / var_p } else { 1.0 };
    let a = if a.is_finite() { a } else { 1.0 };
    let b = mean_t - a * mean_p;
    (a, b)
}

/// Monotonic counters an evaluator accumulates across calls, used for
/// budget accounting. Atomic rather than merely interior-mutable so a
/// single evaluator can be shared read-only across worker threads while
/// `evaluate` still takes `&self`.
#[derive(Debug, Default)]
pub struct EvaluationBudget {
    residual_evaluations: AtomicUsize,
    jacobian_evaluations: AtomicUsize,
    call_count: AtomicUsize,
    cost_function_nanos: AtomicU64,
    budget: Option<usize>,
}

impl EvaluationBudget {
    pub fn new(budget: Option<usize>) -> Self {
        EvaluationBudget {
            budget,
            ..Default::default()
        }
    }

    pub fn residual_evaluations(&self) -> usize {
        self.residual_evaluations.load(Ordering::Relaxed)
    }

    pub fn jacobian_evaluations(&self) -> usize {
        self.jacobian_evaluations.load(Ordering::Relaxed)
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn cost_function_time(&self) -> Duration {
        Duration::from_nanos(self.cost_function_nanos.load(Ordering::Relaxed))
    }

    pub fn budget_exhausted(&self) -> bool {
        match self.budget {
            Some(b) => self.residual_evaluations() + self.jacobian_evaluations() >= b,
            None => false,
        }
    }

    fn record_call(&self) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_residual(&self) {
        self.residual_evaluations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_jacobian(&self, n: usize) {
        self.jacobian_evaluations.fetch_add(n, Ordering::Relaxed);
    }

    fn record_time(&self, elapsed: Duration) {
        self.cost_function_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }
}

/// Scores one individual: optional Lamarckian local search, prediction,
/// optional linear scaling, and a configured error metric, substituting
/// [`ERR_MAX`] when the metric is non-finite.
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct Evaluator<L: LocalSearch> {
    #[builder(default = "ErrorMetric::Nmse")]
    metric: ErrorMetric,
    #[builder(default = "true")]
    linear_scaling: bool,
    #[builder(default = "None")]
    local_search: Option<L>,
    #[builder(default = "1.0")]
    lamarckian_probability: f64,
    #[builder(setter(skip), default = "EvaluationBudget::new(None)")]
    budget: EvaluationBudget,
}

impl<L: LocalSearch> Evaluator<L> {
    pub fn budget(&self) -> &EvaluationBudget {
        &self.budget
    }

    /// Replaces the budget cap, discarding any counters accumulated so
    /// far. Builder fields can't express the `Option<usize>` default cap
    /// cleanly alongside the atomics, so this is the one post-build knob.
    pub fn with_budget(mut self, budget: Option<usize>) -> Self {
        self.budget = EvaluationBudget::new(budget);
        self
    }

    /// Runs the pipeline for one individual over the training `range`
    /// against `target`, returning a one-element fitness vector.
    ///
    /// `interpreter` is borrowed rather than owned so the same evaluator
    /// (and its accumulated budget) can be reused across calls that
    /// target different datasets, or across worker threads sharing one
    /// read-only interpreter.
    pub fn evaluate(
        &self,
        rng: &mut impl RandomGenerator,
        interpreter: &Interpreter,
        individual: &mut Individual,
        target: &[f64],
        range: Range,
    ) -> Result<Vec<f64>, EvaluatorError> {
        if self.budget.budget_exhausted() {
            return Err(EvaluatorError::BudgetExhausted {
                budget: self.budget.budget.unwrap_or(0),
            });
        }
        self.budget.record_call();

        if let Some(search) = &self.local_search {
            let started = std::time::Instant::now();
            let summary = search.optimize(rng, interpreter, individual, target, range);
            self.budget.record_residual();
            self.budget.record_jacobian(individual.length());
            self.budget.record_time(started.elapsed());
            if summary.success && rng.gen_bool(self.lamarckian_probability) {
                individual
                    .set_coefficients(summary.final_parameters)
                    .expect("local search preserves coefficient length");
            }
        }

        self.budget.record_residual();
        let mut predictions = interpreter
            .evaluate(individual, individual.get_coefficients().as_slice(), range)
            .expect("range and coefficient shape already validated by callers");

        if self.linear_scaling {
            let (a, b) = fit_linear_scale(&predictions, target);
            for p in predictions.iter_mut() {
                *p = a * *p + b;
            }
        }

        let metric_value = self.metric.compute(&predictions, target);
        let fit = if metric_value.is_finite() { metric_value } else { ERR_MAX };
        Ok(vec![fit])
    }
}

/// How an [`AggregateEvaluator`] reduces several metric values into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Min,
    Max,
    Median,
    Mean,
    HarmonicMean,
    Sum,
}

/// Reduces several error metrics computed against the same predictions into
/// a single scalar fitness, per the configured [`AggregateKind`].
#[derive(Debug, Clone)]
pub struct AggregateEvaluator {
    pub metrics: Vec<ErrorMetric>,
    pub kind: AggregateKind,
}

impl AggregateEvaluator {
    pub fn aggregate(&self, predictions: &[f64], targets: &[f64]) -> f64 {
        let mut values: Vec<f64> = self.metrics.iter().map(|m| m.compute(predictions, targets)).collect();
        if values.is_empty() {
            return ERR_MAX;
        }
        let fit = match self.kind {
            AggregateKind::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            AggregateKind::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            AggregateKind::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
            AggregateKind::Mean => values.iter().sum::<f64>() / values.len() as f64,
            AggregateKind::HarmonicMean => {
                let sum_recip: f64 = values.iter().map(|v| 1.0 / v).sum();
                values.len() as f64 / sum_recip
            }
            AggregateKind::Sum => values.iter().sum(),
        };
        if fit.is_finite() {
            fit
        } else {
            ERR_MAX
        }
    }
}

/// Bayesian information criterion: `n·ln(mse) + p·ln(n)`, where `p` is the
/// individual's term count (one parameter per coefficient).
pub fn bayesian_information_criterion(mse: f64, n: usize, p: usize) -> f64 {
    let n = n as f64;
    let p = p as f64;
    let bic = n * mse.ln() + p * n.ln();
    if bic.is_finite() {
        bic
    } else {
        ERR_MAX
    }
}

/// Akaike information criterion: `n/2·(ln(2π) + ln(mse) + 1)`.
pub fn akaike_information_criterion(mse: f64, n: usize) -> f64 {
    let n = n as f64;
    let aic = n / 2.0 * (std::f64::consts::TAU.ln() + mse.ln() + 1.0);
    if aic.is_finite() {
        aic
    } else {
        ERR_MAX
    }
}
