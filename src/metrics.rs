//! Error metrics, each usable as a streaming accumulator (over paired
//! iterators, with an optional weight iterator) or a closed-form function
//! over full slices. Correlation-based scores are sign-inverted so every
//! metric here is always minimized.

/// Accumulates sum of squared error, sum of weights, and the running mean
/// of `y_true` — enough to derive SSE/MSE/NMSE/RMSE without buffering.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingAccumulator {
    sum_sq_error: f64,
    sum_abs_error: f64,
    sum_weight: f64,
    n: usize,
    mean_y: f64,
    sum_sq_y: f64,
}

impl StreamingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one `(prediction, target)` pair, unweighted.
    pub fn push(&mut self, prediction: f64, target: f64) {
        self.push_weighted(prediction, target, 1.0);
    }

    /// Fold one `(prediction, target, weight)` triple. Weights must be
    /// non-negative.
    pub fn push_weighted(&mut self, prediction: f64, target: f64, weight: f64) {
        let err = prediction - target;
        self.sum_sq_error += weight * err * err;
        self.sum_abs_error += weight * err.abs();
        self.sum_weight += weight;
        self.n += 1;
        let delta = target - self.mean_y;
        self.mean_y += if self.sum_weight > 0.0 {
            weight * delta / self.sum_weight
        } else {
            0.0
        };
        self.sum_sq_y += weight * delta * (target - self.mean_y);
    }

    /// Fold an entire paired stream.
    pub fn extend(
        &mut self,
        predictions: impl IntoIterator<Item = f64>,
        targets: impl IntoIterator<Item = f64>,
    ) {
        for (p, t) in predictions.into_iter().zip(targets) {
            self.push(p, t);
        }
    }

    pub fn sse(&self) -> f64 {
        if self.sum_weight <= 0.0 {
            return f64::NAN;
        }
        self.sum_sq_error
    }

    pub fn mse(&self) -> f64 {
        if self.sum_weight <= 0.0 {
            return f64::NAN;
        }
        self.sum_sq_error / self.sum_weight
    }

    pub fn mae(&self) -> f64 {
        if self.sum_weight <= 0.0 {
            return f64::NAN;
        }
        self.sum_abs_error / self.sum_weight
    }

    pub fn rmse(&self) -> f64 {
        self.mse().sqrt()
    }

    pub fn variance_y(&self) -> f64 {
        if self.sum_weight <= 0.0 {
            return f64::NAN;
        }
        self.sum_sq_y / self.sum_weight
    }

    pub fn nmse(&self) -> f64 {
        let var = self.variance_y();
        if var > 0.0 {
            self.mse() / var
        } else {
            0.0
        }
    }
}

fn weighted_mean(values: &[f64], weights: Option<&[f64]>) -> f64 {
    match weights {
        Some(w) => {
            let total: f64 = w.iter().sum();
            if total <= 0.0 {
                return f64::NAN;
            }
            values.iter().zip(w).map(|(v, wi)| v * wi).sum::<f64>() / total
        }
        None => values.iter().sum::<f64>() / values.len() as f64,
    }
}

/// Span-based sum of squared error.
pub fn sse(predictions: &[f64], targets: &[f64], weights: Option<&[f64]>) -> f64 {
    debug_assert_eq!(predictions.len(), targets.len());
    match weights {
        Some(w) => {
            let total: f64 = w.iter().sum();
            if total <= 0.0 {
                return f64::NAN;
            }
            predictions
                .iter()
                .zip(targets)
                .zip(w)
                .map(|((p, t), wi)| wi * (p - t).powi(2))
                .sum()
        }
        None => predictions.iter().zip(targets).map(|(p, t)| (p - t).powi(2)).sum(),
    }
}

/// Span-based mean squared error.
pub fn mse(predictions: &[f64], targets: &[f64], weights: Option<&[f64]>) -> f64 {
    let total_weight = weights.map(|w| w.iter().sum()).unwrap_or(predictions.len() as f64);
    if total_weight <= 0.0 {
        return f64::NAN;
    }
    sse(predictions, targets, weights) / total_weight
}

/// Span-based root mean squared error.
pub fn rmse(predictions: &[f64], targets: &[f64], weights: Option<&[f64]>) -> f64 {
    mse(predictions, targets, weights).sqrt()
}

/// Span-based mean absolute error.
pub fn mae(predictions: &[f64], targets: &[f64], weights: Option<&[f64]>) -> f64 {
    debug_assert_eq!(predictions.len(), targets.len());
    match weights {
        Some(w) => {
            let total: f64 = w.iter().sum();
            if total <= 0.0 {
                return f64::NAN;
            }
            predictions
                .iter()
                .zip(targets)
                .zip(w)
                .map(|((p, t), wi)| wi * (p - t).abs())
                .sum::<f64>()
                / total
        }
        None => {
            predictions.iter().zip(targets).map(|(p, t)| (p - t).abs()).sum::<f64>()
                / predictions.len() as f64
        }
    }
}

/// Span-based normalized mean squared error: `MSE / Var(targets)`, or 0
/// when the target has zero variance.
pub fn nmse(predictions: &[f64], targets: &[f64], weights: Option<&[f64]>) -> f64 {
    let mean = weighted_mean(targets, weights);
    let var = match weights {
        Some(w) => {
            let total: f64 = w.iter().sum();
            targets.iter().zip(w).map(|(t, wi)| wi * (t - mean).powi(2)).sum::<f64>() / total
        }
        None => targets.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / targets.len() as f64,
    };
    if var > 0.0 {
        mse(predictions, targets, weights) / var
    } else {
        0.0
    }
}

/// Span-based coefficient of determination. Returns `f64::MIN` when the
/// target has (numerically) zero variance, mirroring the source's
/// "undefined" sentinel rather than dividing by zero.
pub fn r2_score(predictions: &[f64], targets: &[f64], weights: Option<&[f64]>) -> f64 {
    let ssr = sse(predictions, targets, weights);
    let mean = weighted_mean(targets, weights);
    let sst = match weights {
        Some(w) => targets.iter().zip(w).map(|(t, wi)| wi * (t - mean).powi(2)).sum::<f64>(),
        None => targets.iter().map(|t| (t - mean).powi(2)).sum::<f64>(),
    };
    if sst < f64::EPSILON {
        return f64::MIN;
    }
    1.0 - ssr / sst
}

/// Pearson correlation coefficient between predictions and targets.
pub fn correlation_coefficient(predictions: &[f64], targets: &[f64], weights: Option<&[f64]>) -> f64 {
    let mean_p = weighted_mean(predictions, weights);
    let mean_t = weighted_mean(targets, weights);
    let (mut cov, mut var_p, mut var_t) = (0.0, 0.0, 0.0);
    let mut total_weight = 0.0;
    for i in 0..predictions.len() {
        let w = weights.map(|ws| ws[i]).unwrap_or(1.0);
        let dp = predictions[i] - mean_p;
        let dt = targets[i] - mean_t;
        cov += w * dp * dt;
        var_p += w * dp * dp;
        var_t += w * dt * dt;
        total_weight += w;
    }
    if total_weight <= 0.0 || var_p <= 0.0 || var_t <= 0.0 {
        return f64::NAN;
    }
    cov / (var_p.sqrt() * var_t.sqrt())
}

/// Squared correlation (`R²` of the linear fit, distinct from
/// `r2_score`'s residual-based definition), sign-inverted for
/// minimization per the spec's correlation-metric convention.
pub fn squared_correlation_minimizing(predictions: &[f64], targets: &[f64], weights: Option<&[f64]>) -> f64 {
    let r = correlation_coefficient(predictions, targets, weights);
    -(r * r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_fit_has_zero_error_and_r2_one() {
        let p = vec![1.0, 2.0, 3.0, 4.0];
        let t = vec![1.0, 2.0, 3.0, 4.0];
        assert!(mse(&p, &t, None).abs() < 1e-12);
        assert!((r2_score(&p, &t, None) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_total_weight_yields_nan() {
        let p = vec![1.0, 2.0];
        let t = vec![1.0, 2.0];
        let w = vec![0.0, 0.0];
        assert!(mse(&p, &t, Some(&w)).is_nan());
        assert!(mae(&p, &t, Some(&w)).is_nan());
    }

    #[test]
    fn nmse_zero_variance_target_is_zero() {
        let p = vec![5.0, 5.0, 5.0];
        let t = vec![5.0, 5.0, 5.0];
        assert_eq!(nmse(&p, &t, None), 0.0);
    }

    #[test]
    fn streaming_matches_span_based() {
        let p = vec![1.0, 2.2, 2.9, 4.3];
        let t = vec![1.1, 2.0, 3.0, 4.0];
        let mut acc = StreamingAccumulator::new();
        acc.extend(p.clone(), t.clone());
        assert!((acc.mse() - mse(&p, &t, None)).abs() < 1e-9);
        assert!((acc.mae() - mae(&p, &t, None)).abs() < 1e-9);
        assert!((acc.rmse() - rmse(&p, &t, None)).abs() < 1e-9);
    }

    #[test]
    fn squared_correlation_is_sign_inverted() {
        let p = vec![1.0, 2.0, 3.0, 4.0];
        let t = vec![2.0, 4.0, 6.0, 8.0];
        let s = squared_correlation_minimizing(&p, &t, None);
        assert!(s <= 0.0);
        assert!((s + 1.0).abs() < 1e-9);
    }
}
