//! Evaluates an individual over a row range, in batches, and differentiates
//! it either in reverse mode (one pass, all coefficients) or forward mode
//! (one pass per coefficient).

use crate::dataset::{Dataset, Range, RangeError};
use crate::dispatch::DispatchTable;
use crate::individual::{Individual, ShapeError};
use ndarray::Array2;

/// Default batch size: `512 / size_of::<f64>()`.
pub const DEFAULT_BATCH_SIZE: usize = 512 / std::mem::size_of::<f64>();

#[derive(Debug, thiserror::Error)]
pub enum InterpreterError {
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Evaluates individuals against a dataset's columns, processing row
/// ranges in fixed-size batches.
pub struct Interpreter<'a> {
    dataset: &'a Dataset,
    dispatch: &'a DispatchTable,
    batch_size: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(dataset: &'a Dataset, dispatch: &'a DispatchTable) -> Self {
        Interpreter {
            dataset,
            dispatch,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn check_coefficients(&self, individual: &Individual, coeff: &[f64]) -> Result<(), ShapeError> {
        if coeff.len() != individual.length() {
            return Err(ShapeError::CoefficientLengthMismatch {
                expected: individual.length(),
                got: coeff.len(),
            });
        }
        Ok(())
    }

    fn check_range(&self, range: Range) -> Result<(), RangeError> {
        if range.end() > self.dataset.rows() {
            return Err(RangeError::RangeExceedsDataset {
                start: range.start(),
                end: range.end(),
                rows: self.dataset.rows(),
            });
        }
        Ok(())
    }

    /// Monomial Πⱼ xⱼ^{exponent[i][j]} for term `i`, for each row in the
    /// batch `[batch_start, batch_start+n)`.
    fn monomial_batch(&self, individual: &Individual, term: usize, batch_start: usize, n: usize) -> Vec<f64> {
        let exponent = &individual.exponents()[term];
        let mut out = vec![1.0f64; n];
        for (var_idx, &exp) in exponent.iter().enumerate() {
            if exp == 0.0 {
                continue;
            }
            let variable = &self.dataset.variables()[var_idx];
            let col = self
                .dataset
                .values(variable)
                .expect("variable index within dataset bounds");
            for (row_offset, out_val) in out.iter_mut().enumerate() {
                let x = col[batch_start + row_offset];
                *out_val *= if exp == 1.0 { x } else { x.powf(exp) };
            }
        }
        out
    }

    /// `evaluate(coeff, range) -> predictions[range.size()]`.
    pub fn evaluate(
        &self,
        individual: &Individual,
        coeff: &[f64],
        range: Range,
    ) -> Result<Vec<f64>, InterpreterError> {
        self.check_coefficients(individual, coeff)?;
        self.check_range(range)?;
        let n_rows = range.size();
        let l = individual.length();
        let mut predictions = vec![0.0f64; n_rows];

        let mut batch_start = range.start();
        while batch_start < range.end() {
            let n = self.batch_size.min(range.end() - batch_start);
            let mut primal = Array2::<f64>::zeros((n, l));
            for term in 0..l {
                let monomial = self.monomial_batch(individual, term, batch_start, n);
                let kernel = self
                    .dispatch
                    .try_get_function(individual.functions()[term])
                    .expect("catalog-sampled function kind must have a primal kernel");
                for row in 0..n {
                    let wrapped = kernel(&[monomial[row]]);
                    primal[[row, term]] = coeff[term] * wrapped;
                }
            }
            let out_offset = batch_start - range.start();
            for row in 0..n {
                predictions[out_offset + row] = pairwise_sum(primal.row(row).as_slice().unwrap());
            }
            batch_start += n;
        }
        Ok(predictions)
    }

    /// Reverse-mode Jacobian: one pass produces all `|coeff|` columns.
    /// `∂prediction/∂coefficient[i] = function[i](monomial_i)` since the
    /// coefficient scales the term linearly and terms don't interact.
    pub fn jac_rev(
        &self,
        individual: &Individual,
        coeff: &[f64],
        range: Range,
    ) -> Result<Array2<f64>, InterpreterError> {
        self.check_coefficients(individual, coeff)?;
        self.check_range(range)?;
        let n_rows = range.size();
        let l = individual.length();
        let mut jac = Array2::<f64>::zeros((n_rows, l));

        let mut batch_start = range.start();
        while batch_start < range.end() {
            let n = self.batch_size.min(range.end() - batch_start);
            let out_offset = batch_start - range.start();
            for term in 0..l {
                let monomial = self.monomial_batch(individual, term, batch_start, n);
                let kernel = self
                    .dispatch
                    .try_get_function(individual.functions()[term])
                    .expect("catalog-sampled function kind must have a primal kernel");
                for row in 0..n {
                    jac[[out_offset + row, term]] = kernel(&[monomial[row]]);
                }
            }
            batch_start += n;
        }
        Ok(jac)
    }

    /// Forward-mode Jacobian: one pass per coefficient, accumulating into
    /// the column of the output Jacobian. Produces the same matrix as
    /// `jac_rev` by construction (terms don't interact), provided as the
    /// alternate traversal order named in the spec.
    pub fn jac_fwd(
        &self,
        individual: &Individual,
        coeff: &[f64],
        range: Range,
    ) -> Result<Array2<f64>, InterpreterError> {
        self.check_coefficients(individual, coeff)?;
        self.check_range(range)?;
        let n_rows = range.size();
        let l = individual.length();
        let mut jac = Array2::<f64>::zeros((n_rows, l));

        for term in 0..l {
            let mut batch_start = range.start();
            while batch_start < range.end() {
                let n = self.batch_size.min(range.end() - batch_start);
                let out_offset = batch_start - range.start();
                let monomial = self.monomial_batch(individual, term, batch_start, n);
                let kernel = self
                    .dispatch
                    .try_get_function(individual.functions()[term])
                    .expect("catalog-sampled function kind must have a primal kernel");
                for row in 0..n {
                    jac[[out_offset + row, term]] = kernel(&[monomial[row]]);
                }
                batch_start += n;
            }
        }
        Ok(jac)
    }
}

/// Pairwise summation to keep rounding error bounded for wide term counts.
fn pairwise_sum(values: &[f64]) -> f64 {
    match values.len() {
        0 => 0.0,
        1 => values[0],
        2 => values[0] + values[1],
        n => {
            let mid = n / 2;
            pairwise_sum(&values[..mid]) + pairwise_sum(&values[mid..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionKind;
    use ndarray::array;

    fn exp_cos_dataset() -> Dataset {
        // single row: (rho, v) = (0.95, 3.75)
        Dataset::new(array![[0.95, 3.75]], &["rho", "v"])
    }

    #[test]
    fn scenario_exact_individual_evaluation() {
        let dataset = exp_cos_dataset();
        let dispatch = DispatchTable::new();
        let interpreter = Interpreter::new(&dataset, &dispatch);
        let individual = Individual::new(
            vec![17.37, 12.43],
            vec![FunctionKind::Exp, FunctionKind::Cos],
            vec![vec![3.0, 0.0], vec![2.0, 1.0]],
            0,
        );
        let coeff = individual.get_coefficients();
        let range = Range::new(0, 1).unwrap();
        let pred = interpreter.evaluate(&individual, &coeff, range).unwrap();
        assert!((pred[0] - 40.938).abs() < 1e-3, "got {}", pred[0]);
    }

    #[test]
    fn jac_rev_and_jac_fwd_agree() {
        let dataset = Dataset::new(array![[1.0, 2.0], [2.0, 3.0], [3.0, 1.0]], &["a", "b"]);
        let dispatch = DispatchTable::new();
        let interpreter = Interpreter::new(&dataset, &dispatch);
        let individual = Individual::new(
            vec![1.5, -2.0],
            vec![FunctionKind::Sin, FunctionKind::Square],
            vec![vec![1.0, 0.0], vec![0.0, 2.0]],
            0,
        );
        let coeff = individual.get_coefficients();
        let range = Range::new(0, 3).unwrap();
        let rev = interpreter.jac_rev(&individual, &coeff, range).unwrap();
        let fwd = interpreter.jac_fwd(&individual, &coeff, range).unwrap();
        for r in 0..3 {
            for c in 0..2 {
                assert!((rev[[r, c]] - fwd[[r, c]]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn evaluate_rejects_range_past_dataset() {
        let dataset = exp_cos_dataset();
        let dispatch = DispatchTable::new();
        let interpreter = Interpreter::new(&dataset, &dispatch);
        let individual = Individual::new(vec![1.0], vec![FunctionKind::Identity], vec![vec![1.0, 0.0]], 0);
        let coeff = individual.get_coefficients();
        let range = Range::new(0, 5).unwrap();
        let err = interpreter.evaluate(&individual, &coeff, range).unwrap_err();
        assert!(matches!(err, InterpreterError::Range(_)));
    }

    #[test]
    fn evaluate_rejects_coefficient_shape_mismatch() {
        let dataset = exp_cos_dataset();
        let dispatch = DispatchTable::new();
        let interpreter = Interpreter::new(&dataset, &dispatch);
        let individual = Individual::new(vec![1.0], vec![FunctionKind::Identity], vec![vec![1.0, 0.0]], 0);
        let range = Range::new(0, 1).unwrap();
        let err = interpreter.evaluate(&individual, &[1.0, 2.0], range).unwrap_err();
        assert!(matches!(err, InterpreterError::Shape(_)));
    }

    #[test]
    fn batched_evaluate_matches_naive_row_by_row() {
        let dataset = Dataset::new(
            array![[1.0, 2.0], [2.0, 3.0], [0.5, 1.5], [4.0, 0.2], [1.2, 1.2]],
            &["a", "b"],
        );
        let dispatch = DispatchTable::new();
        let individual = Individual::new(
            vec![2.0, -1.0],
            vec![FunctionKind::Exp, FunctionKind::Sin],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            0,
        );
        let coeff = individual.get_coefficients();
        let range = Range::new(0, 5).unwrap();

        let batched = Interpreter::new(&dataset, &dispatch)
            .with_batch_size(2)
            .evaluate(&individual, &coeff, range)
            .unwrap();
        let naive = Interpreter::new(&dataset, &dispatch)
            .with_batch_size(512)
            .evaluate(&individual, &coeff, range)
            .unwrap();
        for i in 0..5 {
            assert!((batched[i] - naive[i]).abs() < 1e-12);
        }
    }
}
