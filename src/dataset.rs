//! Columnar numeric data plus the half-open row ranges used to slice it.

use ndarray::{s, Array2, ArrayView1};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// A half-open interval `[start, end)` of row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    start: usize,
    end: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid range [{start}, {end}): start must not exceed end")]
    InvalidRange { start: usize, end: usize },
    #[error("range [{start}, {end}) exceeds dataset of {rows} rows")]
    RangeExceedsDataset {
        start: usize,
        end: usize,
        rows: usize,
    },
}

impl Range {
    pub fn new(start: usize, end: usize) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::InvalidRange { start, end });
        }
        Ok(Range { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn size(&self) -> usize {
        self.end - self.start
    }

    pub fn bounds(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    fn check_within(&self, rows: usize) -> Result<(), RangeError> {
        if self.end > rows {
            return Err(RangeError::RangeExceedsDataset {
                start: self.start,
                end: self.end,
                rows,
            });
        }
        Ok(())
    }
}

/// A named input column. Two variables are equal iff both name and index
/// agree; the hash is a stable function of the name alone so it survives
/// column reordering across runs with the same schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    index: usize,
    hash: u64,
}

impl Variable {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        let name = name.into();
        let hash = stable_hash(&name);
        Variable { name, index, hash }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }
}

fn stable_hash(name: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    hasher.finish()
}

/// An `(rows × cols)` matrix of real scalars plus one `Variable` per column.
#[derive(Debug, Clone)]
pub struct Dataset {
    values: Array2<f64>,
    variables: Vec<Variable>,
}

impl Dataset {
    /// Build a dataset from a row-major matrix and column names, in order.
    pub fn new(values: Array2<f64>, column_names: &[impl AsRef<str>]) -> Self {
        assert_eq!(
            values.ncols(),
            column_names.len(),
            "column name count must match matrix column count"
        );
        let variables = column_names
            .iter()
            .enumerate()
            .map(|(i, name)| Variable::new(name.as_ref(), i))
            .collect();
        Dataset { values, variables }
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Stable hash of every column's variable, in column order.
    pub fn variable_hashes(&self) -> Vec<u64> {
        self.variables.iter().map(Variable::hash).collect()
    }

    fn variable_index(&self, variable: &Variable) -> Option<usize> {
        self.variables
            .iter()
            .position(|v| v.hash == variable.hash && v.index == variable.index)
    }

    /// Full column for `variable`, regardless of row range.
    pub fn values(&self, variable: &Variable) -> Option<ArrayView1<'_, f64>> {
        let idx = self.variable_index(variable)?;
        Some(self.values.column(idx))
    }

    /// Column slice for `variable` restricted to `range`.
    pub fn values_in_range(
        &self,
        variable: &Variable,
        range: Range,
    ) -> Result<ArrayView1<'_, f64>, RangeError> {
        range.check_within(self.rows())?;
        let idx = self
            .variable_index(variable)
            .expect("variable not present in dataset");
        Ok(self.values.column(idx).slice(s![range.start..range.end]))
    }

    /// In-place Fisher-Yates shuffle of the rows within `range`, using the
    /// given RNG. Rows outside the range are untouched.
    pub fn shuffle(&mut self, range: Range, rng: &mut impl rand::Rng) -> Result<(), RangeError> {
        range.check_within(self.rows())?;
        let (start, end) = range.bounds();
        for i in (start + 1..end).rev() {
            let j = rng.random_range(start..=i);
            if i != j {
                for c in 0..self.values.ncols() {
                    self.values.swap((i, c), (j, c));
                }
            }
        }
        Ok(())
    }

    /// In-place per-column standardization (zero mean, unit variance) over
    /// `range`. Columns with zero variance are left at zero mean, unscaled.
    pub fn standardize(&mut self, range: Range) -> Result<(), RangeError> {
        range.check_within(self.rows())?;
        let (start, end) = range.bounds();
        let n = (end - start) as f64;
        for c in 0..self.values.ncols() {
            let mut col = self.values.slice_mut(s![start..end, c]);
            let mean = col.sum() / n;
            let var = col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            if std > 0.0 {
                col.mapv_inplace(|x| (x - mean) / std);
            } else {
                col.mapv_inplace(|x| x - mean);
            }
        }
        Ok(())
    }
}
