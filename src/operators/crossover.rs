//! Produces a child by concatenating a prefix of one parent and a suffix
//! of the other, under a configured maximum length.

use super::GeneticOperator;
use crate::individual::Individual;
use crate::random::RandomGenerator;

pub trait CrossoverOperator: GeneticOperator {
    fn cross(&self, rng: &mut impl RandomGenerator, a: &Individual, b: &Individual) -> Individual;
}

fn splice(a: &Individual, b: &Individual, i: usize, j: usize, max_length: usize) -> Individual {
    let i = i.min(a.length());
    let j = j.min(b.length());
    let left_size = i;
    let right_size = b.length() - j;
    let child_len = (left_size + right_size).min(max_length);

    let mut coefficient = Vec::with_capacity(child_len);
    let mut function = Vec::with_capacity(child_len);
    let mut exponent = Vec::with_capacity(child_len);

    for k in 0..left_size.min(child_len) {
        coefficient.push(a.coefficients()[k]);
        function.push(a.functions()[k]);
        exponent.push(a.exponents()[k].clone());
    }
    let remaining = child_len - coefficient.len();
    for k in 0..remaining.min(right_size) {
        coefficient.push(b.coefficients()[j + k]);
        function.push(b.functions()[j + k]);
        exponent.push(b.exponents()[j + k].clone());
    }

    Individual::new(coefficient, function, exponent, a.birth())
}

/// `(i, j)` cut points per §4.I step 1: `i ∈ [max(1, |a| - M + 1), |a|]`,
/// `j ∈ [1, max(1, M - |a| + i + 1)]`, with probability `p` biasing both
/// toward the second half of each parent.
#[derive(Debug, Clone)]
pub struct IndividualCrossover {
    pub internal_probability: f64,
    pub max_length: usize,
}

impl IndividualCrossover {
    pub fn new(internal_probability: f64, max_length: usize) -> Self {
        IndividualCrossover {
            internal_probability,
            max_length,
        }
    }

    fn swap_locations(&self, rng: &mut impl RandomGenerator, a_len: usize, b_len: usize) -> (usize, usize) {
        let m = self.max_length;
        let i_lo = 1.max(a_len.saturating_sub(m) + 1).min(a_len.max(1));
        let i_hi = a_len.max(1);
        let mut i = rng.gen_range_usize(i_lo, i_hi + 1);

        let j_hi = 1.max(m.saturating_sub(a_len) + i + 1);
        let mut j = rng.gen_range_usize(1, j_hi + 1).min(b_len.max(1));

        if rng.gen_bool(self.internal_probability) {
            i = (i + a_len) / 2;
            j = (j + b_len) / 2;
        }
        (i, j)
    }
}

impl GeneticOperator for IndividualCrossover {
    fn name(&self) -> String {
        "IndividualCrossover".into()
    }
}

impl CrossoverOperator for IndividualCrossover {
    fn cross(&self, rng: &mut impl RandomGenerator, a: &Individual, b: &Individual) -> Individual {
        let (i, j) = self.swap_locations(rng, a.length(), b.length());
        let mut child = splice(a, b, i, j, self.max_length);
        if child.length() == 0 {
            child = a.clone();
        }
        child
    }
}

/// Same shape as `IndividualCrossover::cross` but with fixed, caller-chosen
/// cut points and no length cap beyond the parents' own sizes.
#[derive(Debug, Clone)]
pub struct FixedPointCrossover {
    pub internal_probability: f64,
    pub max_length: usize,
}

impl GeneticOperator for FixedPointCrossover {
    fn name(&self) -> String {
        "FixedPointCrossover".into()
    }
}

impl FixedPointCrossover {
    pub fn cross_at(a: &Individual, b: &Individual, i: usize, j: usize) -> Individual {
        let i = i.min(a.length());
        let j = j.min(b.length());
        let mut coefficient = a.coefficients()[..i].to_vec();
        let mut function = a.functions()[..i].to_vec();
        let mut exponent = a.exponents()[..i].to_vec();
        coefficient.extend_from_slice(&b.coefficients()[j..]);
        function.extend_from_slice(&b.functions()[j..]);
        exponent.extend_from_slice(&b.exponents()[j..]);
        Individual::new(coefficient, function, exponent, a.birth())
    }
}

impl CrossoverOperator for FixedPointCrossover {
    fn cross(&self, rng: &mut impl RandomGenerator, a: &Individual, b: &Individual) -> Individual {
        if !rng.gen_bool(self.internal_probability) {
            return if rng.gen_bool(0.5) { a.clone() } else { b.clone() };
        }
        let i = rng.gen_range_usize(0, a.length() + 1).min(self.max_length);
        let j = rng.gen_range_usize(0, b.length() + 1);
        let mut child = Self::cross_at(a, b, i, j);
        if child.length() > self.max_length {
            child.truncate(self.max_length);
        }
        child
    }
}

/// Swaps each term independently between parents with `swap_probability`.
#[derive(Debug, Clone)]
pub struct UniformCrossover {
    pub internal_probability: f64,
    pub max_length: usize,
    pub swap_probability: f64,
}

impl GeneticOperator for UniformCrossover {
    fn name(&self) -> String {
        "UniformCrossover".into()
    }
}

impl CrossoverOperator for UniformCrossover {
    fn cross(&self, rng: &mut impl RandomGenerator, a: &Individual, b: &Individual) -> Individual {
        if !rng.gen_bool(self.internal_probability) {
            return if rng.gen_bool(0.5) { a.clone() } else { b.clone() };
        }
        let child_len = a.length().min(b.length()).min(self.max_length);
        let mut coefficient = Vec::with_capacity(child_len);
        let mut function = Vec::with_capacity(child_len);
        let mut exponent = Vec::with_capacity(child_len);
        for i in 0..child_len {
            if rng.gen_bool(self.swap_probability) {
                coefficient.push(a.coefficients()[i]);
                function.push(a.functions()[i]);
                exponent.push(a.exponents()[i].clone());
            } else {
                coefficient.push(b.coefficients()[i]);
                function.push(b.functions()[i]);
                exponent.push(b.exponents()[i].clone());
            }
        }
        Individual::new(coefficient, function, exponent, a.birth())
    }
}

/// Alternates copying contiguous segments from each parent at `n` random
/// cut points.
#[derive(Debug, Clone)]
pub struct MultiPointCrossover {
    pub internal_probability: f64,
    pub max_length: usize,
    pub num_crossover_points: usize,
}

impl GeneticOperator for MultiPointCrossover {
    fn name(&self) -> String {
        "MultiPointCrossover".into()
    }
}

impl CrossoverOperator for MultiPointCrossover {
    fn cross(&self, rng: &mut impl RandomGenerator, a: &Individual, b: &Individual) -> Individual {
        if !rng.gen_bool(self.internal_probability) {
            return if rng.gen_bool(0.5) { a.clone() } else { b.clone() };
        }
        let child_len = a.length().min(b.length()).min(self.max_length);
        if child_len <= 1 {
            return a.clone();
        }
        let mut points: Vec<usize> = (0..self.num_crossover_points)
            .map(|_| rng.gen_range_usize(1, child_len))
            .collect();
        points.sort_unstable();

        let mut coefficient = Vec::with_capacity(child_len);
        let mut function = Vec::with_capacity(child_len);
        let mut exponent = Vec::with_capacity(child_len);
        let mut use_left = true;
        let mut last = 0usize;
        for &point in &points {
            let source = if use_left { a } else { b };
            for k in last..point {
                coefficient.push(source.coefficients()[k]);
                function.push(source.functions()[k]);
                exponent.push(source.exponents()[k].clone());
            }
            last = point;
            use_left = !use_left;
        }
        let source = if use_left { a } else { b };
        for k in last..child_len {
            coefficient.push(source.coefficients()[k]);
            function.push(source.functions()[k]);
            exponent.push(source.exponents()[k].clone());
        }
        Individual::new(coefficient, function, exponent, a.birth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionKind;
    use crate::random::EngineRandomGenerator;

    fn individual(len: usize, birth: u64) -> Individual {
        Individual::new(
            vec![1.0; len],
            vec![FunctionKind::Identity; len],
            vec![vec![1.0]; len],
            birth,
        )
    }

    #[test]
    fn scenario_crossover_never_exceeds_max_length() {
        let op = IndividualCrossover::new(0.3, 10);
        let mut rng = EngineRandomGenerator::new_from_seed(Some(1234));
        let a = individual(7, 0);
        let b = individual(5, 1);
        for _ in 0..1000 {
            let child = op.cross(&mut rng, &a, &b);
            assert!(child.length() >= 1);
            assert!(child.length() <= 10);
        }
    }

    #[test]
    fn splice_allows_i_equal_to_a_length() {
        let a = individual(7, 0);
        let b = individual(5, 1);
        let child = splice(&a, &b, a.length(), b.length(), 10);
        assert_eq!(child.length(), 7);
    }

    #[test]
    fn uniform_crossover_respects_max_length() {
        let op = UniformCrossover {
            internal_probability: 1.0,
            max_length: 4,
            swap_probability: 0.5,
        };
        let mut rng = EngineRandomGenerator::new_from_seed(Some(1));
        let a = individual(6, 0);
        let b = individual(6, 1);
        let child = op.cross(&mut rng, &a, &b);
        assert_eq!(child.length(), 4);
    }

    #[test]
    fn multi_point_crossover_respects_max_length() {
        let op = MultiPointCrossover {
            internal_probability: 1.0,
            max_length: 10,
            num_crossover_points: 2,
        };
        let mut rng = EngineRandomGenerator::new_from_seed(Some(2));
        let a = individual(8, 0);
        let b = individual(6, 1);
        for _ in 0..200 {
            let child = op.cross(&mut rng, &a, &b);
            assert!(child.length() <= 10);
            assert!(child.length() >= 1);
        }
    }

    #[test]
    fn fixed_point_crossover_respects_max_length() {
        let op = FixedPointCrossover {
            internal_probability: 1.0,
            max_length: 5,
        };
        let mut rng = EngineRandomGenerator::new_from_seed(Some(3));
        let a = individual(8, 0);
        let b = individual(6, 1);
        for _ in 0..200 {
            let child = op.cross(&mut rng, &a, &b);
            assert!(child.length() <= 5);
        }
    }
}
