//! Partitions a multi-objective population into Pareto fronts. Front 0 is
//! the non-dominated set; duplicates (equal fitness vectors) fall into the
//! same front since neither dominates the other.
//!
//! Three independent algorithms are provided. They must agree on every
//! input up to within-front ordering; `RankIntersectSorter` exists
//! specifically to serve as that cross-check oracle.

use crate::individual::Population;

/// `Left`/`Right` dominance, or `None` if the two fitness vectors are
/// mutually non-dominating (including exact ties).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dominance {
    Left,
    Right,
    Neither,
}

fn dominance(a: &[f64], b: &[f64], eps: f64) -> Dominance {
    let mut a_better = false;
    let mut b_better = false;
    for (&x, &y) in a.iter().zip(b) {
        if x + eps < y {
            a_better = true;
        } else if y + eps < x {
            b_better = true;
        }
    }
    match (a_better, b_better) {
        (true, false) => Dominance::Left,
        (false, true) => Dominance::Right,
        _ => Dominance::Neither,
    }
}

/// A Pareto front: the population indices (into the original slice) that
/// belong to it.
pub type Front = Vec<usize>;
pub type Fronts = Vec<Front>;

pub trait NonDominatedSorter {
    fn sort(&self, fitness: &[Vec<f64>], eps: f64) -> Fronts;
}

/// Peels off fronts one at a time: within the remaining candidates, an
/// individual survives the round iff nothing else remaining dominates it.
/// O(fronts · n²) but simple and a good correctness reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeductiveSorter;

impl NonDominatedSorter for DeductiveSorter {
    fn sort(&self, fitness: &[Vec<f64>], eps: f64) -> Fronts {
        let n = fitness.len();
        let mut sorted = vec![false; n];
        let mut fronts = Fronts::new();
        let mut remaining = n;

        while remaining > 0 {
            let mut dominated = vec![false; n];
            let mut front = Front::new();
            for i in 0..n {
                if sorted[i] || dominated[i] {
                    continue;
                }
                for j in (i + 1)..n {
                    if sorted[j] || dominated[j] {
                        continue;
                    }
                    match dominance(&fitness[i], &fitness[j], eps) {
                        Dominance::Left => dominated[j] = true,
                        Dominance::Right => {
                            dominated[i] = true;
                            break;
                        }
                        Dominance::Neither => {}
                    }
                }
                if !dominated[i] {
                    front.push(i);
                    sorted[i] = true;
                }
            }
            remaining -= front.len();
            fronts.push(front);
        }
        fronts
    }
}

/// Processes candidates in a work queue, peeling one front per pass: an
/// individual is compared against the rest of the current queue and either
/// stays (joins this front) or is pushed to a `dominated` bucket that seeds
/// next round's queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct EfficientSequentialSorter;

impl NonDominatedSorter for EfficientSequentialSorter {
    fn sort(&self, fitness: &[Vec<f64>], eps: f64) -> Fronts {
        let mut queue: std::collections::VecDeque<usize> = (0..fitness.len()).collect();
        let mut fronts = Fronts::new();

        while !queue.is_empty() {
            let mut front = Front::new();
            let mut dominated = Vec::new();
            while let Some(candidate) = queue.pop_front() {
                let mut non_dominated_count = 0;
                let mut still_queued = std::collections::VecDeque::new();
                while queue.len() > non_dominated_count {
                    let other = queue.pop_front().unwrap();
                    match dominance(&fitness[candidate], &fitness[other], eps) {
                        Dominance::Left => dominated.push(other),
                        _ => {
                            still_queued.push_back(other);
                            non_dominated_count += 1;
                        }
                    }
                }
                queue = still_queued;
                front.push(candidate);
            }
            dominated.sort_unstable();
            queue.extend(dominated);
            fronts.push(front);
        }
        fronts
    }
}

/// Reference oracle: ranks every individual by counting how many others
/// strictly dominate it, via a full pairwise comparison. Straightforward
/// and quadratic, used only to cross-check the other sorters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankIntersectSorter;

impl NonDominatedSorter for RankIntersectSorter {
    fn sort(&self, fitness: &[Vec<f64>], eps: f64) -> Fronts {
        let n = fitness.len();
        let mut domination_count = vec![0usize; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                if dominance(&fitness[j], &fitness[i], eps) == Dominance::Left {
                    domination_count[i] += 1;
                }
            }
        }
        let max_rank = domination_count.iter().copied().max().unwrap_or(0);
        let mut fronts: Fronts = vec![Front::new(); max_rank + 1];
        for (i, &count) in domination_count.iter().enumerate() {
            fronts[count].push(i);
        }
        fronts.retain(|f| !f.is_empty());
        fronts
    }
}

/// Sorts `population` by fitness into Pareto fronts, assigning each
/// individual's `rank` field in place (front index).
pub fn assign_ranks(population: &mut Population, sorter: &impl NonDominatedSorter, eps: f64) -> Fronts {
    let fitness: Vec<Vec<f64>> = population.iter().map(|i| i.fitness().to_vec()).collect();
    let fronts = sorter.sort(&fitness, eps);
    let mut rank_of = vec![0usize; fitness.len()];
    for (rank, front) in fronts.iter().enumerate() {
        for &idx in front {
            rank_of[idx] = rank;
        }
    }
    for (i, individual) in population.iter_mut().enumerate() {
        individual.set_rank(rank_of[i]);
    }
    fronts
}

/// Splits a population into one `Population` per front, in front order.
pub fn fronts_to_populations(population: &Population, fronts: &Fronts) -> Vec<Population> {
    fronts.iter().map(|front| population.selected(front)).collect()
}

fn sorted_fronts(fronts: &Fronts) -> Vec<Vec<usize>> {
    let mut out: Vec<Vec<usize>> = fronts.iter().map(|f| {
        let mut v = f.clone();
        v.sort_unstable();
        v
    }).collect();
    out.sort_by_key(|f| f.first().copied().unwrap_or(usize::MAX));
    out
}

/// `true` iff `a` and `b` partition the same population into the same
/// front *memberships*, independent of front order or within-front order.
/// Front 0 membership (the non-dominated set) must match exactly; beyond
/// that, sorters may assign different front indices to the same
/// individual when the population contains dominance cycles through
/// duplicates, so we compare the sorted collection of fronts as sets.
pub fn fronts_agree(a: &Fronts, b: &Fronts) -> bool {
    let mut sa = a.iter().map(|f| { let mut v = f.clone(); v.sort_unstable(); v }).collect::<Vec<_>>();
    let mut sb = b.iter().map(|f| { let mut v = f.clone(); v.sort_unstable(); v }).collect::<Vec<_>>();
    sa.sort();
    sb.sort();
    sa == sb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pop(fitness: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
        fitness
    }

    #[test]
    fn first_front_is_mutually_non_dominated() {
        let fitness = pop(vec![
            vec![1.0, 5.0],
            vec![2.0, 4.0],
            vec![3.0, 3.0],
            vec![5.0, 5.0],
            vec![4.0, 2.0],
        ]);
        let fronts = DeductiveSorter.sort(&fitness, 0.0);
        let mut first = fronts[0].clone();
        first.sort_unstable();
        assert_eq!(first, vec![0, 1, 2, 4]);
    }

    #[test]
    fn fronts_partition_the_whole_population() {
        let fitness: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![(i % 7) as f64, (20 - i) as f64 % 5.0])
            .collect();
        let fronts = EfficientSequentialSorter.sort(&fitness, 0.0);
        let mut all: Vec<usize> = fronts.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn duplicates_land_in_the_same_front() {
        let fitness = pop(vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![2.0, 2.0]]);
        let fronts = DeductiveSorter.sort(&fitness, 0.0);
        assert!(fronts[0].contains(&0));
        assert!(fronts[0].contains(&1));
    }

    #[test]
    fn sorter_variants_agree_on_a_random_instance() {
        let fitness: Vec<Vec<f64>> = vec![
            vec![0.1, 0.9],
            vec![0.2, 0.5],
            vec![0.3, 0.3],
            vec![0.5, 0.2],
            vec![0.9, 0.1],
            vec![0.6, 0.6],
            vec![0.4, 0.8],
            vec![0.7, 0.4],
        ];
        let deductive = DeductiveSorter.sort(&fitness, 0.0);
        let sequential = EfficientSequentialSorter.sort(&fitness, 0.0);
        let reference = RankIntersectSorter.sort(&fitness, 0.0);
        assert!(fronts_agree(&deductive, &reference));
        assert!(fronts_agree(&sequential, &reference));
    }

    #[test]
    fn scenario_first_front_of_eleven_individuals() {
        // (0,7) (1,5) (2,3) (4,2) (7,1) (10,0) (2,6) (4,4) (10,2) (6,6) (9,5),
        // both objectives minimized.
        let fitness: Vec<Vec<f64>> = vec![
            vec![0.0, 7.0],
            vec![1.0, 5.0],
            vec![2.0, 3.0],
            vec![4.0, 2.0],
            vec![7.0, 1.0],
            vec![10.0, 0.0],
            vec![2.0, 6.0],
            vec![4.0, 4.0],
            vec![10.0, 2.0],
            vec![6.0, 6.0],
            vec![9.0, 5.0],
        ];
        let fronts = DeductiveSorter.sort(&fitness, 0.0);
        // expected first front: (0,7) (1,5) (2,3) (4,2) (7,1) (10,0) = indices
        // 0..=5; the rest (2,6) (4,4) (10,2) (6,6) (9,5) are each dominated by
        // one of those six.
        let mut first = fronts[0].clone();
        first.sort_unstable();
        assert_eq!(first, (0..=5).collect::<Vec<usize>>());
        for dominated in 6..11 {
            assert!(!first.contains(&dominated));
        }
    }
}
