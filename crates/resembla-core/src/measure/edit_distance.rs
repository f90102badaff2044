//! Normalized edit distances
//!
//! Two families share one recurrence:
//!
//! - [`EditDistance`] uses unit insertion/deletion costs and returns a
//!   **similarity**: `1 - D / (n + m)`, so identical sequences score 1.0.
//! - [`WeightedEditDistance`] takes insertion/deletion costs from token
//!   weights and returns a **distance**: `D / total_cost`, so identical
//!   sequences score 0.0. Callers invert it for ranking.
//!
//! In both, substituting `a` for `b` costs `cost(a, b)` times the combined
//! deletion and insertion cost, so substitution never beats delete+insert.

use super::cost::MismatchCost;
use crate::sequence::Weighted;

/// Unit-cost edit distance normalized to a similarity in `[0, 1]`
#[derive(Debug, Clone, Default)]
pub struct EditDistance<C> {
    cost: C,
}

impl<C> EditDistance<C> {
    pub fn new(cost: C) -> Self {
        Self { cost }
    }

    /// Similarity of `a` and `b`; two empty sequences are identical (1.0)
    pub fn similarity<T>(&self, a: &[T], b: &[T]) -> f64
    where
        C: MismatchCost<T>,
    {
        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }

        let mut prev: Vec<f64> = (0..=b.len()).map(|j| j as f64).collect();
        let mut cur = vec![0.0; b.len() + 1];
        for (i, x) in a.iter().enumerate() {
            cur[0] = (i + 1) as f64;
            for (j, y) in b.iter().enumerate() {
                let substitute = prev[j] + 2.0 * self.cost.cost(x, y);
                cur[j + 1] = substitute.min(prev[j + 1] + 1.0).min(cur[j] + 1.0);
            }
            std::mem::swap(&mut prev, &mut cur);
        }

        1.0 - prev[b.len()] / total as f64
    }
}

/// Token-weighted edit distance normalized to a distance in `[0, 1]`
#[derive(Debug, Clone, Default)]
pub struct WeightedEditDistance<C> {
    cost: C,
}

impl<C> WeightedEditDistance<C> {
    pub fn new(cost: C) -> Self {
        Self { cost }
    }

    /// Distance between `a` and `b`
    ///
    /// Zero total cost (both empty, or only zero-weight tokens) is distance 0.
    pub fn distance<T>(&self, a: &[Weighted<T>], b: &[Weighted<T>]) -> f64
    where
        C: MismatchCost<T>,
    {
        let mut prev = Vec::with_capacity(b.len() + 1);
        prev.push(0.0);
        for y in b {
            let last = prev[prev.len() - 1];
            prev.push(last + y.weight);
        }
        let insert_all = prev[b.len()];

        let mut delete_all = 0.0;
        let mut cur = vec![0.0; b.len() + 1];
        for x in a {
            delete_all += x.weight;
            cur[0] = delete_all;
            for (j, y) in b.iter().enumerate() {
                let substitute = prev[j] + self.cost.cost(&x.token, &y.token) * (x.weight + y.weight);
                cur[j + 1] = substitute
                    .min(prev[j + 1] + x.weight)
                    .min(cur[j] + y.weight);
            }
            std::mem::swap(&mut prev, &mut cur);
        }

        let total = delete_all + insert_all;
        if total <= 0.0 {
            return 0.0;
        }
        prev[b.len()] / total
    }
}
