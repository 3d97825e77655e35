//! Pairwise compatibility cache over the occurrences of one run.

use super::{CompatibilityOracle, Occurrence};

/// Symmetric adjacency matrix: `compatible(i, j)` for occurrence indices.
///
/// Built once per generation run so bucket checks cost one lookup per
/// member instead of a full rule-table evaluation.
#[derive(Debug, Clone)]
pub struct CompatibilityMatrix {
    n: usize,
    cells: Vec<bool>,
}

impl CompatibilityMatrix {
    /// Evaluates every pair of `occurrences` with `oracle`.
    pub fn build(oracle: &CompatibilityOracle, occurrences: &[Occurrence<'_>]) -> Self {
        let n = occurrences.len();
        let mut cells = vec![false; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let ok = oracle.allows(&occurrences[i], &occurrences[j]);
                cells[i * n + j] = ok;
                cells[j * n + i] = ok;
            }
        }
        Self { n, cells }
    }

    /// Number of occurrences covered.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Whether occurrences `i` and `j` may share a visit. Out of range is `false`.
    #[inline]
    pub fn compatible(&self, i: usize, j: usize) -> bool {
        i < self.n && j < self.n && self.cells[i * self.n + j]
    }

    /// Whether `candidate` is compatible with every listed member.
    pub fn compatible_with_all(&self, candidate: usize, members: &[usize]) -> bool {
        members.iter().all(|&m| self.compatible(candidate, m))
    }

    /// Whether every pair within `group` is compatible.
    pub fn is_clique(&self, group: &[usize]) -> bool {
        group
            .iter()
            .enumerate()
            .all(|(k, &i)| group[k + 1..].iter().all(|&j| self.compatible(i, j)))
    }
}
