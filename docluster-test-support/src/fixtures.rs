//! Condensed-tree fixtures shared by the tree and report test suites.
//!
//! Edges are raw `(parent, child, lambda, child_size)` tuples so this crate
//! stays independent of `docluster-core`.

use proptest::prelude::*;

/// A condensed-tree edge as `(parent, child, lambda, child_size)`.
pub type RawEdge = (i64, i64, f64, u64);

/// A generated condensed tree with labels for its points.
#[derive(Clone, Debug)]
pub struct CondensedFixture {
    /// Number of points `N`; clusters are numbered from `N`.
    pub point_count: usize,
    /// Condensed tree edges in creation order.
    pub edges: Vec<RawEdge>,
    /// One final label per point; `-1` marks noise.
    pub labels: Vec<i64>,
}

struct Decisions<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl Decisions<'_> {
    fn next(&mut self) -> usize {
        if self.bytes.is_empty() {
            return 0;
        }
        let value = self.bytes[self.cursor % self.bytes.len()];
        self.cursor += 1;
        usize::from(value)
    }
}

/// Builds a well-formed condensed tree over `point_count` points.
///
/// Starting from root cluster `N`, each cluster of four or more points either
/// sheds some points and splits into two clusters of at least two points, or
/// sheds all of its points. `decisions` drives every choice, so equal input
/// yields equal trees.
///
/// # Examples
///
/// ```
/// use docluster_test_support::fixtures::condensed_tree;
///
/// let edges = condensed_tree(6, &[1, 0, 0]);
/// let points = edges.iter().filter(|edge| edge.3 == 1).count();
/// assert_eq!(points, 6);
/// ```
#[must_use]
pub fn condensed_tree(point_count: usize, decisions: &[u8]) -> Vec<RawEdge> {
    partial_condensed_tree(point_count, point_count, decisions)
}

/// Like [`condensed_tree`], but only points `0..attached` hang from the tree.
/// Points `attached..point_count` stay isolated; the root is still `N`.
///
/// ```
/// use docluster_test_support::fixtures::partial_condensed_tree;
///
/// let edges = partial_condensed_tree(6, 4, &[1, 0, 0]);
/// assert!(edges.iter().all(|edge| edge.1 >= 6 || edge.1 < 4));
/// ```
#[must_use]
pub fn partial_condensed_tree(
    point_count: usize,
    attached: usize,
    decisions: &[u8],
) -> Vec<RawEdge> {
    let n = point_count as i64;
    let attached = attached.min(point_count) as i64;
    let mut decisions = Decisions {
        bytes: decisions,
        cursor: 0,
    };
    let mut next_cluster = n + 1;
    let mut edges = Vec::new();
    let mut stack = vec![(n, (0..attached).collect::<Vec<i64>>(), 0.1_f64)];

    while let Some((cluster, points, lambda)) = stack.pop() {
        let level = lambda + 0.5 + decisions.next() as f64 / 64.0;
        if points.len() < 4 || decisions.next() % 3 == 0 {
            edges.extend(points.iter().map(|&point| (cluster, point, level, 1)));
            continue;
        }

        let shed = decisions.next() % (points.len() - 3);
        let (shed_points, rest) = points.split_at(shed);
        edges.extend(shed_points.iter().map(|&point| (cluster, point, level, 1)));

        let split = 2 + decisions.next() % (rest.len() - 3);
        let (left, right) = rest.split_at(split);
        for side in [left, right] {
            let child = next_cluster;
            next_cluster += 1;
            edges.push((cluster, child, level, side.len() as u64));
            stack.push((child, side.to_vec(), level));
        }
    }

    edges
}

/// Builds a chain of `length` cluster-to-cluster edges below root `N = 1`,
/// with the single point hanging from the deepest cluster.
#[must_use]
pub fn cluster_chain(length: usize) -> Vec<RawEdge> {
    let mut edges: Vec<RawEdge> = (0..length as i64)
        .map(|step| (1 + step, 2 + step, 1.0 + step as f64, 2))
        .collect();
    edges.push((1 + length as i64, 0, 1.0 + length as f64, 1));
    edges
}

/// Strategy producing condensed trees of 2 to 40 points with random labels.
/// Up to three trailing points are left isolated.
pub fn condensed_fixture() -> impl Strategy<Value = CondensedFixture> {
    (2_usize..40)
        .prop_flat_map(|point_count| {
            (
                Just(point_count),
                0_usize..=3_usize.min(point_count - 1),
                prop::collection::vec(any::<u8>(), 1..32),
                prop::collection::vec(-1_i64..5, point_count),
            )
        })
        .prop_map(|(point_count, isolated, decisions, labels)| CondensedFixture {
            point_count,
            edges: partial_condensed_tree(point_count, point_count - isolated, &decisions),
            labels,
        })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rstest::rstest;

    use super::{cluster_chain, condensed_tree, partial_condensed_tree};

    #[rstest]
    #[case::tiny(2, vec![])]
    #[case::split(12, vec![1, 1, 0, 3, 7])]
    #[case::wide(39, vec![200, 5, 17, 9, 255, 128])]
    fn every_point_is_attached_exactly_once(#[case] points: usize, #[case] decisions: Vec<u8>) {
        let edges = condensed_tree(points, &decisions);
        let attached: Vec<i64> = edges
            .iter()
            .filter(|edge| edge.3 == 1)
            .map(|edge| edge.1)
            .collect();
        let unique: BTreeSet<i64> = attached.iter().copied().collect();
        assert_eq!(attached.len(), points);
        assert_eq!(unique, (0..points as i64).collect());
    }

    #[test]
    fn trailing_points_can_stay_isolated() {
        let edges = partial_condensed_tree(10, 7, &[1, 1, 0, 3]);
        let attached: BTreeSet<i64> = edges
            .iter()
            .filter(|edge| edge.3 == 1)
            .map(|edge| edge.1)
            .collect();
        assert_eq!(attached, (0..7).collect());
        assert!(edges.iter().all(|edge| edge.0 >= 10));
    }

    #[test]
    fn chain_has_requested_cluster_edges() {
        let edges = cluster_chain(600);
        assert_eq!(edges.iter().filter(|edge| edge.3 > 1).count(), 600);
    }
}
