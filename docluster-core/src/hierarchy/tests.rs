//! Unit tests for hierarchy extraction from the mutual-reachability forest.

use std::num::NonZeroUsize;

use rstest::rstest;

use crate::{
    HierarchyConfig, HierarchyError, HierarchyErrorCode, TreeEdge, WeightedEdge,
    extract_hierarchy, parallel_kruskal,
};

use super::condense::weight_to_lambda;

fn config(min_cluster_size: usize) -> HierarchyConfig {
    HierarchyConfig::new(NonZeroUsize::new(min_cluster_size).expect("non-zero"))
}

fn core_distances_1d(points: &[f32], min_samples: usize) -> Vec<f32> {
    points
        .iter()
        .enumerate()
        .map(|(idx, &value)| {
            let mut distances: Vec<f32> = points
                .iter()
                .enumerate()
                .filter_map(|(j, &other)| (j != idx).then_some((value - other).abs()))
                .collect();
            distances.sort_by(f32::total_cmp);
            distances
                .get(min_samples - 1)
                .or(distances.last())
                .copied()
                .unwrap_or(0.0)
        })
        .collect()
}

fn spanning_forest_1d(points: &[f32], min_samples: usize) -> Vec<WeightedEdge> {
    let core = core_distances_1d(points, min_samples);
    let mut edges = Vec::new();
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let weight = (points[i] - points[j]).abs().max(core[i]).max(core[j]);
            edges.push(WeightedEdge::new(i, j, weight, edges.len() as u64));
        }
    }
    parallel_kruskal(points.len(), &edges)
        .expect("spanning forest must succeed")
        .edges()
        .to_vec()
}

#[rstest]
#[case::spread(vec![0.0, 0.1, 0.2, 10.0, 10.1, 10.2])]
#[case::duplicates(vec![0.0, 0.0, 0.0, 5.0, 5.0, 5.0])]
fn extracts_two_clusters_without_noise(#[case] points: Vec<f32>) {
    let forest = spanning_forest_1d(&points, 2);
    let hierarchy =
        extract_hierarchy(points.len(), &forest, config(2)).expect("extraction must succeed");

    assert_eq!(hierarchy.labels(), &[0, 0, 0, 1, 1, 1]);
    assert_eq!(hierarchy.cluster_count(), 2);
    assert!(hierarchy.edges().iter().all(|edge| edge.merge_level.is_finite()));
}

#[test]
fn assigns_outlier_to_noise() {
    let points = [0.0, 0.1, 0.2, 10.0, 10.1, 10.2, 100.0];
    let forest = spanning_forest_1d(&points, 2);
    let hierarchy =
        extract_hierarchy(points.len(), &forest, config(3)).expect("extraction must succeed");

    assert_eq!(hierarchy.labels(), &[0, 0, 0, 1, 1, 1, -1]);
}

#[rstest]
#[case::root_not_selectable(false, vec![-1, -1, -1])]
#[case::root_selectable(true, vec![0, 0, 0])]
fn single_cluster_requires_opt_in(#[case] allow: bool, #[case] expected: Vec<i64>) {
    let forest = [WeightedEdge::new(0, 1, 1.0, 0), WeightedEdge::new(1, 2, 2.0, 1)];
    let hierarchy = extract_hierarchy(3, &forest, config(3).with_allow_single_cluster(allow))
        .expect("extraction must succeed");

    assert_eq!(hierarchy.labels(), expected.as_slice());
}

#[test]
fn exports_condensed_tree_with_offset_cluster_ids() {
    let forest = [
        WeightedEdge::new(0, 1, 1.0, 0),
        WeightedEdge::new(2, 3, 1.0, 1),
        WeightedEdge::new(1, 2, 2.0, 2),
    ];
    let hierarchy = extract_hierarchy(4, &forest, config(2)).expect("extraction must succeed");

    assert_eq!(
        hierarchy.edges(),
        &[
            TreeEdge::new(4, 5, 0.5, 2),
            TreeEdge::new(4, 6, 0.5, 2),
            TreeEdge::new(5, 0, 1.0, 1),
            TreeEdge::new(5, 1, 1.0, 1),
            TreeEdge::new(6, 2, 1.0, 1),
            TreeEdge::new(6, 3, 1.0, 1),
        ]
    );
    assert_eq!(hierarchy.labels(), &[0, 0, 1, 1]);
}

#[test]
fn components_below_min_cluster_size_are_noise() {
    let forest = [WeightedEdge::new(0, 1, 1.0, 0), WeightedEdge::new(2, 3, 1.0, 1)];
    let hierarchy = extract_hierarchy(5, &forest, config(3)).expect("extraction must succeed");

    assert!(hierarchy.labels().iter().all(|&label| label == -1));
    assert!(hierarchy.edges().is_empty());
}

#[rstest]
#[case::empty(0, vec![], HierarchyErrorCode::EmptyDataset)]
#[case::too_large(2, vec![], HierarchyErrorCode::MinClusterSizeTooLarge)]
#[case::negative(3, vec![WeightedEdge::new(0, 1, -1.0, 0)], HierarchyErrorCode::InvalidEdgeWeight)]
fn rejects_invalid_input(
    #[case] node_count: usize,
    #[case] forest: Vec<WeightedEdge>,
    #[case] expected: HierarchyErrorCode,
) {
    let err = extract_hierarchy(node_count, &forest, config(3)).expect_err("must fail");
    assert_eq!(err.code(), expected);
    if let HierarchyError::MinClusterSizeTooLarge {
        node_count,
        min_cluster_size,
    } = err
    {
        assert_eq!((node_count, min_cluster_size), (2, 3));
    }
}

#[test]
fn zero_weight_maps_to_finite_lambda() {
    assert!(weight_to_lambda(0.0).is_finite());
    assert_eq!(weight_to_lambda(4.0), 0.25);
}
