//! Unit tests for the Kruskal spanning-forest builder.

use rstest::rstest;

use super::{MstError, MstErrorCode, WeightedEdge, parallel_kruskal};

fn edges(raw: &[(usize, usize, f32)]) -> Vec<WeightedEdge> {
    raw.iter()
        .enumerate()
        .map(|(sequence, &(source, target, weight))| {
            WeightedEdge::new(source, target, weight, sequence as u64)
        })
        .collect()
}

fn component_count(node_count: usize, forest: &[WeightedEdge]) -> usize {
    let mut parent: Vec<usize> = (0..node_count).collect();

    fn find(parent: &mut [usize], node: usize) -> usize {
        let mut current = node;
        while parent[current] != current {
            current = parent[current];
        }
        current
    }

    for edge in forest {
        assert!(edge.source() < edge.target());
        let left = find(&mut parent, edge.source());
        let right = find(&mut parent, edge.target());
        assert_ne!(left, right, "forest must be acyclic");
        parent[right] = left;
    }

    (0..node_count)
        .filter(|&node| find(&mut parent, node) == node)
        .count()
}

#[test]
fn rejects_empty_graph() {
    let err = parallel_kruskal(0, &[]).expect_err("empty graph must fail");
    assert_eq!(err, MstError::EmptyGraph);
    assert_eq!(err.code(), MstErrorCode::EmptyGraph);
    assert_eq!(err.code().as_str(), "MST_EMPTY_GRAPH");
}

#[rstest]
#[case::out_of_bounds(&[(0, 3, 1.0)], MstError::InvalidNodeId { node: 3, node_count: 3 })]
#[case::nan(&[(0, 1, f32::NAN)], MstError::NonFiniteWeight { left: 0, right: 1 })]
#[case::infinite(&[(2, 1, f32::INFINITY)], MstError::NonFiniteWeight { left: 2, right: 1 })]
fn rejects_invalid_edges(#[case] raw: &[(usize, usize, f32)], #[case] expected: MstError) {
    let err = parallel_kruskal(3, &edges(raw)).expect_err("invalid edge must fail");
    assert_eq!(err, expected);
}

#[test]
fn ignores_self_edges() {
    let forest = parallel_kruskal(2, &edges(&[(0, 0, 1.0), (1, 0, 2.0)]))
        .expect("valid graph must succeed");
    assert!(forest.is_tree());
    assert_eq!(forest.edges().len(), 1);
    assert_eq!(forest.edges()[0].source(), 0);
    assert_eq!(forest.edges()[0].target(), 1);
}

#[test]
fn selects_lightest_spanning_edges() {
    let forest = parallel_kruskal(
        4,
        &edges(&[
            (0, 1, 1.0),
            (1, 2, 2.0),
            (2, 3, 3.0),
            (0, 2, 6.0),
            (0, 3, 10.0),
        ]),
    )
    .expect("MST must succeed");

    let weights: Vec<f32> = forest.edges().iter().map(WeightedEdge::weight).collect();
    assert_eq!(weights, vec![1.0, 2.0, 3.0]);
    assert_eq!(forest.component_count(), 1);
}

#[test]
fn returns_forest_for_disconnected_graph() {
    let forest = parallel_kruskal(5, &edges(&[(0, 1, 1.0), (2, 3, 2.0)]))
        .expect("forest must succeed");

    assert_eq!(forest.component_count(), 3);
    assert_eq!(component_count(5, forest.edges()), 3);
    assert!(!forest.is_tree());
}

#[test]
fn equal_weights_produce_a_deterministic_tree() {
    let raw = [
        (0, 1, 1.0),
        (0, 2, 1.0),
        (0, 3, 1.0),
        (1, 2, 1.0),
        (2, 3, 1.0),
        (1, 3, 1.0),
    ];
    let first = parallel_kruskal(4, &edges(&raw)).expect("graph must succeed");
    for _ in 0..10 {
        let again = parallel_kruskal(4, &edges(&raw)).expect("graph must succeed");
        assert_eq!(again, first);
    }
    assert_eq!(component_count(4, first.edges()), 1);
    assert_eq!(first.edges().len(), 3);
}
