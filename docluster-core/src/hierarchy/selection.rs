//! Excess-of-mass cluster selection and point labelling.

use super::{CondensedEvent, CondensedForest, NOISE_LABEL};

/// Selects the most stable clusters, returned in ascending id order.
///
/// Children always carry larger ids than their parents, so a reverse sweep
/// visits every child before its parent.
pub(super) fn select_stable_clusters(
    condensed: &CondensedForest,
    allow_single_cluster: bool,
) -> Vec<usize> {
    let clusters = &condensed.clusters;
    let mut score = vec![0.0_f32; clusters.len()];
    let mut selected = vec![false; clusters.len()];

    for id in (0..clusters.len()).rev() {
        let cluster = &clusters[id];
        let selectable = cluster.parent.is_some() || allow_single_cluster;

        if cluster.children.is_empty() {
            score[id] = cluster.stability;
            selected[id] = selectable;
            continue;
        }

        let child_score: f32 = cluster.children.iter().map(|&child| score[child]).sum();
        if !selectable || child_score > cluster.stability {
            score[id] = child_score;
            continue;
        }

        score[id] = cluster.stability;
        selected[id] = true;
        let mut stack = cluster.children.clone();
        while let Some(descendant) = stack.pop() {
            selected[descendant] = false;
            stack.extend(clusters[descendant].children.iter().copied());
        }
    }

    selected
        .iter()
        .enumerate()
        .filter_map(|(id, &chosen)| chosen.then_some(id))
        .collect()
}

/// Labels points by the selected cluster containing them.
///
/// Points shed by a selected cluster or any of its descendants take that
/// cluster's label; all others are noise.
pub(super) fn label_points(
    node_count: usize,
    condensed: &CondensedForest,
    selected: &[usize],
) -> Vec<i64> {
    let mut label_lookup = vec![None; condensed.clusters.len()];
    for (label, &cluster_id) in selected.iter().enumerate() {
        label_lookup[cluster_id] = Some(label as i64);
    }

    let mut labels = vec![NOISE_LABEL; node_count];
    let roots = condensed
        .clusters
        .iter()
        .enumerate()
        .filter(|(_, cluster)| cluster.parent.is_none())
        .map(|(id, _)| (id, None));
    let mut stack: Vec<(usize, Option<i64>)> = roots.collect();

    while let Some((cluster_id, inherited)) = stack.pop() {
        let label = label_lookup[cluster_id].or(inherited);
        for event in &condensed.clusters[cluster_id].events {
            match *event {
                CondensedEvent::Point { index, .. } => {
                    labels[index] = label.unwrap_or(NOISE_LABEL);
                }
                CondensedEvent::ChildCluster { cluster, .. } => stack.push((cluster, label)),
            }
        }
    }

    labels
}
