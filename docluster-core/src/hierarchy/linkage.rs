//! Single-linkage dendrogram construction from spanning-forest edges.
//!
//! Sorting the edges by weight and merging components with a union-find
//! yields one binary dendrogram per connected component.

use crate::{mst::WeightedEdge, union_find::DisjointSet};

#[derive(Clone, Debug)]
pub(super) struct LinkageNode {
    pub(super) children: Option<(usize, usize)>,
    pub(super) weight: f32,
    pub(super) size: usize,
    pub(super) point: Option<usize>,
}

#[derive(Clone, Debug)]
pub(super) struct SingleLinkageForest {
    nodes: Vec<LinkageNode>,
    roots: Vec<usize>,
}

impl SingleLinkageForest {
    pub(super) fn from_edges(node_count: usize, edges: &[WeightedEdge]) -> Self {
        let mut nodes = Vec::with_capacity(node_count.saturating_mul(2).saturating_sub(1));
        nodes.extend((0..node_count).map(|point| LinkageNode {
            children: None,
            weight: 0.0,
            size: 1,
            point: Some(point),
        }));

        let mut sorted = edges.to_vec();
        sorted.sort_unstable();

        let mut dsu = DisjointSet::new(node_count);
        for edge in sorted {
            let left_root = dsu.find(edge.source());
            let right_root = dsu.find(edge.target());
            if left_root == right_root {
                continue;
            }
            let left = dsu.component_node[left_root];
            let right = dsu.component_node[right_root];
            let id = nodes.len();
            nodes.push(LinkageNode {
                children: Some((left, right)),
                weight: edge.weight(),
                size: nodes[left].size + nodes[right].size,
                point: None,
            });
            let merged = dsu.union(left_root, right_root);
            dsu.component_node[merged] = id;
        }

        let mut roots: Vec<usize> = (0..node_count)
            .filter_map(|point| {
                let root = dsu.find(point);
                (root == point).then_some(dsu.component_node[root])
            })
            .collect();
        roots.sort_unstable();

        Self { nodes, roots }
    }

    pub(super) fn node(&self, id: usize) -> &LinkageNode {
        &self.nodes[id]
    }

    pub(super) fn size(&self, id: usize) -> usize {
        self.nodes[id].size
    }

    pub(super) fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.roots.iter().copied()
    }
}
