//! Disjoint-set forest shared by the spanning-forest and dendrogram builders.

/// Union-find with path compression and union by rank.
///
/// `component_node` lets callers attach a payload index to each root; the
/// dendrogram builder uses it to track the linkage node representing a
/// component.
#[derive(Clone, Debug)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
    pub(crate) component_node: Vec<usize>,
}

impl DisjointSet {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            component_node: (0..n).collect(),
        }
    }

    pub(crate) fn find(&mut self, node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut current = node;
        while current != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }

        root
    }

    /// Merges the sets containing `left` and `right`, returning the new root.
    pub(crate) fn union(&mut self, left: usize, right: usize) -> usize {
        let left = self.find(left);
        let right = self.find(right);
        if left == right {
            return left;
        }
        let (parent, child) = match self.rank[left].cmp(&self.rank[right]) {
            std::cmp::Ordering::Less => (right, left),
            std::cmp::Ordering::Greater => (left, right),
            std::cmp::Ordering::Equal => {
                self.rank[left] = self.rank[left].saturating_add(1);
                (left, right)
            }
        };
        self.parent[child] = parent;
        parent
    }
}

#[cfg(test)]
mod tests {
    use super::DisjointSet;

    #[test]
    fn union_merges_components() {
        let mut dsu = DisjointSet::new(4);
        assert_ne!(dsu.find(0), dsu.find(1));
        let root = dsu.union(0, 1);
        assert_eq!(dsu.find(0), root);
        assert_eq!(dsu.find(1), root);
        dsu.union(2, 3);
        dsu.union(1, 3);
        let root = dsu.find(0);
        assert!((0..4).all(|node| dsu.find(node) == root));
    }

    #[test]
    fn union_of_same_set_is_idempotent() {
        let mut dsu = DisjointSet::new(2);
        let first = dsu.union(0, 1);
        assert_eq!(dsu.union(1, 0), first);
    }
}
