//! Connected-component grouping of similar chunks.

/// Disjoint-set union over `0..n` chunk indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Builds connected components over `n` chunk indices given an edge list (pairs whose
/// similarity met the grouping threshold), returning only components of size >= 2.
pub fn connected_components(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut dsu = DisjointSet::new(n);
    for &(a, b) in edges {
        dsu.union(a, b);
    }

    let mut groups: std::collections::BTreeMap<usize, Vec<usize>> = std::collections::BTreeMap::new();
    for i in 0..n {
        let root = dsu.find(i);
        groups.entry(root).or_default().push(i);
    }

    groups
        .into_values()
        .filter(|members| members.len() >= 2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_excluded() {
        let groups = connected_components(3, &[]);
        assert!(groups.is_empty());
    }

    #[test]
    fn pair_forms_a_group() {
        let groups = connected_components(3, &[(0, 1)]);
        assert_eq!(groups, vec![vec![0, 1]]);
    }

    #[test]
    fn transitive_chain_merges_into_one_group() {
        // 0-1, 1-2 should merge into a single group of three, even though 0 and 2
        // never had a direct edge.
        let groups = connected_components(4, &[(0, 1), (1, 2)]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], vec![0, 1, 2]);
    }

    #[test]
    fn disjoint_pairs_stay_separate() {
        let groups = connected_components(4, &[(0, 1), (2, 3)]);
        assert_eq!(groups.len(), 2);
    }
}
