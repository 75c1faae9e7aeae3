//! Transitive duplicate groups.
//!
//! Matching chains: if A–B and B–C are edges, A and C share a cluster even
//! when A and C fail the thresholds against each other. Long chains can merge
//! observations that are pairwise unrelated.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;

use crate::config::ClusterStrategy;
use crate::model::{CandidateEdge, Cluster};

/// Partition ids `0..n` into connected components with the chosen strategy.
pub fn build_clusters(n: usize, edges: &[CandidateEdge], strategy: ClusterStrategy) -> Vec<Cluster> {
    match strategy {
        ClusterStrategy::Graph => clusters_by_graph(n, edges),
        ClusterStrategy::UnionFind => clusters_by_union_find(n, edges),
    }
}

/// Connected components of an undirected graph with one node per observation.
pub fn clusters_by_graph(n: usize, edges: &[CandidateEdge]) -> Vec<Cluster> {
    let mut graph: UnGraph<usize, ()> = UnGraph::with_capacity(n, edges.len());
    for id in 0..n {
        graph.add_node(id);
    }
    for e in edges {
        graph.add_edge(NodeIndex::new(e.lo), NodeIndex::new(e.hi), ());
    }

    let mut seen = vec![false; n];
    let mut groups = Vec::new();
    for start in graph.node_indices() {
        if seen[start.index()] {
            continue;
        }
        let mut component = Vec::new();
        let mut bfs = Bfs::new(&graph, start);
        while let Some(node) = bfs.next(&graph) {
            seen[node.index()] = true;
            component.push(graph[node]);
        }
        groups.push(component);
    }
    canonical_partition(groups)
}

/// Same partition as [`clusters_by_graph`], built incrementally.
pub fn clusters_by_union_find(n: usize, edges: &[CandidateEdge]) -> Vec<Cluster> {
    let mut sets = DisjointSet::new(n);
    for e in edges {
        sets.union(e.lo, e.hi);
    }

    let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); n];
    for id in 0..n {
        let root = sets.find(id);
        by_root[root].push(id);
    }
    canonical_partition(by_root.into_iter().filter(|g| !g.is_empty()).collect())
}

/// Sort members ascending, order clusters by smallest member, number them.
fn canonical_partition(mut groups: Vec<Vec<usize>>) -> Vec<Cluster> {
    for g in &mut groups {
        g.sort_unstable();
    }
    groups.sort_unstable_by_key(|g| g[0]);
    groups
        .into_iter()
        .enumerate()
        .map(|(id, members)| Cluster { id, members })
        .collect()
}

/// Disjoint-set forest with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn find(&mut self, idx: usize) -> usize {
        let mut root = idx;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = idx;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}
