//! Connectivity classes of the road network
//!
//! Backed by petgraph's union-find (union by rank, path compression in
//! `find`). Edges are treated as undirected, so a negative `connected`
//! answer proves that no directed route exists while a positive one still
//! needs a search. Union-find cannot forget a union: after an edge is closed
//! the partition must be rebuilt with `from_graph`.

use petgraph::unionfind::UnionFind;

use super::graph::{Graph, NodeId};

#[derive(Debug, Clone)]
pub struct DisjointSet {
    sets: UnionFind<usize>,
    len: usize,
}

impl DisjointSet {
    /// `len` singleton classes
    pub fn new(len: usize) -> Self {
        Self {
            sets: UnionFind::new(len),
            len,
        }
    }

    /// Partition induced by the open edges of a graph
    pub fn from_graph<N, E>(graph: &Graph<N, E>) -> Self {
        let mut set = Self::new(graph.node_count());
        graph.for_each_edge(|_, key, _| {
            set.union(key.from, key.to);
        });
        set
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Merges the classes of `a` and `b`. Returns false if already merged or
    /// if either id is out of range.
    pub fn union(&mut self, a: NodeId, b: NodeId) -> bool {
        if a.0 >= self.len || b.0 >= self.len {
            return false;
        }
        self.sets.union(a.0, b.0)
    }

    /// Representative of the class of `a`, compressing the path on the way
    pub fn find(&mut self, a: NodeId) -> Option<NodeId> {
        if a.0 >= self.len {
            return None;
        }
        Some(NodeId(self.sets.find_mut(a.0)))
    }

    pub fn connected(&self, a: NodeId, b: NodeId) -> bool {
        if a.0 >= self.len || b.0 >= self.len {
            return false;
        }
        self.sets.equiv(a.0, b.0)
    }
}
