//! Generic directed graph with O(1) edge lookup by endpoint pair
//!
//! Payloads live in a petgraph `DiGraph`. Edges are never physically removed:
//! closing an edge only hides it from traversal so it can be reinstated later
//! without reallocating or renumbering anything. Ids are dense and follow
//! insertion order, which keeps every iteration deterministic.

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use rustc_hash::FxHashMap;
use std::fmt;
use thiserror::Error;

/// Node identifier (insertion index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// Edge identifier (insertion index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Directed identity of an edge: ordered endpoint pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub from: NodeId,
    pub to: NodeId,
}

impl EdgeKey {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }

    pub fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} not found")]
    UnknownNode(NodeId),

    #[error("edge {0} not found")]
    UnknownEdge(EdgeKey),

    #[error("edge {0} already exists")]
    DuplicateEdge(EdgeKey),

    #[error("self loop at {0} is not allowed")]
    SelfLoop(NodeId),
}

/// Weighted directed graph parameterized over node and edge payloads
#[derive(Debug, Clone)]
pub struct Graph<N, E> {
    inner: DiGraph<N, E>,
    /// EdgeKey -> edge index, one entry per edge
    index: FxHashMap<EdgeKey, EdgeIndex>,
    /// Outgoing edges per node in insertion order
    outgoing: Vec<Vec<EdgeIndex>>,
    /// Open flag per edge; closed edges are skipped by traversal
    open: Vec<bool>,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Self {
            inner: DiGraph::default(),
            index: FxHashMap::default(),
            outgoing: Vec::new(),
            open: Vec::new(),
        }
    }
}

impl<N, E> Graph<N, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its id
    pub fn add_node(&mut self, payload: N) -> NodeId {
        let idx = self.inner.add_node(payload);
        self.outgoing.push(Vec::new());
        NodeId(idx.index())
    }

    /// Id the next call to `add_node` will return
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.inner.node_count())
    }

    /// Id the next call to `add_edge` will return
    pub fn next_edge_id(&self) -> EdgeId {
        EdgeId(self.inner.edge_count())
    }

    /// Adds an open edge `from -> to`
    ///
    /// Fails when either endpoint is unknown, when `from == to`, or when an
    /// edge with the same key already exists (one Road per EdgeKey).
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, payload: E) -> Result<EdgeId, GraphError> {
        self.check_node(from)?;
        self.check_node(to)?;
        if from == to {
            return Err(GraphError::SelfLoop(from));
        }
        let key = EdgeKey::new(from, to);
        if self.index.contains_key(&key) {
            return Err(GraphError::DuplicateEdge(key));
        }

        let idx = self
            .inner
            .add_edge(NodeIndex::new(from.0), NodeIndex::new(to.0), payload);
        self.index.insert(key, idx);
        self.outgoing[from.0].push(idx);
        self.open.push(true);
        Ok(EdgeId(idx.index()))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        id.0 < self.inner.node_count()
    }

    fn check_node(&self, id: NodeId) -> Result<(), GraphError> {
        if self.contains_node(id) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&N> {
        self.inner.node_weight(NodeIndex::new(id.0))
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> + '_ {
        self.inner
            .raw_nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i), &node.weight))
    }

    /// Looks up an open edge by key
    pub fn edge(&self, key: EdgeKey) -> Option<&E> {
        let id = self.edge_id(key)?;
        if self.is_open(id) {
            self.edge_by_id(id)
        } else {
            None
        }
    }

    /// Edge id for a key, open or closed
    pub fn edge_id(&self, key: EdgeKey) -> Option<EdgeId> {
        self.index.get(&key).map(|idx| EdgeId(idx.index()))
    }

    /// Payload of an edge, open or closed
    pub fn edge_by_id(&self, id: EdgeId) -> Option<&E> {
        self.inner.edge_weight(EdgeIndex::new(id.0))
    }

    pub fn endpoints(&self, id: EdgeId) -> Option<EdgeKey> {
        self.inner
            .edge_endpoints(EdgeIndex::new(id.0))
            .map(|(a, b)| EdgeKey::new(NodeId(a.index()), NodeId(b.index())))
    }

    pub fn is_open(&self, id: EdgeId) -> bool {
        self.open.get(id.0).copied().unwrap_or(false)
    }

    /// Open outgoing edges of a node as `(edge, target)` in insertion order
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId)> + '_ {
        self.outgoing
            .get(node.0)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter(|idx| self.open[idx.index()])
            .filter_map(|idx| {
                self.inner
                    .edge_endpoints(*idx)
                    .map(|(_, to)| (EdgeId(idx.index()), NodeId(to.index())))
            })
    }

    /// Logically closes an edge. Returns its id.
    ///
    /// Closing an already closed edge is a no-op.
    pub fn remove_edge(&mut self, key: EdgeKey) -> Result<EdgeId, GraphError> {
        let id = self.edge_id(key).ok_or(GraphError::UnknownEdge(key))?;
        self.open[id.0] = false;
        Ok(id)
    }

    /// Reopens a previously closed edge. Returns its id.
    pub fn reinstate_edge(&mut self, key: EdgeKey) -> Result<EdgeId, GraphError> {
        let id = self.edge_id(key).ok_or(GraphError::UnknownEdge(key))?;
        self.open[id.0] = true;
        Ok(id)
    }

    /// Sets the open flag by id. Returns false for an unknown id.
    pub fn set_open(&mut self, id: EdgeId, open: bool) -> bool {
        match self.open.get_mut(id.0) {
            Some(flag) => {
                *flag = open;
                true
            }
            None => false,
        }
    }

    /// Visits every open edge in insertion order
    pub fn for_each_edge<F>(&self, mut f: F)
    where
        F: FnMut(EdgeId, EdgeKey, &E),
    {
        for (i, edge) in self.inner.raw_edges().iter().enumerate() {
            if self.open[i] {
                let key = EdgeKey::new(NodeId(edge.source().index()), NodeId(edge.target().index()));
                f(EdgeId(i), key, &edge.weight);
            }
        }
    }

    /// All edges (open or closed) in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &E)> + '_ {
        self.inner
            .raw_edges()
            .iter()
            .enumerate()
            .map(|(i, edge)| (EdgeId(i), &edge.weight))
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn open_edge_count(&self) -> usize {
        self.open.iter().filter(|open| **open).count()
    }
}
