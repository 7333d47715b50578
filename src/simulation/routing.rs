//! Least-cost routing over the road network
//!
//! Both strategies share one best-first search. Dijkstra uses a zero
//! heuristic; A* uses straight-line distance divided by an upper bound on
//! the speed implied by the cost function, which keeps it admissible and
//! consistent for any non-negative cost. Heap entries are ordered by
//! `(priority, node id)`, so ties resolve by node insertion order in both.

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use thiserror::Error;

use super::graph::{EdgeId, Graph, NodeId};
use super::types::Located;

/// An ordered sequence of edges from source to destination
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub edges: Vec<EdgeId>,
    /// Sum of edge costs along the route
    pub cost: f64,
}

impl Route {
    /// Source and destination coincide
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no path from {from} to {to}")]
    NoPathExists { from: NodeId, to: NodeId },

    #[error("node {0} not found")]
    UnknownNode(NodeId),
}

/// Computes a least-cost route for a caller-supplied edge cost
///
/// `cost` must return a non-negative value; an infinite cost marks the edge
/// as impassable.
pub trait RouteStrategy {
    fn compute_route<N, E, F>(
        &self,
        graph: &Graph<N, E>,
        source: NodeId,
        destination: NodeId,
        cost: F,
    ) -> Result<Route, RouteError>
    where
        N: Located,
        F: Fn(EdgeId, &E) -> f64;
}

/// Classic priority-queue Dijkstra with early exit on the destination
#[derive(Debug, Clone, Copy, Default)]
pub struct DijkstraStrategy;

impl RouteStrategy for DijkstraStrategy {
    fn compute_route<N, E, F>(
        &self,
        graph: &Graph<N, E>,
        source: NodeId,
        destination: NodeId,
        cost: F,
    ) -> Result<Route, RouteError>
    where
        N: Located,
        F: Fn(EdgeId, &E) -> f64,
    {
        search(graph, source, destination, &cost, |_| 0.0)
    }
}

/// A* guided by straight-line distance over the fastest observed speed
#[derive(Debug, Clone, Copy, Default)]
pub struct AStarStrategy;

impl RouteStrategy for AStarStrategy {
    fn compute_route<N, E, F>(
        &self,
        graph: &Graph<N, E>,
        source: NodeId,
        destination: NodeId,
        cost: F,
    ) -> Result<Route, RouteError>
    where
        N: Located,
        F: Fn(EdgeId, &E) -> f64,
    {
        let goal = graph
            .node(destination)
            .ok_or(RouteError::UnknownNode(destination))?
            .position();
        let speed_bound = speed_upper_bound(graph, &cost);

        search(graph, source, destination, &cost, |node| match (speed_bound, graph.node(node)) {
            (Some(v), Some(payload)) => payload.position().distance(&goal) / v,
            _ => 0.0,
        })
    }
}

/// Routing algorithm selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrategyKind {
    Dijkstra,
    #[default]
    AStar,
}

impl RouteStrategy for StrategyKind {
    fn compute_route<N, E, F>(
        &self,
        graph: &Graph<N, E>,
        source: NodeId,
        destination: NodeId,
        cost: F,
    ) -> Result<Route, RouteError>
    where
        N: Located,
        F: Fn(EdgeId, &E) -> f64,
    {
        match self {
            StrategyKind::Dijkstra => DijkstraStrategy.compute_route(graph, source, destination, cost),
            StrategyKind::AStar => AStarStrategy.compute_route(graph, source, destination, cost),
        }
    }
}

/// Largest straight-line-distance / cost ratio over open edges
///
/// Every edge satisfies `cost >= euclid / bound`, so by the triangle
/// inequality `euclid(n, goal) / bound` never overestimates. `None` means no
/// useful bound exists (free edges or no geometry) and disables the
/// heuristic.
fn speed_upper_bound<N, E, F>(graph: &Graph<N, E>, cost: &F) -> Option<f64>
where
    N: Located,
    F: Fn(EdgeId, &E) -> f64,
{
    let mut bound: f64 = 0.0;
    let mut unbounded = false;
    graph.for_each_edge(|id, key, payload| {
        let (Some(a), Some(b)) = (graph.node(key.from), graph.node(key.to)) else {
            return;
        };
        let straight = a.position().distance(&b.position());
        let c = cost(id, payload);
        if straight <= 0.0 || !c.is_finite() {
            return;
        }
        if c <= 0.0 {
            unbounded = true;
        } else {
            bound = bound.max(straight / c);
        }
    });

    if unbounded || bound <= 0.0 {
        None
    } else {
        Some(bound)
    }
}

fn search<N, E, F, H>(
    graph: &Graph<N, E>,
    source: NodeId,
    destination: NodeId,
    cost: &F,
    heuristic: H,
) -> Result<Route, RouteError>
where
    F: Fn(EdgeId, &E) -> f64,
    H: Fn(NodeId) -> f64,
{
    for node in [source, destination] {
        if !graph.contains_node(node) {
            return Err(RouteError::UnknownNode(node));
        }
    }
    if source == destination {
        return Ok(Route {
            edges: Vec::new(),
            cost: 0.0,
        });
    }

    let n = graph.node_count();
    let mut best = vec![f64::INFINITY; n];
    let mut parent: Vec<Option<EdgeId>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut open = BinaryHeap::new();

    best[source.0] = 0.0;
    open.push(Reverse((OrderedFloat(heuristic(source)), source)));

    while let Some(Reverse((_, node))) = open.pop() {
        if closed[node.0] {
            continue;
        }
        closed[node.0] = true;

        if node == destination {
            return Ok(reconstruct(graph, &parent, destination, best[node.0]));
        }

        for (edge, next) in graph.neighbors(node) {
            if closed[next.0] {
                continue;
            }
            let Some(payload) = graph.edge_by_id(edge) else {
                continue;
            };
            let w = cost(edge, payload);
            debug_assert!(!(w < 0.0), "edge cost must be non-negative, got {w} on {edge}");
            if !w.is_finite() {
                continue;
            }

            let tentative = best[node.0] + w.max(0.0);
            if tentative < best[next.0] {
                best[next.0] = tentative;
                parent[next.0] = Some(edge);
                open.push(Reverse((OrderedFloat(tentative + heuristic(next)), next)));
            }
        }
    }

    Err(RouteError::NoPathExists {
        from: source,
        to: destination,
    })
}

fn reconstruct<N, E>(
    graph: &Graph<N, E>,
    parent: &[Option<EdgeId>],
    destination: NodeId,
    cost: f64,
) -> Route {
    let mut edges = Vec::new();
    let mut cur = destination;
    while let Some(edge) = parent[cur.0] {
        edges.push(edge);
        match graph.endpoints(edge) {
            Some(key) => cur = key.from,
            None => break,
        }
    }
    edges.reverse();
    Route { edges, cost }
}
