//! Route search: optimality, determinism and closed edges

use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use traffic_flow::simulation::{
    AStarStrategy, DijkstraStrategy, EdgeId, EdgeKey, NodeId, Position, Road, RoadNetwork,
    RouteError, RouteStrategy, StrategyKind,
};

const STRATEGIES: [StrategyKind; 2] = [StrategyKind::Dijkstra, StrategyKind::AStar];

fn travel_time(_: EdgeId, road: &Road) -> f64 {
    road.length() / road.speed_limit()
}

fn total_cost(network: &RoadNetwork, edges: &[EdgeId]) -> f64 {
    edges
        .iter()
        .map(|id| travel_time(*id, network.road(*id).unwrap()))
        .sum()
}

/// Checks that consecutive edges connect source to destination
fn assert_connected_path(network: &RoadNetwork, edges: &[EdgeId], from: NodeId, to: NodeId) {
    let mut at = from;
    for edge in edges {
        let key = network.endpoints(*edge).unwrap();
        assert_eq!(key.from, at, "route is not contiguous at {}", edge);
        assert!(network.is_open(*edge), "route uses closed edge {}", edge);
        at = key.to;
    }
    assert_eq!(at, to);
}

/// Relaxes every edge |V| - 1 times
fn bellman_ford(network: &RoadNetwork, source: NodeId) -> Vec<f64> {
    let mut dist = vec![f64::INFINITY; network.node_count()];
    dist[source.0] = 0.0;
    for _ in 1..network.node_count() {
        network.for_each_edge(|id, key, road| {
            let candidate = dist[key.from.0] + travel_time(id, road);
            if candidate < dist[key.to.0] {
                dist[key.to.0] = candidate;
            }
        });
    }
    dist
}

fn random_network(rng: &mut StdRng) -> RoadNetwork {
    let mut network = RoadNetwork::new();
    let nodes = rng.random_range(2..=20);
    let ids: Vec<NodeId> = (0..nodes)
        .map(|_| {
            network.add_intersection(Position::new(
                rng.random_range(0.0..1000.0),
                rng.random_range(0.0..1000.0),
            ))
        })
        .collect();

    let edges = rng.random_range(0..nodes * 3);
    for _ in 0..edges {
        let a = ids[rng.random_range(0..nodes)];
        let b = ids[rng.random_range(0..nodes)];
        let speed = rng.random_range(5.0..30.0);
        // Self loops and duplicates are rejected; that is fine here
        let _ = network.add_road(a, b, 1, speed);
    }
    network
}

#[test]
fn test_direct_edge_beats_cheaper_hops() {
    // A->B 5, B->C 5, A->C 9
    let mut network = RoadNetwork::new();
    let a = network.add_intersection(Position::new(0.0, 0.0));
    let b = network.add_intersection(Position::new(5.0, 0.0));
    let c = network.add_intersection(Position::new(5.0, 5.0));
    network.add_road_with_length(a, b, 5.0, 1, 1.0).unwrap();
    network.add_road_with_length(b, c, 5.0, 1, 1.0).unwrap();
    let direct = network.add_road_with_length(a, c, 9.0, 1, 1.0).unwrap();

    for strategy in STRATEGIES {
        let route = strategy.compute_route(&network, a, c, travel_time).unwrap();
        assert_eq!(route.edges, vec![direct], "{:?}", strategy);
        assert_eq!(route.cost, 9.0);
    }
}

#[test]
fn test_source_equals_destination_is_empty_route() {
    let mut network = RoadNetwork::new();
    let a = network.add_intersection(Position::new(0.0, 0.0));

    for strategy in STRATEGIES {
        let route = strategy.compute_route(&network, a, a, travel_time).unwrap();
        assert!(route.is_trivial());
        assert_eq!(route.cost, 0.0);
    }
}

#[test]
fn test_equal_cost_tie_breaks_on_node_order() {
    let mut network = RoadNetwork::new();
    let a = network.add_intersection(Position::new(0.0, 0.0));
    let upper = network.add_intersection(Position::new(50.0, 50.0));
    let lower = network.add_intersection(Position::new(50.0, -50.0));
    let d = network.add_intersection(Position::new(100.0, 0.0));
    // Insert the lower detour first so edge order does not decide the tie
    network.add_road(a, lower, 1, 10.0).unwrap();
    network.add_road(lower, d, 1, 10.0).unwrap();
    let first = network.add_road(a, upper, 1, 10.0).unwrap();
    let second = network.add_road(upper, d, 1, 10.0).unwrap();

    for strategy in STRATEGIES {
        for _ in 0..3 {
            let route = strategy.compute_route(&network, a, d, travel_time).unwrap();
            assert_eq!(route.edges, vec![first, second], "{:?}", strategy);
        }
    }
}

#[test]
fn test_no_path_and_unknown_node() {
    let mut network = RoadNetwork::new();
    let a = network.add_intersection(Position::new(0.0, 0.0));
    let b = network.add_intersection(Position::new(100.0, 0.0));
    network.add_road(b, a, 1, 10.0).unwrap();

    for strategy in STRATEGIES {
        assert_eq!(
            strategy.compute_route(&network, a, b, travel_time),
            Err(RouteError::NoPathExists { from: a, to: b })
        );
        assert_eq!(
            strategy.compute_route(&network, a, NodeId(9), travel_time),
            Err(RouteError::UnknownNode(NodeId(9)))
        );
    }
}

#[test]
fn test_closed_edges_are_never_used() {
    let mut network = RoadNetwork::new();
    let a = network.add_intersection(Position::new(0.0, 0.0));
    let b = network.add_intersection(Position::new(100.0, 0.0));
    let c = network.add_intersection(Position::new(50.0, 80.0));
    network.add_road(a, b, 1, 10.0).unwrap();
    let detour = [
        network.add_road(a, c, 1, 10.0).unwrap(),
        network.add_road(c, b, 1, 10.0).unwrap(),
    ];

    network.remove_edge(EdgeKey::new(a, b)).unwrap();
    for strategy in STRATEGIES {
        let route = strategy.compute_route(&network, a, b, travel_time).unwrap();
        assert_eq!(route.edges, detour.to_vec());
    }

    network.remove_edge(EdgeKey::new(c, b)).unwrap();
    assert!(matches!(
        AStarStrategy.compute_route(&network, a, b, travel_time),
        Err(RouteError::NoPathExists { .. })
    ));
}

#[test]
fn test_infinite_cost_edges_are_impassable() {
    let mut network = RoadNetwork::new();
    let a = network.add_intersection(Position::new(0.0, 0.0));
    let b = network.add_intersection(Position::new(100.0, 0.0));
    let blocked = network.add_road(a, b, 1, 10.0).unwrap();

    let result = DijkstraStrategy.compute_route(&network, a, b, |id, road| {
        if id == blocked {
            f64::INFINITY
        } else {
            travel_time(id, road)
        }
    });
    assert!(matches!(result, Err(RouteError::NoPathExists { .. })));
}

#[test]
fn test_random_graphs_match_reference_shortest_paths() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..200 {
        let mut network = random_network(&mut rng);
        let nodes = network.node_count();

        // Close a few edges to exercise the open filter
        for _ in 0..network.edge_count() / 5 {
            let victim = EdgeId(rng.random_range(0..network.edge_count()));
            let key = network.endpoints(victim).unwrap();
            network.remove_edge(key).unwrap();
        }

        let mut reference = DiGraph::<(), f64>::new();
        for _ in 0..nodes {
            reference.add_node(());
        }
        network.for_each_edge(|id, key, road| {
            reference.add_edge(
                NodeIndex::new(key.from.0),
                NodeIndex::new(key.to.0),
                travel_time(id, road),
            );
        });

        let source = NodeId(rng.random_range(0..nodes));
        let expected = dijkstra(&reference, NodeIndex::new(source.0), None, |e| *e.weight());
        let brute = bellman_ford(&network, source);

        for target in (0..nodes).map(NodeId) {
            let want = expected.get(&NodeIndex::new(target.0)).copied();
            assert_eq!(want.is_some(), brute[target.0].is_finite());

            for strategy in STRATEGIES {
                let result = strategy.compute_route(&network, source, target, travel_time);
                match (want, result) {
                    (Some(cost), Ok(route)) => {
                        assert!(
                            (route.cost - cost).abs() < 1e-6,
                            "{:?} {} -> {}: got {}, want {}",
                            strategy,
                            source,
                            target,
                            route.cost,
                            cost
                        );
                        assert!((route.cost - brute[target.0]).abs() < 1e-6);
                        assert!((total_cost(&network, &route.edges) - route.cost).abs() < 1e-6);
                        assert_connected_path(&network, &route.edges, source, target);
                    }
                    (None, Err(RouteError::NoPathExists { .. })) => {}
                    (want, got) => panic!(
                        "{:?} {} -> {}: reference {:?}, got {:?}",
                        strategy, source, target, want, got
                    ),
                }
            }
        }
    }
}
