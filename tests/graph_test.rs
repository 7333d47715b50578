//! Road graph storage and road construction

use traffic_flow::simulation::{
    EdgeId, EdgeKey, GraphError, GridGenerator, NodeId, Position, Road, RoadGenerator,
    RoadNetwork, MIN_ROAD_LENGTH, MIN_SPEED_LIMIT,
};

fn line_network(points: &[(f64, f64)]) -> (RoadNetwork, Vec<NodeId>) {
    let mut network = RoadNetwork::new();
    let ids = points
        .iter()
        .map(|(x, y)| network.add_intersection(Position::new(*x, *y)))
        .collect();
    (network, ids)
}

#[test]
fn test_add_road_uses_euclidean_length() {
    let (mut network, ids) = line_network(&[(0.0, 0.0), (30.0, 40.0)]);
    let road = network.add_road(ids[0], ids[1], 2, 15.0).unwrap();

    let road = network.road(road).unwrap();
    assert_eq!(road.length(), 50.0);
    assert_eq!(road.lanes(), 2);
    assert_eq!(road.speed_limit(), 15.0);
    assert!(!road.has_clamped_inputs());
    assert_eq!(network.edge_count(), 1);
}

#[test]
fn test_duplicate_edge_rejected() {
    let (mut network, ids) = line_network(&[(0.0, 0.0), (100.0, 0.0)]);
    network.add_road(ids[0], ids[1], 1, 10.0).unwrap();

    let err = network.add_road(ids[0], ids[1], 1, 10.0).unwrap_err();
    assert_eq!(err, GraphError::DuplicateEdge(EdgeKey::new(ids[0], ids[1])));

    // The opposite direction is a different road
    assert!(network.add_road(ids[1], ids[0], 1, 10.0).is_ok());
    assert_eq!(network.edge_count(), 2);
}

#[test]
fn test_self_loop_and_unknown_node_rejected() {
    let (mut network, ids) = line_network(&[(0.0, 0.0)]);

    assert_eq!(
        network.add_road_with_length(ids[0], ids[0], 10.0, 1, 10.0),
        Err(GraphError::SelfLoop(ids[0]))
    );
    assert_eq!(
        network.add_road(ids[0], NodeId(7), 1, 10.0),
        Err(GraphError::UnknownNode(NodeId(7)))
    );
    assert_eq!(network.edge_count(), 0);
}

#[test]
fn test_neighbors_follow_insertion_order() {
    let (mut network, ids) =
        line_network(&[(0.0, 0.0), (100.0, 0.0), (0.0, 100.0), (-100.0, 0.0)]);
    let east = network.add_road(ids[0], ids[1], 1, 10.0).unwrap();
    let north = network.add_road(ids[0], ids[2], 1, 10.0).unwrap();
    let west = network.add_road(ids[0], ids[3], 1, 10.0).unwrap();

    let neighbors: Vec<_> = network.neighbors(ids[0]).collect();
    assert_eq!(
        neighbors,
        vec![(east, ids[1]), (north, ids[2]), (west, ids[3])]
    );
    assert_eq!(network.neighbors(ids[1]).count(), 0);
}

#[test]
fn test_remove_and_reinstate_edge() {
    let (mut network, ids) = line_network(&[(0.0, 0.0), (100.0, 0.0), (200.0, 0.0)]);
    let first = network.add_road(ids[0], ids[1], 1, 10.0).unwrap();
    network.add_road(ids[1], ids[2], 1, 10.0).unwrap();
    let key = EdgeKey::new(ids[0], ids[1]);

    assert_eq!(network.remove_edge(key), Ok(first));
    assert!(!network.is_open(first));
    assert!(network.edge(key).is_none());
    assert_eq!(network.neighbors(ids[0]).count(), 0);
    assert_eq!(network.open_edge_count(), 1);

    // Closed roads keep their payload and id
    assert_eq!(network.edge_id(key), Some(first));
    assert!(network.road(first).is_some());

    let mut visited = Vec::new();
    network.for_each_edge(|id, _, _| visited.push(id));
    assert!(!visited.contains(&first));

    assert_eq!(network.reinstate_edge(key), Ok(first));
    assert!(network.is_open(first));
    assert!(network.edge(key).is_some());
    assert_eq!(network.neighbors(ids[0]).count(), 1);

    let missing = EdgeKey::new(ids[2], ids[0]);
    assert_eq!(
        network.remove_edge(missing),
        Err(GraphError::UnknownEdge(missing))
    );
}

#[test]
fn test_invalid_road_inputs_are_clamped() {
    let (mut network, ids) = line_network(&[(0.0, 0.0), (0.0, 0.0)]);
    let road = network.add_road(ids[0], ids[1], 0, -3.0).unwrap();

    let road = network.road(road).unwrap();
    assert_eq!(road.length(), MIN_ROAD_LENGTH);
    assert_eq!(road.speed_limit(), MIN_SPEED_LIMIT);
    assert_eq!(road.lanes(), 1);
    assert!(road.has_clamped_inputs());
}

#[test]
fn test_road_capacity() {
    let (mut network, ids) = line_network(&[(0.0, 0.0), (100.0, 0.0), (110.0, 0.0)]);
    let long = network.add_road(ids[0], ids[1], 2, 10.0).unwrap();
    let short = network.add_road(ids[1], ids[2], 1, 10.0).unwrap();

    assert_eq!(network.road(long).unwrap().capacity(25.0), 8);
    // Shorter than one spacing still carries one vehicle
    assert_eq!(network.road(short).unwrap().capacity(25.0), 1);
}

#[test]
fn test_road_capacity_saturates() {
    let road = Road::new(EdgeId(0), NodeId(0), NodeId(1), 1e12, 10, 10.0);
    assert!(!road.has_clamped_inputs());
    assert_eq!(road.capacity(25.0), u32::MAX);
}

#[test]
fn test_grid_generator_layout() {
    let mut network = RoadNetwork::new();
    let generator = GridGenerator {
        rows: 2,
        cols: 3,
        spacing: 100.0,
        ..GridGenerator::default()
    };
    generator.generate(&mut network).unwrap();

    assert_eq!(network.node_count(), 6);
    // 2 rows * 2 horizontal + 3 vertical links, both directions
    assert_eq!(network.edge_count(), 14);
    assert_eq!(
        network.intersection_position(NodeId(5)),
        Some(Position::new(200.0, 100.0))
    );

    let corner = network.edge(EdgeKey::new(NodeId(0), NodeId(3))).unwrap();
    assert_eq!(corner.length(), 100.0);
}
