//! Congestion tiers, incidents and edge costs

use traffic_flow::simulation::{
    CongestionConfig, CongestionModel, EdgeId, OccupancyBuffer, Position, RoadId, RoadNetwork,
    VehicleType, MIN_INCIDENT_FACTOR,
};

/// One 100 m single-lane road at 20 m/s; capacity 4 with the default spacing
fn single_road() -> (RoadNetwork, RoadId) {
    let mut network = RoadNetwork::new();
    let a = network.add_intersection(Position::new(0.0, 0.0));
    let b = network.add_intersection(Position::new(100.0, 0.0));
    let road = network.add_road(a, b, 1, 20.0).unwrap();
    (network, road)
}

#[test]
fn test_speed_halves_per_capacity_tier() {
    let (network, id) = single_road();
    let model = CongestionModel::new(&network, CongestionConfig::default());
    let road = network.road(id).unwrap();
    assert_eq!(road.capacity(model.config().comfortable_spacing), 4);

    let speed = |n| model.update_edge_state(road, n).effective_speed;
    assert_eq!(speed(0), 20.0);
    assert_eq!(speed(4), 20.0);
    assert_eq!(speed(5), 10.0);
    assert_eq!(speed(8), 10.0);
    assert_eq!(speed(9), 5.0);
    assert_eq!(speed(13), 2.5);
}

#[test]
fn test_speed_is_monotonic_and_floored() {
    let (network, id) = single_road();
    let config = CongestionConfig {
        min_speed: 0.5,
        ..CongestionConfig::default()
    };
    let model = CongestionModel::new(&network, config);
    let road = network.road(id).unwrap();

    let mut previous = f64::INFINITY;
    for n in 0..200 {
        let state = model.update_edge_state(road, n);
        assert!(state.effective_speed <= previous, "speed rose at {} vehicles", n);
        assert!(state.effective_speed >= 0.5);
        assert!(state.effective_speed <= road.speed_limit());
        assert!(state.congestion_factor > 0.0 && state.congestion_factor <= 1.0);
        previous = state.effective_speed;
    }
    assert_eq!(model.update_edge_state(road, 199).effective_speed, 0.5);
    assert!(model.update_edge_state(road, 5).is_congested());
    assert!(!model.update_edge_state(road, 4).is_congested());
}

#[test]
fn test_cost_is_length_over_effective_speed() {
    let (network, id) = single_road();
    let model = CongestionModel::new(&network, CongestionConfig::default());
    let road = network.road(id).unwrap();

    assert_eq!(model.edge_cost(road), 5.0);
    let jammed = model.update_edge_state(road, 9);
    assert_eq!(model.cost(&jammed, road), 20.0);
}

#[test]
fn test_vehicle_cost_caps_speed_at_desired() {
    let mut network = RoadNetwork::new();
    let a = network.add_intersection(Position::new(0.0, 0.0));
    let b = network.add_intersection(Position::new(660.0, 0.0));
    let id = network.add_road(a, b, 1, 33.0).unwrap();
    let mut model = CongestionModel::new(&network, CongestionConfig::default());
    let road = network.road(id).unwrap();

    let car = VehicleType::Car.params().desired_speed;
    let truck = VehicleType::Truck.params().desired_speed;
    assert_eq!(model.edge_cost(road), 20.0);
    assert_eq!(model.vehicle_cost(road, car), 22.0);
    assert_eq!(model.vehicle_cost(road, truck), 30.0);

    // Below both desired speeds the road is the bottleneck again
    model.set_incident(road, 0.5);
    assert_eq!(model.vehicle_cost(road, car), 40.0);
    assert_eq!(model.vehicle_cost(road, truck), 40.0);
}

#[test]
fn test_update_reads_occupancy_once_per_tick() {
    let (network, id) = single_road();
    let mut model = CongestionModel::new(&network, CongestionConfig::default());

    assert!(model.update(1, &network, &[6]));
    assert_eq!(model.state(id).vehicles, 6);
    assert_eq!(model.state(id).effective_speed, 10.0);

    // Same tick again: no change even with different counts
    assert!(!model.update(1, &network, &[0]));
    assert_eq!(model.state(id).effective_speed, 10.0);

    assert!(model.update(2, &network, &[0]));
    assert_eq!(model.state(id).effective_speed, 20.0);
}

#[test]
fn test_incident_scales_free_flow_speed() {
    let (network, id) = single_road();
    let mut model = CongestionModel::new(&network, CongestionConfig::default());
    let road = network.road(id).unwrap();

    model.set_incident(road, 0.25);
    assert_eq!(model.state(id).effective_speed, 5.0);
    assert_eq!(model.state(id).congestion_factor, 0.25);
    assert_eq!(model.update_edge_state(road, 5).effective_speed, 2.5);

    model.clear_incident(road);
    assert_eq!(model.state(id).effective_speed, 20.0);

    // Out-of-range factors are clamped
    model.set_incident(road, 0.0);
    assert_eq!(model.state(id).effective_speed, 20.0 * MIN_INCIDENT_FACTOR);
    model.set_incident(road, 3.0);
    assert_eq!(model.state(id).effective_speed, 20.0);

    model.reset(&network);
    assert_eq!(model.state(id).effective_speed, 20.0);
}

#[test]
fn test_occupancy_buffer_swaps_counts() {
    let mut buffer = OccupancyBuffer::new(3);
    buffer.record(EdgeId(0));
    buffer.record(EdgeId(2));
    buffer.record(EdgeId(2));
    buffer.record(EdgeId(9));
    assert_eq!(buffer.previous(), &[0, 0, 0]);

    assert_eq!(buffer.swap(), 3);
    assert_eq!(buffer.previous(), &[1, 0, 2]);

    assert_eq!(buffer.swap(), 0);
    assert_eq!(buffer.previous(), &[0, 0, 0]);

    buffer.record(EdgeId(1));
    buffer.swap();
    buffer.clear();
    assert_eq!(buffer.previous(), &[0, 0, 0]);
}
