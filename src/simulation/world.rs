//! Simulation orchestrator that ties everything together
//!
//! One call to `step` advances the world by one tick in a fixed order:
//!
//! 1. apply traffic events due at the start of the tick
//! 2. rebuild connectivity if an edge was closed
//! 3. refresh congestion from the previous tick's occupancy
//! 4. expire stranded vehicles, then route pending, stranded and re-routing ones
//! 5. integrate vehicle dynamics and edge transitions
//! 6. advance the clock, refresh statistics and emit a snapshot
//!
//! The snapshot and the statistics only change between ticks.

use log::{debug, error, info, warn};
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use sorted_vec::SortedVec;
use std::collections::BTreeMap;
use thiserror::Error;

use super::config::SimConfig;
use super::congestion::{CongestionModel, OccupancyBuffer};
use super::disjoint_set::DisjointSet;
use super::events::{EventKind, TrafficEvent, TrafficEvents};
use super::fleet::FleetManager;
use super::graph::{EdgeId, GraphError};
use super::road_network::{Road, RoadNetwork};
use super::routing::{Route, RouteError, RouteStrategy, StrategyKind};
use super::stats::{SimSnapshot, SimSnapshotItem, Stats};
use super::types::{IntersectionId, RoadId, VehicleId, VehicleType};
use super::vehicle::{LeaderInfo, Vehicle, VehicleStatus, VehicleUpdateResult};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("trip from {from} to {to} has no distance to cover")]
    InvalidTrip {
        from: IntersectionId,
        to: IntersectionId,
    },

    #[error("invariant violated at tick {tick}: {detail}")]
    InvariantViolation { tick: u64, detail: String },
}

/// Vehicles on one edge ordered by position along it
type Lane = SortedVec<(OrderedFloat<f64>, VehicleId)>;

/// A routing job collected before the (possibly parallel) search
#[derive(Debug, Clone, Copy)]
struct RouteRequest {
    vehicle: VehicleId,
    origin: IntersectionId,
    destination: IntersectionId,
    /// Edge costs are capped by how fast this vehicle wants to drive
    desired_speed: f64,
    strategy: StrategyKind,
}

pub struct Simulation {
    network: RoadNetwork,
    /// Open flags at construction, restored by `reset`
    initial_open: Vec<bool>,
    config: SimConfig,
    congestion: CongestionModel,
    occupancy: OccupancyBuffer,
    connectivity: DisjointSet,
    /// An edge closed since the last connectivity rebuild
    partition_stale: bool,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    events: TrafficEvents,
    fleet: Option<FleetManager>,
    stats: Stats,
    /// Clamped inputs found while building the simulation
    base_clamps: u64,
    /// Distance driven by vehicles that already left the simulation
    retired_distance: f64,
    next_vehicle_id: u64,
    tick: u64,
    time: f64,
    last_snapshot: SimSnapshot,
}

impl Simulation {
    /// Creates a simulation over a finished road network
    pub fn new(network: RoadNetwork, config: SimConfig) -> Self {
        let mut config = config;
        let mut base_clamps = network
            .edges()
            .filter(|(_, road)| road.has_clamped_inputs())
            .count() as u64;

        if !(config.tick_duration.is_finite() && config.tick_duration > 0.0) {
            warn!(
                "Tick duration {} clamped to {}",
                config.tick_duration,
                SimConfig::default().tick_duration
            );
            config.tick_duration = SimConfig::default().tick_duration;
            base_clamps += 1;
        }
        if config.stranded_timeout.is_nan() || config.stranded_timeout < 0.0 {
            warn!("Stranded timeout {} clamped to 0", config.stranded_timeout);
            config.stranded_timeout = 0.0;
            base_clamps += 1;
        }

        let initial_open = network.edges().map(|(id, _)| network.is_open(id)).collect();
        let congestion = CongestionModel::new(&network, config.congestion.clone());
        let occupancy = OccupancyBuffer::new(network.edge_count());
        let connectivity = DisjointSet::from_graph(&network);
        let fleet = config.fleet.clone().map(FleetManager::new);

        info!(
            "Simulation created: {} intersections, {} roads, {:?} routing",
            network.node_count(),
            network.edge_count(),
            config.strategy
        );

        Self {
            network,
            initial_open,
            config,
            congestion,
            occupancy,
            connectivity,
            partition_stale: false,
            vehicles: BTreeMap::new(),
            events: TrafficEvents::new(),
            fleet,
            stats: Stats {
                clamped_inputs: base_clamps,
                ..Stats::default()
            },
            base_clamps,
            retired_distance: 0.0,
            next_vehicle_id: 0,
            tick: 0,
            time: 0.0,
            last_snapshot: SimSnapshot::default(),
        }
    }

    /// Adds a pre-built event schedule
    pub fn with_events(mut self, events: impl IntoIterator<Item = TrafficEvent>) -> Self {
        for event in events {
            self.add_event(event);
        }
        self
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn congestion(&self) -> &CongestionModel {
        &self.congestion
    }

    pub fn connectivity(&self) -> &DisjointSet {
        &self.connectivity
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn events(&self) -> &TrafficEvents {
        &self.events
    }

    /// Vehicles still owned by the simulation, in id order
    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> + '_ {
        self.vehicles.values()
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Simulated seconds since the start
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed ticks
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn last_snapshot(&self) -> &SimSnapshot {
        &self.last_snapshot
    }

    /// Routing algorithm used from the next tick on, for every vehicle
    ///
    /// Per-vehicle overrides given at spawn time are dropped.
    pub fn set_strategy(&mut self, strategy: StrategyKind) {
        info!("Routing strategy set to {:?}", strategy);
        self.config.strategy = strategy;
        for vehicle in self.vehicles.values_mut() {
            vehicle.set_strategy(None);
        }
    }

    pub fn add_event(&mut self, event: TrafficEvent) {
        debug!(
            "Scheduled {:?} on {} at t={:.1}s",
            event.kind, event.edge, event.at
        );
        if self.events.add_event(event) {
            // The event log survives `reset`, so does its clamp count
            self.base_clamps += 1;
            self.stats.clamped_inputs += 1;
        }
    }

    /// Registers a trip; the vehicle waits at `source` until its first route
    pub fn spawn_vehicle(
        &mut self,
        vehicle_type: VehicleType,
        source: IntersectionId,
        destination: IntersectionId,
    ) -> Result<VehicleId, SimError> {
        self.insert_vehicle(vehicle_type, source, destination, None)
    }

    /// Like `spawn_vehicle`, but the trip is always routed with `strategy`
    pub fn spawn_vehicle_with_strategy(
        &mut self,
        vehicle_type: VehicleType,
        source: IntersectionId,
        destination: IntersectionId,
        strategy: StrategyKind,
    ) -> Result<VehicleId, SimError> {
        self.insert_vehicle(vehicle_type, source, destination, Some(strategy))
    }

    fn insert_vehicle(
        &mut self,
        vehicle_type: VehicleType,
        source: IntersectionId,
        destination: IntersectionId,
        strategy: Option<StrategyKind>,
    ) -> Result<VehicleId, SimError> {
        for node in [source, destination] {
            if !self.network.contains_node(node) {
                return Err(GraphError::UnknownNode(node).into());
            }
        }
        if source == destination {
            return Err(SimError::InvalidTrip {
                from: source,
                to: destination,
            });
        }

        let id = VehicleId(self.next_vehicle_id);
        self.next_vehicle_id += 1;
        let mut vehicle = Vehicle::new(id, vehicle_type, source, destination);
        vehicle.set_strategy(strategy);
        self.vehicles.insert(id, vehicle);
        self.stats.spawned += 1;
        self.stats.pending += 1;

        debug!(
            "Spawned {:?} {}: {} -> {}",
            vehicle_type, id, source, destination
        );
        Ok(id)
    }

    /// Runs `ticks` ticks of the configured duration
    pub fn run(&mut self, ticks: u64) -> Result<SimSnapshot, SimError> {
        for _ in 0..ticks {
            self.step(self.config.tick_duration)?;
        }
        Ok(self.last_snapshot.clone())
    }

    /// Advances the simulation by one tick of `dt` seconds
    ///
    /// A non-positive or non-finite `dt` falls back to the configured tick
    /// duration.
    pub fn step(&mut self, dt: f64) -> Result<SimSnapshot, SimError> {
        let dt = self.sanitize_dt(dt);
        self.tick += 1;
        let now = self.time;

        self.apply_due_events(now);

        if self.partition_stale {
            self.connectivity = DisjointSet::from_graph(&self.network);
            self.partition_stale = false;
            debug!("Tick {}: connectivity rebuilt", self.tick);
        }

        self.congestion
            .update(self.tick, &self.network, self.occupancy.previous());

        self.expire_stranded(now);
        self.assign_routes(now);

        self.update_leaders();
        let results = self.update_vehicles(dt, now);
        self.process_results(results);

        let recorded = self.occupancy.swap();
        let active = self.vehicles.values().filter(|v| v.is_active()).count() as u64;
        if recorded != active {
            return Err(self.invariant_violation(format!(
                "occupancy records {} vehicles but {} are active",
                recorded, active
            )));
        }

        self.time += dt;
        self.refresh_stats();
        if !self.stats.is_conserved() {
            return Err(self.invariant_violation(format!(
                "spawned {} != in flight {} + completed {} + failed {}",
                self.stats.spawned,
                self.stats.in_flight(),
                self.stats.completed,
                self.stats.failed
            )));
        }

        self.top_up_fleet();

        let snapshot = self.build_snapshot();
        self.last_snapshot = snapshot.clone();
        Ok(snapshot)
    }

    /// Returns to the state right after construction
    ///
    /// Vehicles are dropped, closures undone, events re-armed and the spawn
    /// policy reseeded, so two runs after `reset(seed)` are identical.
    pub fn reset(&mut self, seed: u64) {
        for (index, open) in self.initial_open.iter().enumerate() {
            self.network.set_open(EdgeId(index), *open);
        }
        self.congestion.reset(&self.network);
        self.occupancy.clear();
        self.connectivity = DisjointSet::from_graph(&self.network);
        self.partition_stale = false;
        self.vehicles.clear();
        self.events.rewind();
        if let Some(fleet) = self.fleet.as_mut() {
            fleet.reseed(seed);
        }
        self.stats = Stats {
            clamped_inputs: self.base_clamps,
            ..Stats::default()
        };
        self.retired_distance = 0.0;
        self.next_vehicle_id = 0;
        self.tick = 0;
        self.time = 0.0;
        self.last_snapshot = SimSnapshot::default();

        info!("Simulation reset with seed {}", seed);
    }

    fn sanitize_dt(&mut self, dt: f64) -> f64 {
        if dt.is_finite() && dt > 0.0 {
            dt
        } else {
            warn!(
                "Tick {}: dt {} replaced by {}",
                self.tick + 1,
                dt,
                self.config.tick_duration
            );
            self.stats.clamped_inputs += 1;
            self.config.tick_duration
        }
    }

    fn invariant_violation(&self, detail: String) -> SimError {
        error!("Tick {}: {}", self.tick, detail);
        SimError::InvariantViolation {
            tick: self.tick,
            detail,
        }
    }

    fn apply_due_events(&mut self, now: f64) {
        for event in self.events.take_due(now) {
            let Some(edge) = self.network.edge_id(event.edge) else {
                warn!(
                    "Tick {}: {:?} targets unknown edge {}, skipped",
                    self.tick, event.kind, event.edge
                );
                continue;
            };

            match event.kind {
                EventKind::Close => {
                    if self.network.is_open(edge) {
                        self.network.set_open(edge, false);
                        self.partition_stale = true;
                        self.on_edge_closed(edge, now);
                    }
                }
                EventKind::Reopen => {
                    if !self.network.is_open(edge) {
                        self.network.set_open(edge, true);
                        if !self.partition_stale {
                            self.connectivity.union(event.edge.from, event.edge.to);
                        }
                    }
                }
                EventKind::Incident { speed_factor } => {
                    if let Some(road) = self.network.road(edge) {
                        self.congestion.set_incident(road, speed_factor);
                    }
                }
                EventKind::ClearIncident => {
                    if let Some(road) = self.network.road(edge) {
                        self.congestion.clear_incident(road);
                    }
                }
            }

            self.stats.events_applied += 1;
            info!(
                "t={:.1}s: {:?} applied to {}",
                now, event.kind, event.edge
            );
        }
    }

    /// Strands vehicles on a closed edge and flags routes that cross it
    fn on_edge_closed(&mut self, edge: RoadId, now: f64) {
        let tail = self.network.endpoints(edge).map(|key| key.from);
        for vehicle in self.vehicles.values_mut() {
            if vehicle.current_edge() == Some(edge) {
                vehicle.strand(tail.unwrap_or(vehicle.source), now);
            } else if vehicle.remaining_edges().contains(&edge) {
                vehicle.mark_for_reroute();
            }
        }
    }

    fn expire_stranded(&mut self, now: f64) {
        let timeout = self.config.stranded_timeout;
        let expired: Vec<VehicleId> = self
            .vehicles
            .values()
            .filter(|vehicle| {
                matches!(vehicle.status(), VehicleStatus::Stranded { since } if now - since >= timeout)
            })
            .map(|vehicle| vehicle.id)
            .collect();

        for id in expired {
            if let Some(vehicle) = self.vehicles.remove(&id) {
                self.retired_distance += vehicle.odometer();
                self.stats.failed += 1;
                info!(
                    "Vehicle {} gave up after {:.1}s stranded ({} -> {})",
                    id, timeout, vehicle.source, vehicle.destination
                );
            }
        }
    }

    fn assign_routes(&mut self, now: f64) {
        let default_strategy = self.config.strategy;
        let requests: Vec<RouteRequest> = self
            .vehicles
            .values()
            .filter(|vehicle| vehicle.wants_route(&self.config))
            .filter_map(|vehicle| {
                vehicle.route_origin(&self.network).map(|origin| RouteRequest {
                    vehicle: vehicle.id,
                    origin,
                    destination: vehicle.destination,
                    desired_speed: vehicle.params().desired_speed,
                    strategy: vehicle.strategy().unwrap_or(default_strategy),
                })
            })
            .collect();
        if requests.is_empty() {
            return;
        }

        let network = &self.network;
        let congestion = &self.congestion;
        let connectivity = &self.connectivity;
        let plan = |request: &RouteRequest| -> Result<Route, RouteError> {
            if !connectivity.connected(request.origin, request.destination) {
                return Err(RouteError::NoPathExists {
                    from: request.origin,
                    to: request.destination,
                });
            }
            request.strategy.compute_route(
                network,
                request.origin,
                request.destination,
                |_, road: &Road| congestion.vehicle_cost(road, request.desired_speed),
            )
        };

        #[cfg(feature = "parallel")]
        let outcomes: Vec<Result<Route, RouteError>> = {
            use rayon::prelude::*;
            requests.par_iter().map(plan).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<Result<Route, RouteError>> = requests.iter().map(plan).collect();

        let mut clearance = self.entry_clearance();
        for (request, outcome) in requests.into_iter().zip(outcomes) {
            self.apply_route(request, outcome, now, &mut clearance);
        }
    }

    /// Rear bumper of the last vehicle on every occupied edge
    fn entry_clearance(&self) -> FxHashMap<RoadId, f64> {
        let mut clearance: FxHashMap<RoadId, f64> = FxHashMap::default();
        for vehicle in self.vehicles.values() {
            if let Some(edge) = vehicle.current_edge() {
                let rear = vehicle.position() - vehicle.params().length;
                clearance
                    .entry(edge)
                    .and_modify(|last| *last = last.min(rear))
                    .or_insert(rear);
            }
        }
        clearance
    }

    fn apply_route(
        &mut self,
        request: RouteRequest,
        outcome: Result<Route, RouteError>,
        now: f64,
        clearance: &mut FxHashMap<RoadId, f64>,
    ) {
        let Some(vehicle) = self.vehicles.get_mut(&request.vehicle) else {
            return;
        };

        let mut arrived = false;
        match (vehicle.status(), outcome) {
            (VehicleStatus::Active, Ok(route)) => {
                let old_cost = remaining_cost(
                    &self.network,
                    &self.congestion,
                    vehicle.remaining_edges(),
                    request.desired_speed,
                );
                if route.edges.as_slice() != vehicle.remaining_edges() {
                    self.stats.reroutes += 1;
                    if old_cost.is_finite() && old_cost > route.cost {
                        self.stats.reroute_time_saved += old_cost - route.cost;
                    }
                    debug!(
                        "Vehicle {} re-routed from {}: cost {:.1}s -> {:.1}s",
                        vehicle.id, request.origin, old_cost, route.cost
                    );
                }
                vehicle.splice_route(route.edges);
            }
            (VehicleStatus::Active, Err(err)) => {
                debug!("Vehicle {} keeps its route: {}", vehicle.id, err);
                vehicle.reroute_attempted();
            }
            (_, Ok(route)) if route.is_trivial() => arrived = true,
            (_, Ok(route)) => {
                // Hold the vehicle at its node until the first edge has room
                let first = route.edges.first().copied();
                let room = first
                    .and_then(|edge| clearance.get(&edge).copied())
                    .unwrap_or(f64::INFINITY);
                if room < vehicle.params().min_gap {
                    debug!(
                        "Vehicle {} waits at {}: {:.1}m clear on the first road",
                        vehicle.id, request.origin, room
                    );
                } else {
                    if let Some(edge) = first {
                        clearance.insert(edge, -vehicle.params().length);
                    }
                    debug!(
                        "Vehicle {} departs {} over {} roads, cost {:.1}s",
                        vehicle.id,
                        request.origin,
                        route.edges.len(),
                        route.cost
                    );
                    vehicle.begin_route(route.edges);
                }
            }
            (VehicleStatus::Pending, Err(err)) => {
                debug!("Vehicle {} cannot depart: {}", vehicle.id, err);
                vehicle.strand(request.origin, now);
            }
            (VehicleStatus::Stranded { .. }, Err(_)) => {}
        }

        if arrived {
            self.finish_trip(request.vehicle);
        }
    }

    fn finish_trip(&mut self, id: VehicleId) {
        if let Some(vehicle) = self.vehicles.remove(&id) {
            self.retired_distance += vehicle.odometer();
            self.stats.completed += 1;
            debug!(
                "Vehicle {} arrived at {} after {:.1}m",
                id,
                vehicle.destination,
                vehicle.odometer()
            );
        }
    }

    /// Finds the nearest vehicle ahead of every active vehicle on its edge
    ///
    /// Vehicles at the same position are ranked by id; the lower id follows.
    fn update_leaders(&mut self) {
        let mut lanes: FxHashMap<RoadId, Lane> = FxHashMap::default();
        for vehicle in self.vehicles.values() {
            if let Some(edge) = vehicle.current_edge() {
                lanes
                    .entry(edge)
                    .or_insert_with(SortedVec::new)
                    .insert((OrderedFloat(vehicle.position()), vehicle.id));
            }
        }

        let mut leaders = Vec::with_capacity(self.vehicles.len());
        for vehicle in self.vehicles.values() {
            let Some(edge) = vehicle.current_edge() else {
                continue;
            };
            let leader = lanes.get(&edge).and_then(|lane| {
                let entries: &[(OrderedFloat<f64>, VehicleId)] = lane;
                let own = entries
                    .binary_search(&(OrderedFloat(vehicle.position()), vehicle.id))
                    .ok()?;
                let (pos, leader_id) = entries.get(own + 1)?;
                let leader = self.vehicles.get(leader_id)?;
                Some(LeaderInfo {
                    leader: *leader_id,
                    gap: pos.0 - vehicle.position() - leader.params().length,
                    leader_speed: leader.speed(),
                })
            });
            leaders.push((vehicle.id, leader));
        }

        for (id, leader) in leaders {
            if let Some(vehicle) = self.vehicles.get_mut(&id) {
                vehicle.set_leader(leader);
            }
        }
    }

    /// Integrates every active vehicle; returns the non-trivial outcomes
    fn update_vehicles(&mut self, dt: f64, now: f64) -> Vec<(VehicleId, VehicleUpdateResult)> {
        let network = &self.network;
        let congestion = &self.congestion;
        let occupancy = &self.occupancy;
        let config = &self.config;
        let advance = |vehicle: &mut Vehicle| {
            let result = vehicle.advance(dt, now, network, congestion, occupancy, config);
            (vehicle.id, result)
        };

        #[cfg(feature = "parallel")]
        let results: Vec<(VehicleId, VehicleUpdateResult)> = {
            use rayon::prelude::*;
            self.vehicles
                .par_iter_mut()
                .map(|(_, vehicle)| vehicle)
                .filter(|vehicle| vehicle.is_active())
                .map(advance)
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<(VehicleId, VehicleUpdateResult)> = self
            .vehicles
            .values_mut()
            .filter(|vehicle| vehicle.is_active())
            .map(advance)
            .collect();

        results
            .into_iter()
            .filter(|(_, result)| *result != VehicleUpdateResult::Continue)
            .collect()
    }

    fn process_results(&mut self, results: Vec<(VehicleId, VehicleUpdateResult)>) {
        for (id, result) in results {
            match result {
                VehicleUpdateResult::Completed => self.finish_trip(id),
                VehicleUpdateResult::Stranded => {
                    info!("Vehicle {} stranded at t={:.1}s", id, self.time);
                }
                VehicleUpdateResult::Continue => {}
            }
        }
    }

    fn refresh_stats(&mut self) {
        let mut pending = 0;
        let mut active = 0;
        let mut stranded = 0;
        let mut speed_sum = 0.0;
        let mut distance = self.retired_distance;

        for vehicle in self.vehicles.values() {
            match vehicle.status() {
                VehicleStatus::Pending => pending += 1,
                VehicleStatus::Active => {
                    active += 1;
                    speed_sum += vehicle.speed();
                }
                VehicleStatus::Stranded { .. } => stranded += 1,
            }
            distance += vehicle.odometer();
        }

        self.stats.pending = pending;
        self.stats.active = active;
        self.stats.stranded = stranded;
        self.stats.average_speed = if active > 0 {
            speed_sum / active as f64
        } else {
            0.0
        };
        self.stats.total_distance = distance;
    }

    /// Asks the spawn policy for trips to replace finished ones
    fn top_up_fleet(&mut self) {
        if self.fleet.is_none() {
            return;
        }

        let (mut cars, mut trucks) = (0, 0);
        for vehicle in self.vehicles.values() {
            match vehicle.vehicle_type {
                VehicleType::Car => cars += 1,
                VehicleType::Truck => trucks += 1,
            }
        }
        let nodes: Vec<IntersectionId> = self.network.nodes().map(|(id, _)| id).collect();

        let requests = match self.fleet.as_mut() {
            Some(fleet) => fleet.top_up(&nodes, cars, trucks),
            None => return,
        };
        for request in requests {
            if let Err(err) =
                self.spawn_vehicle(request.vehicle_type, request.source, request.destination)
            {
                warn!("Fleet spawn rejected: {}", err);
            }
        }
    }

    fn build_snapshot(&self) -> SimSnapshot {
        let vehicles = self
            .vehicles
            .values()
            .filter_map(|vehicle| {
                let edge = vehicle.current_edge()?;
                let key = self.network.endpoints(edge)?;
                let road = self.network.road(edge)?;
                let start = self.network.intersection_position(key.from)?;
                let end = self.network.intersection_position(key.to)?;
                Some(SimSnapshotItem {
                    vehicle: vehicle.id,
                    vehicle_type: vehicle.vehicle_type,
                    edge,
                    key,
                    position: vehicle.position(),
                    location: start.lerp(&end, vehicle.position() / road.length()),
                    speed: vehicle.speed(),
                    acceleration: vehicle.acceleration(),
                })
            })
            .collect();

        SimSnapshot {
            tick: self.tick,
            time: self.time,
            vehicles,
            stats: self.stats.clone(),
        }
    }

    /// Logs a summary of the current state
    pub fn log_summary(&self) {
        let stats = &self.stats;
        info!("=== Traffic Simulation Summary ===");
        info!("Time: {:.2}s (tick {})", self.time, self.tick);
        info!(
            "Intersections: {}, Roads: {} ({} open)",
            self.network.node_count(),
            self.network.edge_count(),
            self.network.open_edge_count()
        );
        info!(
            "Vehicles: {} pending, {} active, {} stranded",
            stats.pending, stats.active, stats.stranded
        );
        info!(
            "Trips: {} spawned, {} completed, {} failed",
            stats.spawned, stats.completed, stats.failed
        );
        info!(
            "Average speed: {:.2} m/s, distance driven: {:.0} m",
            stats.average_speed, stats.total_distance
        );
        info!(
            "Re-routes: {} ({:.1}s saved), events applied: {}, clamped inputs: {}",
            stats.reroutes, stats.reroute_time_saved, stats.events_applied, stats.clamped_inputs
        );
    }

    /// Logs the end-of-run report
    pub fn log_final_report(&self) {
        let stats = &self.stats;
        info!("=== SIMULATION COMPLETE ===");
        info!("Total vehicles spawned: {}", stats.spawned);
        info!("Total trips completed: {}", stats.completed);
        info!("Failed trips: {}", stats.failed);
        info!("Active vehicles: {}", stats.in_flight());
        info!("Total intersections: {}", self.network.node_count());
        info!("Total roads: {}", self.network.edge_count());
        info!("Success rate: {:.1}%", stats.success_rate());
    }
}

/// Travel time of the rest of a route; infinite if any edge is closed
fn remaining_cost(
    network: &RoadNetwork,
    congestion: &CongestionModel,
    edges: &[RoadId],
    desired_speed: f64,
) -> f64 {
    edges
        .iter()
        .map(|edge| match network.road(*edge) {
            Some(road) if network.is_open(*edge) => congestion.vehicle_cost(road, desired_speed),
            _ => f64::INFINITY,
        })
        .sum()
}
