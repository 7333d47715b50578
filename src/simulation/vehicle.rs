//! Vehicle state and car-following dynamics
//!
//! Longitudinal motion uses the Intelligent Driver Model. The leader is not
//! stored as a link between vehicles: the orchestrator recomputes it every
//! tick from the ordered list of vehicles on each edge and hands over a
//! plain `LeaderInfo` value.

use log::debug;

use super::config::SimConfig;
use super::congestion::{CongestionModel, OccupancyBuffer};
use super::road_network::{Road, RoadNetwork};
use super::routing::StrategyKind;
use super::types::{
    IdmParams, IntersectionId, RoadId, VehicleId, VehicleType, STOP_LINE_TOLERANCE,
};

/// Smallest desired speed and gap fed into the IDM terms
const IDM_EPSILON: f64 = 1e-3;

/// Lifecycle of a vehicle still owned by the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleStatus {
    /// Spawned, waiting for its first route
    Pending,
    /// Driving along its route
    Active,
    /// No valid route; waiting at an intersection since `since`
    Stranded { since: f64 },
}

/// Result of a vehicle update indicating what the orchestrator should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    Continue,
    /// Reached the end of the last edge of its route
    Completed,
    /// The next edge is closed; the vehicle is waiting for a new route
    Stranded,
}

/// Nearest vehicle ahead on the same edge, as seen at the start of the tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderInfo {
    pub leader: VehicleId,
    /// Leader rear bumper minus own position
    pub gap: f64,
    pub leader_speed: f64,
}

/// IDM acceleration for a follower at `speed` wanting `desired`
///
/// `leader` is `(gap, leader_speed)`; `None` means open road and drops the
/// interaction term.
pub fn idm_acceleration(
    params: &IdmParams,
    speed: f64,
    desired: f64,
    leader: Option<(f64, f64)>,
) -> f64 {
    let v = speed.max(0.0);
    let v0 = desired.max(IDM_EPSILON);
    let free = (v / v0).powf(params.exponent);

    let interaction = match leader {
        Some((gap, leader_speed)) => {
            let closing = v - leader_speed;
            let braking = 2.0 * (params.max_acceleration * params.comfortable_deceleration).sqrt();
            let desired_gap =
                params.min_gap + (v * params.time_headway + v * closing / braking).max(0.0);
            (desired_gap / gap.max(IDM_EPSILON)).powi(2)
        }
        None => 0.0,
    };

    params.max_acceleration * (1.0 - free - interaction)
}

/// A vehicle in the traffic simulation
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub vehicle_type: VehicleType,
    pub source: IntersectionId,
    pub destination: IntersectionId,
    params: IdmParams,
    /// Routing algorithm for this vehicle; `None` follows the simulation
    strategy: Option<StrategyKind>,
    status: VehicleStatus,
    route: Vec<RoadId>,
    route_index: usize,
    position: f64,
    speed: f64,
    acceleration: f64,
    /// Intersection the vehicle waits at while pending or stranded
    anchor: IntersectionId,
    leader: Option<LeaderInfo>,
    needs_reroute: bool,
    since_reroute: f64,
    odometer: f64,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        vehicle_type: VehicleType,
        source: IntersectionId,
        destination: IntersectionId,
    ) -> Self {
        Self {
            id,
            vehicle_type,
            source,
            destination,
            params: vehicle_type.params(),
            strategy: None,
            status: VehicleStatus::Pending,
            route: Vec::new(),
            route_index: 0,
            position: 0.0,
            speed: 0.0,
            acceleration: 0.0,
            anchor: source,
            leader: None,
            needs_reroute: false,
            since_reroute: 0.0,
            odometer: 0.0,
        }
    }

    pub fn params(&self) -> &IdmParams {
        &self.params
    }

    pub fn strategy(&self) -> Option<StrategyKind> {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: Option<StrategyKind>) {
        self.strategy = strategy;
    }

    pub fn status(&self) -> VehicleStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == VehicleStatus::Active
    }

    pub fn is_stranded(&self) -> bool {
        matches!(self.status, VehicleStatus::Stranded { .. })
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    pub fn odometer(&self) -> f64 {
        self.odometer
    }

    pub fn leader(&self) -> Option<LeaderInfo> {
        self.leader
    }

    pub fn route(&self) -> &[RoadId] {
        &self.route
    }

    pub fn needs_reroute(&self) -> bool {
        self.needs_reroute
    }

    /// Edge the vehicle is driving on, if active
    pub fn current_edge(&self) -> Option<RoadId> {
        if self.is_active() {
            self.route.get(self.route_index).copied()
        } else {
            None
        }
    }

    /// Edges still ahead after the current one
    pub fn remaining_edges(&self) -> &[RoadId] {
        self.route.get(self.route_index + 1..).unwrap_or(&[])
    }

    /// Intersection a new route has to start from
    pub fn route_origin(&self, network: &RoadNetwork) -> Option<IntersectionId> {
        match self.status {
            VehicleStatus::Pending | VehicleStatus::Stranded { .. } => Some(self.anchor),
            VehicleStatus::Active => self
                .current_edge()
                .and_then(|edge| network.endpoints(edge))
                .map(|key| key.to),
        }
    }

    /// Whether the routing phase should (re)compute a route this tick
    pub fn wants_route(&self, config: &SimConfig) -> bool {
        match self.status {
            VehicleStatus::Pending | VehicleStatus::Stranded { .. } => true,
            VehicleStatus::Active => {
                self.needs_reroute
                    || config
                        .reroute_interval
                        .is_some_and(|interval| self.since_reroute >= interval)
            }
        }
    }

    /// Starts driving a freshly computed route from its first edge
    pub fn begin_route(&mut self, route: Vec<RoadId>) {
        self.status = VehicleStatus::Active;
        self.route = route;
        self.route_index = 0;
        self.position = 0.0;
        self.speed = 0.0;
        self.acceleration = 0.0;
        self.leader = None;
        self.needs_reroute = false;
        self.since_reroute = 0.0;
    }

    /// Keeps the current edge and replaces everything after it
    pub fn splice_route(&mut self, tail: Vec<RoadId>) {
        if let Some(current) = self.current_edge() {
            self.route = std::iter::once(current).chain(tail).collect();
            self.route_index = 0;
        }
        self.needs_reroute = false;
        self.since_reroute = 0.0;
    }

    /// Resets the re-route timer after an unsuccessful attempt
    pub fn reroute_attempted(&mut self) {
        self.since_reroute = 0.0;
    }

    pub fn mark_for_reroute(&mut self) {
        self.needs_reroute = true;
    }

    /// Leaves the road network and waits at `at` for a new route
    pub fn strand(&mut self, at: IntersectionId, now: f64) {
        debug!("Vehicle {} stranded at {}", self.id, at);
        self.status = VehicleStatus::Stranded { since: now };
        self.anchor = at;
        self.route.clear();
        self.route_index = 0;
        self.position = 0.0;
        self.speed = 0.0;
        self.acceleration = 0.0;
        self.leader = None;
        self.needs_reroute = false;
    }

    pub fn set_leader(&mut self, leader: Option<LeaderInfo>) {
        self.leader = leader;
    }

    /// Integrates one tick of motion and handles edge transitions
    ///
    /// Reads only the edge states computed at the start of the tick and
    /// records the edge the vehicle ends on into the next-tick occupancy.
    pub fn advance(
        &mut self,
        dt: f64,
        now: f64,
        network: &RoadNetwork,
        congestion: &CongestionModel,
        occupancy: &OccupancyBuffer,
        config: &SimConfig,
    ) -> VehicleUpdateResult {
        self.since_reroute += dt;

        let Some(mut edge) = self.current_edge() else {
            return VehicleUpdateResult::Continue;
        };
        let mut road: &Road = match network.road(edge) {
            Some(road) if network.is_open(edge) => road,
            Some(road) => {
                self.strand(road.from, now);
                return VehicleUpdateResult::Stranded;
            }
            None => {
                self.strand(self.anchor, now);
                return VehicleUpdateResult::Stranded;
            }
        };

        let p = self.params;
        let mut desired = p.desired_speed.min(congestion.state(edge).effective_speed);
        let remaining = (road.length() - self.position).max(0.0);

        // Brake ahead of a slower (or closed) next edge
        if let Some(next) = self.route.get(self.route_index + 1).copied() {
            let next_open = network.is_open(next);
            if !next_open && remaining <= STOP_LINE_TOLERANCE {
                self.strand(road.to, now);
                return VehicleUpdateResult::Stranded;
            }
            let next_speed = if next_open {
                p.desired_speed.min(congestion.state(next).effective_speed)
            } else {
                0.0
            };
            let cap = (next_speed * next_speed + 2.0 * p.comfortable_deceleration * remaining).sqrt();
            desired = desired.min(cap);
        }

        let leader = self.leader.map(|info| (info.gap, info.leader_speed));
        let accel = idm_acceleration(&p, self.speed, desired, leader)
            .clamp(-p.max_deceleration, p.max_acceleration);

        let new_speed = (self.speed + accel * dt).clamp(0.0, p.desired_speed);
        let travelled = 0.5 * (self.speed + new_speed) * dt;
        self.acceleration = (new_speed - self.speed) / dt;
        self.speed = new_speed;
        self.position += travelled;
        self.odometer += travelled;

        while self.position >= road.length() {
            let excess = self.position - road.length();
            let Some(next) = self.route.get(self.route_index + 1).copied() else {
                self.position = road.length();
                self.odometer -= excess;
                return VehicleUpdateResult::Completed;
            };

            let next_road = match network.road(next) {
                Some(next_road) if network.is_open(next) => next_road,
                _ => {
                    self.odometer -= excess;
                    self.strand(road.to, now);
                    return VehicleUpdateResult::Stranded;
                }
            };

            debug!("Vehicle {} moves {} -> {}", self.id, edge, next);
            self.route_index += 1;
            self.position = excess;
            self.leader = None;
            edge = next;
            road = next_road;

            if config.reroute_on_congestion
                && congestion.state(next).is_congested()
                && self.since_reroute >= config.reroute_cooldown
            {
                self.needs_reroute = true;
            }
        }

        occupancy.record(edge);
        VehicleUpdateResult::Continue
    }
}
