//! Congestion model and per-edge occupancy bookkeeping
//!
//! Effective speed follows a tiered halving rule driven by road capacity x
//! and load N (vehicles on the edge during the previous tick):
//!
//! - `N <= x`        -> `v_free`
//! - `x < N <= 2x`   -> `v_free / 2`
//! - `2x < N <= 3x`  -> `v_free / 4`
//! - in general      -> `v_free / 2^(ceil(N/x) - 1)`
//!
//! `v_free` is the road speed limit, scaled down by an active incident.
//! Edge states are recomputed once per tick and read-only afterwards; the
//! dynamics pass writes occupancy into the next-tick buffer only.

use log::{debug, warn};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use super::config::CongestionConfig;
use super::road_network::{Road, RoadNetwork};
use super::types::RoadId;

/// Lowest accepted incident speed factor
pub const MIN_INCIDENT_FACTOR: f64 = 0.01;

/// Derived state of one directed edge for the current tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeState {
    /// Vehicles observed on the edge during the previous tick
    pub vehicles: u32,
    /// Speed a vehicle can expect on the edge
    pub effective_speed: f64,
    /// `effective_speed / speed_limit`, in (0, 1]
    pub congestion_factor: f64,
}

impl EdgeState {
    pub fn is_congested(&self) -> bool {
        self.congestion_factor < 1.0
    }
}

#[derive(Debug, Clone)]
pub struct CongestionModel {
    config: CongestionConfig,
    states: Vec<EdgeState>,
    incidents: FxHashMap<RoadId, f64>,
    last_tick: Option<u64>,
}

impl CongestionModel {
    /// Free-flowing states for every road of the network
    pub fn new(network: &RoadNetwork, config: CongestionConfig) -> Self {
        let mut model = Self {
            config,
            states: Vec::new(),
            incidents: FxHashMap::default(),
            last_tick: None,
        };
        let states: Vec<EdgeState> = network
            .edges()
            .map(|(_, road)| model.update_edge_state(road, 0))
            .collect();
        model.states = states;
        model
    }

    pub fn config(&self) -> &CongestionConfig {
        &self.config
    }

    /// Computes the state of a road carrying `occupancy` vehicles
    pub fn update_edge_state(&self, road: &Road, occupancy: u32) -> EdgeState {
        let limit = road.speed_limit();
        let factor = self.incidents.get(&road.id).copied().unwrap_or(1.0);
        let v_free = limit * factor;

        let effective_speed = if occupancy == 0 {
            v_free
        } else {
            let capacity = road.capacity(self.config.comfortable_spacing);
            let tier = occupancy.div_ceil(capacity);
            let exponent = tier.saturating_sub(1).min(1023) as i32;
            let halved = v_free * 2f64.powi(-exponent);
            halved.max(self.config.min_speed).min(v_free)
        };

        EdgeState {
            vehicles: occupancy,
            effective_speed,
            congestion_factor: effective_speed / limit,
        }
    }

    /// Travel time over a road in a given state
    pub fn cost(&self, state: &EdgeState, road: &Road) -> f64 {
        road.length() / state.effective_speed.max(f64::MIN_POSITIVE)
    }

    /// Travel time over a road using the current tick's state
    pub fn edge_cost(&self, road: &Road) -> f64 {
        self.cost(&self.state(road.id), road)
    }

    /// Travel time for a vehicle that never drives faster than `desired_speed`
    pub fn vehicle_cost(&self, road: &Road, desired_speed: f64) -> f64 {
        let speed = self.state(road.id).effective_speed.min(desired_speed);
        road.length() / speed.max(f64::MIN_POSITIVE)
    }

    pub fn state(&self, road: RoadId) -> EdgeState {
        self.states.get(road.0).copied().unwrap_or(EdgeState {
            vehicles: 0,
            effective_speed: self.config.min_speed,
            congestion_factor: 0.0,
        })
    }

    /// Recomputes every edge state from the previous tick's occupancy
    ///
    /// Returns false without touching anything if this tick was already
    /// processed.
    pub fn update(&mut self, tick: u64, network: &RoadNetwork, occupancy: &[u32]) -> bool {
        if self.last_tick == Some(tick) {
            return false;
        }
        self.last_tick = Some(tick);

        let states: Vec<EdgeState> = network
            .edges()
            .map(|(id, road)| {
                let count = occupancy.get(id.0).copied().unwrap_or(0);
                self.update_edge_state(road, count)
            })
            .collect();
        self.states = states;
        true
    }

    /// Caps the free-flow speed of a road by `speed_factor`
    pub fn set_incident(&mut self, road: &Road, speed_factor: f64) {
        let factor = if speed_factor.is_finite() {
            speed_factor.clamp(MIN_INCIDENT_FACTOR, 1.0)
        } else {
            MIN_INCIDENT_FACTOR
        };
        if factor != speed_factor {
            warn!(
                "Incident factor {} on {} clamped to {}",
                speed_factor, road.id, factor
            );
        }
        debug!("Incident on {}: speed factor {}", road.id, factor);
        self.incidents.insert(road.id, factor);
        self.refresh(road);
    }

    pub fn clear_incident(&mut self, road: &Road) {
        if self.incidents.remove(&road.id).is_some() {
            self.refresh(road);
        }
    }

    /// Drops all incidents and returns to free flow
    pub fn reset(&mut self, network: &RoadNetwork) {
        *self = Self::new(network, self.config.clone());
    }

    /// Applies an incident change to the current state immediately
    fn refresh(&mut self, road: &Road) {
        if let Some(current) = self.states.get(road.id.0).copied() {
            self.states[road.id.0] = self.update_edge_state(road, current.vehicles);
        }
    }
}

/// Double-buffered per-edge vehicle counts
///
/// `previous` is what the congestion model reads at the start of a tick;
/// `next` is filled concurrently by the dynamics pass.
#[derive(Debug)]
pub struct OccupancyBuffer {
    previous: Vec<u32>,
    next: Vec<AtomicU32>,
}

impl OccupancyBuffer {
    pub fn new(edges: usize) -> Self {
        Self {
            previous: vec![0; edges],
            next: (0..edges).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Counts from the last completed tick
    pub fn previous(&self) -> &[u32] {
        &self.previous
    }

    /// Records one vehicle on `road` for the next tick
    pub fn record(&self, road: RoadId) {
        if let Some(counter) = self.next.get(road.0) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Publishes the next-tick counts and clears the accumulator.
    /// Returns the total number of recorded vehicles.
    pub fn swap(&mut self) -> u64 {
        let mut total = 0u64;
        for (slot, counter) in self.previous.iter_mut().zip(&self.next) {
            *slot = counter.swap(0, Ordering::Relaxed);
            total += u64::from(*slot);
        }
        total
    }

    pub fn clear(&mut self) {
        self.previous.iter_mut().for_each(|slot| *slot = 0);
        self.next.iter().for_each(|counter| counter.store(0, Ordering::Relaxed));
    }
}
