//! Aggregate statistics and per-tick snapshots

use super::types::{EdgeKey, Position, RoadId, VehicleId, VehicleType};

/// Aggregate statistics of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub spawned: u64,
    /// Trips that reached their destination
    pub completed: u64,
    /// Vehicles removed after staying stranded past the timeout
    pub failed: u64,
    /// Waiting for their first route
    pub pending: usize,
    /// Driving on an edge
    pub active: usize,
    /// Currently without a route
    pub stranded: usize,
    /// Mean speed of active vehicles
    pub average_speed: f64,
    /// Distance driven by all vehicles, including removed ones
    pub total_distance: f64,
    /// Applied re-routes that changed a vehicle's path
    pub reroutes: u64,
    /// Sum of remaining-cost reductions gained by re-routing (s)
    pub reroute_time_saved: f64,
    /// Physical inputs that had to be clamped
    pub clamped_inputs: u64,
    pub events_applied: u64,
}

impl Stats {
    /// Vehicles still owned by the simulation
    pub fn in_flight(&self) -> usize {
        self.pending + self.active + self.stranded
    }

    /// Every spawned vehicle is accounted for exactly once
    pub fn is_conserved(&self) -> bool {
        self.spawned == self.in_flight() as u64 + self.completed + self.failed
    }

    /// Completed trips as a percentage of finished trips
    pub fn success_rate(&self) -> f64 {
        let finished = self.completed + self.failed;
        if finished == 0 {
            0.0
        } else {
            self.completed as f64 / finished as f64 * 100.0
        }
    }
}

/// Read-only view of one active vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct SimSnapshotItem {
    pub vehicle: VehicleId,
    pub vehicle_type: VehicleType,
    pub edge: RoadId,
    pub key: EdgeKey,
    /// Distance along the edge
    pub position: f64,
    /// World coordinates, interpolated between the edge endpoints
    pub location: Position,
    pub speed: f64,
    pub acceleration: f64,
}

/// Everything an external consumer needs after a tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimSnapshot {
    pub tick: u64,
    pub time: f64,
    pub vehicles: Vec<SimSnapshotItem>,
    pub stats: Stats,
}
