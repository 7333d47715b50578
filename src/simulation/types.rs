//! Core types for the traffic simulation
//!
//! Identifiers, positions and the per-type vehicle parameters.

use std::fmt;

pub use super::graph::{EdgeId, EdgeKey, NodeId};

/// Intersections are the nodes of the road network graph
pub type IntersectionId = NodeId;

/// Roads are the directed edges of the road network graph
pub type RoadId = EdgeId;

/// A unique identifier for a vehicle, assigned in spawn order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Type of vehicle in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleType {
    Car,
    Truck,
}

impl VehicleType {
    /// Physical and behavioural parameters for this vehicle type
    pub fn params(self) -> IdmParams {
        match self {
            VehicleType::Car => IdmParams {
                desired_speed: 30.0,
                max_acceleration: 1.5,
                comfortable_deceleration: 2.0,
                max_deceleration: 8.0,
                time_headway: 1.2,
                min_gap: 2.0,
                exponent: 4.0,
                length: 4.5,
            },
            VehicleType::Truck => IdmParams {
                desired_speed: 22.0,
                max_acceleration: 0.8,
                comfortable_deceleration: 1.5,
                max_deceleration: 6.0,
                time_headway: 1.8,
                min_gap: 3.0,
                exponent: 4.0,
                length: 12.0,
            },
        }
    }
}

/// Intelligent Driver Model parameters
///
/// Units are metres and seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdmParams {
    /// Speed the driver wants on an empty road
    pub desired_speed: f64,
    /// Maximum acceleration
    pub max_acceleration: f64,
    /// Comfortable braking (positive)
    pub comfortable_deceleration: f64,
    /// Physical braking limit (positive); never exceeded
    pub max_deceleration: f64,
    /// Desired time headway
    pub time_headway: f64,
    /// Minimum bumper-to-bumper gap at standstill
    pub min_gap: f64,
    /// Acceleration exponent
    pub exponent: f64,
    /// Vehicle length
    pub length: f64,
}

/// A 2D position in the simulation (metres)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn lerp(&self, other: &Position, t: f64) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Anything with a location in the plane (used by the A* heuristic)
pub trait Located {
    fn position(&self) -> Position;
}

/// Shortest road length accepted; shorter inputs are clamped
pub const MIN_ROAD_LENGTH: f64 = 1.0;

/// Lowest free-flow speed limit accepted; lower inputs are clamped
pub const MIN_SPEED_LIMIT: f64 = 0.1;

/// Distance from the edge end at which a vehicle facing a closed edge gives up
pub const STOP_LINE_TOLERANCE: f64 = 0.5;
