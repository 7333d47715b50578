//! Standalone traffic simulation module
//!
//! Everything needed to run a traffic simulation lives here: the road graph,
//! connectivity tracking, congestion, routing, vehicle dynamics, scheduled
//! events and the orchestrator that steps them. It runs headless and is
//! driven either by the console runner or directly from tests.

mod config;
mod congestion;
mod disjoint_set;
mod events;
mod fleet;
mod graph;
mod road_network;
mod routing;
mod stats;
mod types;
mod vehicle;
mod world;

pub use config::{CongestionConfig, FleetConfig, SimConfig};
pub use congestion::{CongestionModel, EdgeState, OccupancyBuffer, MIN_INCIDENT_FACTOR};
pub use disjoint_set::DisjointSet;
pub use events::{EventKind, TrafficEvent, TrafficEvents};
pub use fleet::{FleetManager, SpawnRequest};
pub use graph::{EdgeId, EdgeKey, Graph, GraphError, NodeId};
pub use road_network::{GridGenerator, Intersection, Road, RoadGenerator, RoadNetwork};
pub use routing::{AStarStrategy, DijkstraStrategy, Route, RouteError, RouteStrategy, StrategyKind};
pub use stats::{SimSnapshot, SimSnapshotItem, Stats};
pub use types::{
    IdmParams, IntersectionId, Located, Position, RoadId, VehicleId, VehicleType,
    MIN_ROAD_LENGTH, MIN_SPEED_LIMIT, STOP_LINE_TOLERANCE,
};
pub use vehicle::{idm_acceleration, LeaderInfo, Vehicle, VehicleStatus, VehicleUpdateResult};
pub use world::{SimError, Simulation};
