//! Simulation configuration

use super::routing::StrategyKind;

/// Tunables of the congestion model
#[derive(Debug, Clone, PartialEq)]
pub struct CongestionConfig {
    /// Road length per vehicle per lane before speeds start dropping (m)
    pub comfortable_spacing: f64,
    /// Floor for the effective speed of a congested edge (m/s)
    pub min_speed: f64,
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            comfortable_spacing: 25.0,
            min_speed: 0.1,
        }
    }
}

/// Target population for the built-in spawn policy
#[derive(Debug, Clone, PartialEq)]
pub struct FleetConfig {
    pub cars: usize,
    pub trucks: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Default tick length in seconds
    pub tick_duration: f64,
    /// Routing algorithm for all (re)routes
    pub strategy: StrategyKind,
    /// Seconds a vehicle may stay stranded before it is removed as failed
    pub stranded_timeout: f64,
    /// Re-route active vehicles every this many seconds, if set
    pub reroute_interval: Option<f64>,
    /// Re-route when entering an edge that is slower than its speed limit
    pub reroute_on_congestion: bool,
    /// Minimum seconds between congestion-triggered re-routes of a vehicle
    pub reroute_cooldown: f64,
    pub congestion: CongestionConfig,
    /// Built-in spawn policy; `None` leaves spawning to the caller
    pub fleet: Option<FleetConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_duration: 0.1,
            strategy: StrategyKind::AStar,
            stranded_timeout: 30.0,
            reroute_interval: None,
            reroute_on_congestion: false,
            reroute_cooldown: 3.0,
            congestion: CongestionConfig::default(),
            fleet: None,
        }
    }
}
