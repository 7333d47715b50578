//! Spawn policy that keeps a target number of cars and trucks on the road

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::config::FleetConfig;
use super::types::{IntersectionId, VehicleType};

/// Tries before giving up on drawing two distinct intersections
const MAX_PAIR_ATTEMPTS: usize = 16;

/// A trip the fleet wants spawned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    pub vehicle_type: VehicleType,
    pub source: IntersectionId,
    pub destination: IntersectionId,
}

#[derive(Debug, Clone)]
pub struct FleetManager {
    config: FleetConfig,
    rng: StdRng,
}

impl FleetManager {
    pub fn new(config: FleetConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn reseed(&mut self, seed: u64) {
        self.config.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Trips needed to bring the in-flight counts back to the targets
    pub fn top_up(
        &mut self,
        nodes: &[IntersectionId],
        cars_in_flight: usize,
        trucks_in_flight: usize,
    ) -> Vec<SpawnRequest> {
        let mut requests = Vec::new();
        let wanted = [
            (VehicleType::Car, self.config.cars.saturating_sub(cars_in_flight)),
            (VehicleType::Truck, self.config.trucks.saturating_sub(trucks_in_flight)),
        ];

        for (vehicle_type, missing) in wanted {
            for _ in 0..missing {
                let Some((source, destination)) = self.random_distinct_pair(nodes) else {
                    return requests;
                };
                requests.push(SpawnRequest {
                    vehicle_type,
                    source,
                    destination,
                });
            }
        }
        requests
    }

    fn random_distinct_pair(
        &mut self,
        nodes: &[IntersectionId],
    ) -> Option<(IntersectionId, IntersectionId)> {
        if nodes.len() < 2 {
            return None;
        }
        let source = *nodes.choose(&mut self.rng)?;
        for _ in 0..MAX_PAIR_ATTEMPTS {
            let destination = *nodes.choose(&mut self.rng)?;
            if destination != source {
                return Some((source, destination));
            }
        }
        None
    }
}
