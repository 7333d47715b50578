//! Road network: intersections and roads on top of the generic graph
//!
//! The network is normally produced by an external generator before the
//! simulation starts. `GridGenerator` is a small lattice layout used by the
//! headless runner and tests.

use log::warn;

use super::graph::{Graph, GraphError};
use super::types::{
    IntersectionId, Located, Position, RoadId, MIN_ROAD_LENGTH, MIN_SPEED_LIMIT,
};

/// The road network graph
pub type RoadNetwork = Graph<Intersection, Road>;

/// A node of the road network
#[derive(Debug, Clone)]
pub struct Intersection {
    pub id: IntersectionId,
    pub position: Position,
}

impl Located for Intersection {
    fn position(&self) -> Position {
        self.position
    }
}

/// A directed road segment between two intersections
#[derive(Debug, Clone)]
pub struct Road {
    pub id: RoadId,
    pub from: IntersectionId,
    pub to: IntersectionId,
    length: f64,
    lanes: u32,
    speed_limit: f64,
    clamped: bool,
}

impl Road {
    /// Builds a road, clamping out-of-range physical inputs
    pub fn new(
        id: RoadId,
        from: IntersectionId,
        to: IntersectionId,
        length: f64,
        lanes: u32,
        speed_limit: f64,
    ) -> Self {
        let mut clamped = false;

        let length = if length.is_finite() && length >= MIN_ROAD_LENGTH {
            length
        } else {
            warn!("Road {}: length {} clamped to {}", id, length, MIN_ROAD_LENGTH);
            clamped = true;
            MIN_ROAD_LENGTH
        };

        let speed_limit = if speed_limit.is_finite() && speed_limit >= MIN_SPEED_LIMIT {
            speed_limit
        } else {
            warn!(
                "Road {}: speed limit {} clamped to {}",
                id, speed_limit, MIN_SPEED_LIMIT
            );
            clamped = true;
            MIN_SPEED_LIMIT
        };

        let lanes = if lanes == 0 {
            warn!("Road {}: zero lanes clamped to 1", id);
            clamped = true;
            1
        } else {
            lanes
        };

        Self {
            id,
            from,
            to,
            length,
            lanes,
            speed_limit,
            clamped,
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn lanes(&self) -> u32 {
        self.lanes
    }

    /// Free-flow speed limit
    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }

    /// Number of vehicles the road carries before speeds start dropping
    pub fn capacity(&self, comfortable_spacing: f64) -> u32 {
        let per_lane = (self.length / comfortable_spacing.max(MIN_ROAD_LENGTH)).floor() as u32;
        self.lanes.saturating_mul(per_lane).max(1)
    }

    /// Whether any constructor input had to be clamped
    pub fn has_clamped_inputs(&self) -> bool {
        self.clamped
    }
}

impl Graph<Intersection, Road> {
    /// Adds an intersection at a position
    pub fn add_intersection(&mut self, position: Position) -> IntersectionId {
        let id = self.next_node_id();
        self.add_node(Intersection { id, position })
    }

    pub fn intersection_position(&self, id: IntersectionId) -> Option<Position> {
        self.node(id).map(|intersection| intersection.position)
    }

    /// Adds a one-way road whose length is the distance between its endpoints
    pub fn add_road(
        &mut self,
        from: IntersectionId,
        to: IntersectionId,
        lanes: u32,
        speed_limit: f64,
    ) -> Result<RoadId, GraphError> {
        let start = self
            .intersection_position(from)
            .ok_or(GraphError::UnknownNode(from))?;
        let end = self
            .intersection_position(to)
            .ok_or(GraphError::UnknownNode(to))?;
        self.add_road_with_length(from, to, start.distance(&end), lanes, speed_limit)
    }

    /// Adds a one-way road with an explicit length
    pub fn add_road_with_length(
        &mut self,
        from: IntersectionId,
        to: IntersectionId,
        length: f64,
        lanes: u32,
        speed_limit: f64,
    ) -> Result<RoadId, GraphError> {
        let id = self.next_edge_id();
        let road = Road::new(id, from, to, length, lanes, speed_limit);
        self.add_edge(from, to, road)
    }

    /// Adds a two-way road (two logical roads)
    pub fn add_two_way_road(
        &mut self,
        a: IntersectionId,
        b: IntersectionId,
        lanes: u32,
        speed_limit: f64,
    ) -> Result<(RoadId, RoadId), GraphError> {
        let forward = self.add_road(a, b, lanes, speed_limit)?;
        let backward = self.add_road(b, a, lanes, speed_limit)?;
        Ok((forward, backward))
    }

    /// Road payload by id, open or closed
    pub fn road(&self, id: RoadId) -> Option<&Road> {
        self.edge_by_id(id)
    }
}

/// Produces a road layout into an empty or partially built network
pub trait RoadGenerator {
    fn generate(&self, network: &mut RoadNetwork) -> Result<(), GraphError>;
}

/// Rectangular lattice of two-way streets
#[derive(Debug, Clone)]
pub struct GridGenerator {
    pub rows: usize,
    pub cols: usize,
    pub spacing: f64,
    pub lanes: u32,
    pub speed_limit: f64,
}

impl Default for GridGenerator {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            spacing: 200.0,
            lanes: 1,
            speed_limit: 13.9,
        }
    }
}

impl RoadGenerator for GridGenerator {
    fn generate(&self, network: &mut RoadNetwork) -> Result<(), GraphError> {
        let mut grid = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            let ids: Vec<IntersectionId> = (0..self.cols)
                .map(|col| {
                    network.add_intersection(Position::new(
                        col as f64 * self.spacing,
                        row as f64 * self.spacing,
                    ))
                })
                .collect();
            grid.push(ids);
        }

        // Connect grid horizontally
        for row in &grid {
            for pair in row.windows(2) {
                network.add_two_way_road(pair[0], pair[1], self.lanes, self.speed_limit)?;
            }
        }

        // Connect grid vertically
        for pair in grid.windows(2) {
            for (upper, lower) in pair[0].iter().zip(&pair[1]) {
                network.add_two_way_road(*upper, *lower, self.lanes, self.speed_limit)?;
            }
        }

        Ok(())
    }
}
