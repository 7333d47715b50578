//! Scheduled exogenous perturbations of the road network

use log::warn;

use super::types::EdgeKey;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    /// Remove the edge from the routable graph
    Close,
    /// Put a closed edge back
    Reopen,
    /// Scale the edge's free-flow speed by `speed_factor` in (0, 1]
    Incident { speed_factor: f64 },
    /// Lift an incident
    ClearIncident,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficEvent {
    /// Simulated time (s) at which the event fires
    pub at: f64,
    pub edge: EdgeKey,
    pub kind: EventKind,
}

impl TrafficEvent {
    pub fn new(at: f64, edge: EdgeKey, kind: EventKind) -> Self {
        Self { at, edge, kind }
    }

    pub fn close(at: f64, edge: EdgeKey) -> Self {
        Self::new(at, edge, EventKind::Close)
    }

    pub fn reopen(at: f64, edge: EdgeKey) -> Self {
        Self::new(at, edge, EventKind::Reopen)
    }

    pub fn incident(at: f64, edge: EdgeKey, speed_factor: f64) -> Self {
        Self::new(at, edge, EventKind::Incident { speed_factor })
    }
}

/// Time-ordered event log with an applied cursor
///
/// Events with equal trigger times keep their insertion order. Every event
/// is handed out exactly once by `take_due` until `rewind` re-arms the log.
#[derive(Debug, Clone, Default)]
pub struct TrafficEvents {
    events: Vec<TrafficEvent>,
    applied: usize,
}

impl TrafficEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schedule from any list of events
    pub fn from_events(events: impl IntoIterator<Item = TrafficEvent>) -> Self {
        let mut schedule = Self::new();
        for event in events {
            schedule.add_event(event);
        }
        schedule
    }

    /// Inserts an event after every event with the same or earlier time.
    /// An event whose time has already passed goes right after the applied
    /// prefix so it fires on the next tick.
    ///
    /// A non-finite trigger time is clamped: `NaN` and `-inf` fire at 0,
    /// `+inf` at `f64::MAX`. Returns whether the time was clamped.
    pub fn add_event(&mut self, mut event: TrafficEvent) -> bool {
        let clamped = !event.at.is_finite();
        if clamped {
            let at = if event.at == f64::INFINITY { f64::MAX } else { 0.0 };
            warn!(
                "{:?} on {} has trigger time {}, clamped to {}",
                event.kind, event.edge, event.at, at
            );
            event.at = at;
        }

        let pending = &self.events[self.applied..];
        let offset = pending.partition_point(|existing| existing.at <= event.at);
        self.events.insert(self.applied + offset, event);
        clamped
    }

    /// Events due at `now`, in schedule order; marks them applied
    pub fn take_due(&mut self, now: f64) -> Vec<TrafficEvent> {
        let start = self.applied;
        let due = self.events[start..].partition_point(|event| event.at <= now);
        self.applied += due;
        self.events[start..self.applied].to_vec()
    }

    /// Marks every event as pending again
    pub fn rewind(&mut self) {
        // Late insertions sit right after the applied prefix; restore time order
        self.events.sort_by(|a, b| a.at.total_cmp(&b.at));
        self.applied = 0;
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events not yet applied
    pub fn pending(&self) -> &[TrafficEvent] {
        &self.events[self.applied..]
    }

    pub fn applied_count(&self) -> usize {
        self.applied
    }
}
