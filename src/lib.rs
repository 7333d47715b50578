//! Traffic Flow Library
//!
//! A deterministic, tick-based traffic simulation: vehicles follow the
//! Intelligent Driver Model along routes computed over a congestion-aware
//! road graph that changes while the simulation runs.

pub mod simulation;
