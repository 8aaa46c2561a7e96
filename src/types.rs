//! Core type definitions for the replay engine.
//!
//! This module defines the fundamental types used throughout the engine.

/// Simulation time unit (the integer time unit of the recorded trace).
///
/// Trace timestamps, waits and synthesized edges all use the same `SimTime`
/// representation, so replayed and synthesized signals share one timeline.
pub type SimTime = u64;

/// Unique identifier for a spawned timeline.
///
/// Identifiers are handed out in spawn order and double as the tie-break
/// key when two timelines wake at the same instant.
pub type TimelineId = u64;
