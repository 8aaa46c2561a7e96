//! Built-in timelines.
//!
//! # Available Timelines
//!
//! - [`ClockTimeline`] - Free-running true/complement clock (unbounded)
//! - [`ReplayTimeline`] - Replays one recorded signal onto one binding
//! - [`GateWatcher`] - Follows a gating signal and spawns strobe bursts
//! - [`StrobeBurst`] - One DDR strobe burst for one transfer window

pub mod clock;
pub mod replay;
pub mod strobe;

pub use clock::ClockTimeline;
pub use replay::ReplayTimeline;
pub use strobe::{BurstShape, GateWatcher, StrobeBurst, StrobeOutputs};
