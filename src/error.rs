//! Engine error taxonomy.
//!
//! Setup errors (`SignalNotFound`, `EmptySignal`, `InsufficientEdges`,
//! `UndefinedValue`, `InvalidTiming`, `UnboundOutput`) are raised before any
//! timeline is spawned. `BindingRejected` is raised by a running timeline
//! and fails the whole run.

use thiserror::Error;

use crate::config::ConfigError;
use crate::trace::TraceError;
use crate::types::SimTime;

/// Errors produced by timing extraction, setup and replay.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("signal not found in trace: {0}")]
    SignalNotFound(String),

    #[error("signal {0} has no recorded events")]
    EmptySignal(String),

    #[error("signal {signal}: found {found} rising edge(s), need 2 to measure a period")]
    InsufficientEdges { signal: String, found: usize },

    #[error("signal {signal}: undefined value at {time}")]
    UndefinedValue { signal: String, time: SimTime },

    #[error("invalid timing: {0}")]
    InvalidTiming(String),

    #[error("no output binding registered for {0}")]
    UnboundOutput(String),

    #[error("binding {binding} rejected value at {time}: {reason}")]
    BindingRejected {
        binding: String,
        time: SimTime,
        reason: String,
    },

    #[error("timeline {0} was cancelled before completing")]
    Cancelled(String),

    #[error("timeline {0} failed")]
    TimelineFailed(String),

    #[error("cannot join unbounded timeline {0}")]
    UnboundedJoin(String),

    #[error("scheduler stalled at {time} with {pending} timeline(s) waiting on joins")]
    Stalled { time: SimTime, pending: usize },

    #[error("trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for engine operations.
pub type ReplayResult<T> = Result<T, ReplayError>;
