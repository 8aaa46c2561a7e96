//! Timing extraction.
//!
//! Timing parameters are measured from the trace rather than configured:
//! the reference capture may come from a non-nominal or jittered source,
//! and the replay follows whatever the trace recorded.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReplayError, ReplayResult};
use crate::event::is_rising;
use crate::logic::BitVector;
use crate::trace::Trace;
use crate::types::SimTime;

/// Returns the value held by `name` at its final recorded event.
pub fn last_value(trace: &Trace, name: &str) -> ReplayResult<BitVector> {
    let record = trace.require(name)?;
    record
        .last()
        .map(|e| e.value.clone())
        .ok_or_else(|| ReplayError::EmptySignal(name.to_string()))
}

/// Measures the clock period as the delta between the first two rising
/// edges of `name`, in scan order. Later edges are not consulted.
///
/// Undefined values before the clock first settles are skipped. Once a
/// definite value has been seen, an undefined value before the second
/// rising edge fails with [`ReplayError::UndefinedValue`].
pub fn clock_period(trace: &Trace, name: &str) -> ReplayResult<SimTime> {
    let record = trace.require(name)?;

    let mut prev: Option<bool> = None;
    let mut first_edge: Option<SimTime> = None;

    for event in record.events() {
        let level = event.level();
        if level.is_none() {
            if prev.is_none() {
                continue;
            }
            return Err(ReplayError::UndefinedValue {
                signal: name.to_string(),
                time: event.time,
            });
        }

        if is_rising(prev, level) {
            match first_edge {
                None => first_edge = Some(event.time),
                Some(first) => {
                    let period = event.time - first;
                    debug!(signal = name, period, "measured clock period");
                    return Ok(period);
                }
            }
        }
        prev = level;
    }

    Err(ReplayError::InsufficientEdges {
        signal: name.to_string(),
        found: usize::from(first_edge.is_some()),
    })
}

/// Reads the phase count: the final value of `name` as an unsigned integer.
pub fn phase_count(trace: &Trace, name: &str) -> ReplayResult<u64> {
    let value = last_value(trace, name)?;
    let count = value.to_u64().ok_or_else(|| ReplayError::UndefinedValue {
        signal: name.to_string(),
        time: trace.get(name).and_then(|r| r.last()).map_or(0, |e| e.time),
    })?;
    if count == 0 {
        return Err(ReplayError::InvalidTiming(format!(
            "phase count signal {name} is zero"
        )));
    }
    Ok(count)
}

/// Scalar timing parameters of a replay run. Immutable once extracted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingParams {
    /// Duration between two reference clock rising edges
    pub clock_period: SimTime,
    /// Internal phases per external clock period
    pub phase_count: u64,
    /// Transfers per strobe period (2 for double data rate)
    pub data_rate: u64,
}

impl TimingParams {
    /// Creates validated timing parameters.
    ///
    /// Rejects zero phase count or data rate, and clock periods shorter than
    /// the phase count (they would give a zero-length half period).
    pub fn new(clock_period: SimTime, phase_count: u64, data_rate: u64) -> ReplayResult<Self> {
        if phase_count == 0 {
            return Err(ReplayError::InvalidTiming("phase count is zero".into()));
        }
        if data_rate == 0 {
            return Err(ReplayError::InvalidTiming("data rate is zero".into()));
        }
        if clock_period < phase_count {
            return Err(ReplayError::InvalidTiming(format!(
                "clock period {clock_period} is shorter than phase count {phase_count}"
            )));
        }
        Ok(Self {
            clock_period,
            phase_count,
            data_rate,
        })
    }

    /// Measures clock period and phase count from the trace.
    pub fn extract(
        trace: &Trace,
        clock_signal: &str,
        phase_count_signal: &str,
        data_rate: u64,
    ) -> ReplayResult<Self> {
        let phase_count = phase_count(trace, phase_count_signal)?;
        let clock_period = clock_period(trace, clock_signal)?;
        Self::new(clock_period, phase_count, data_rate)
    }

    /// Half period of the synthesized device clock (`clock_period / phase_count`).
    pub fn half_period(&self) -> SimTime {
        self.clock_period / self.phase_count
    }
}
