//! Gated DDR strobe synthesis.
//!
//! The data strobe is not replayed from the trace. A [`GateWatcher`]
//! follows a "transfer active" signal and, for every pulse on it, spawns an
//! independent [`StrobeBurst`] whose length and spacing are computed from
//! the pulse width and the extracted timing parameters. Between bursts the
//! strobe rests at its quiescent level.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ReplayResult;
use crate::event::{is_rising, Event};
use crate::logic::BitVector;
use crate::timeline::{Step, Timeline, TimelineContext};
use crate::timing::TimingParams;
use crate::trace::SignalRecord;
use crate::types::SimTime;

/// Where the synthesized strobe is written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrobeOutputs {
    /// True strobe binding (e.g. `dqs`)
    pub strobe: String,
    /// Complement binding (e.g. `dqs_n`)
    #[serde(default)]
    pub complement: Option<String>,
}

impl StrobeOutputs {
    pub fn new(strobe: impl Into<String>) -> Self {
        Self {
            strobe: strobe.into(),
            complement: None,
        }
    }

    pub fn with_complement(mut self, complement: impl Into<String>) -> Self {
        self.complement = Some(complement.into());
        self
    }

    fn drive(&self, ctx: &mut TimelineContext<'_>, high: bool) -> ReplayResult<()> {
        ctx.drive(&self.strobe, &BitVector::level(high))?;
        if let Some(complement) = &self.complement {
            ctx.drive(complement, &BitVector::level(!high))?;
        }
        Ok(())
    }
}

/// Geometry of one strobe burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurstShape {
    /// Toggles requested by the transfer window
    pub toggle_count: u64,
    /// Spacing between toggles
    pub toggle_interval: SimTime,
    /// Span from burst start within which toggles may occur
    pub active_duration: SimTime,
}

impl BurstShape {
    /// Computes the burst for a transfer window of `window_offset`.
    ///
    /// Returns `None` for an empty window. Integer arithmetic throughout:
    /// `toggle_count = 1 + floor(window * phases * rate / (period * 2))`,
    /// `active_duration = period / (phases * rate) * (phases * rate - 1)`,
    /// `toggle_interval = period / phases`.
    pub fn compute(window_offset: SimTime, timing: &TimingParams) -> Option<Self> {
        if window_offset == 0 {
            return None;
        }
        let slots = timing.phase_count * timing.data_rate;
        Some(Self {
            toggle_count: 1 + window_offset * slots / (timing.clock_period * 2),
            toggle_interval: timing.clock_period / timing.phase_count,
            active_duration: timing.clock_period / slots * (slots - 1),
        })
    }

    /// Toggles that actually fire: those whose offset `k * toggle_interval`
    /// lies strictly inside the active duration.
    pub fn planned_toggles(&self) -> u64 {
        if self.toggle_interval == 0 || self.active_duration == 0 {
            return 0;
        }
        let fit = (self.active_duration + self.toggle_interval - 1) / self.toggle_interval;
        self.toggle_count.min(fit)
    }

    /// Offsets from burst start of the toggles that fire.
    pub fn toggle_offsets(&self) -> impl Iterator<Item = SimTime> + '_ {
        (0..self.planned_toggles()).map(move |k| k * self.toggle_interval)
    }
}

/// One strobe burst: alternating true/complement toggles, then back to the
/// quiescent level (strobe low, complement high).
#[derive(Debug)]
pub struct StrobeBurst {
    name: String,
    outputs: StrobeOutputs,
    shape: BurstShape,
    planned: u64,
    next_toggle: u64,
    /// Offset of the most recent toggle from burst start
    elapsed: SimTime,
    high: bool,
}

impl StrobeBurst {
    pub fn new(outputs: StrobeOutputs, shape: BurstShape) -> Self {
        let planned = shape.planned_toggles();
        if planned < shape.toggle_count {
            debug!(
                requested = shape.toggle_count,
                planned,
                active = shape.active_duration,
                "burst truncated to its active duration"
            );
        }
        Self {
            name: format!("strobe:{}", outputs.strobe),
            outputs,
            shape,
            planned,
            next_toggle: 0,
            elapsed: 0,
            high: false,
        }
    }
}

impl Timeline for StrobeBurst {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut TimelineContext<'_>) -> ReplayResult<Step> {
        if self.next_toggle < self.planned {
            let high = self.next_toggle % 2 == 0;
            self.outputs.drive(ctx, high)?;
            self.high = high;
            self.next_toggle += 1;

            if self.next_toggle < self.planned {
                self.elapsed += self.shape.toggle_interval;
                return Ok(Step::Wait(self.shape.toggle_interval));
            }
            if !self.high {
                return Ok(Step::Done);
            }
            let rest = self.shape.active_duration - self.elapsed;
            self.elapsed = self.shape.active_duration;
            return Ok(Step::Wait(rest));
        }

        if self.high {
            self.outputs.drive(ctx, false)?;
            self.high = false;
        }
        Ok(Step::Done)
    }
}

/// Follows a gating signal and spawns a [`StrobeBurst`] at each rising
/// edge.
///
/// The transfer window of a pulse is the time from its rising edge until
/// the gating signal is next a definite low. A pulse that never falls emits
/// no burst. A first recorded high with no known prior level is not an
/// edge.
#[derive(Debug)]
pub struct GateWatcher {
    name: String,
    events: Vec<Event>,
    cursor: usize,
    last_time: SimTime,
    level: Option<bool>,
    pending: Option<usize>,
    timing: TimingParams,
    outputs: StrobeOutputs,
}

impl GateWatcher {
    pub fn new(record: &SignalRecord, timing: TimingParams, outputs: StrobeOutputs) -> Self {
        Self {
            name: format!("gate:{}", record.name),
            events: record.events().to_vec(),
            cursor: 0,
            last_time: 0,
            level: None,
            pending: None,
            timing,
            outputs,
        }
    }

    fn window_after(&self, idx: usize) -> Option<SimTime> {
        let rise = self.events[idx].time;
        self.events[idx + 1..]
            .iter()
            .find(|e| e.level() == Some(false))
            .map(|e| e.time - rise)
    }

    fn on_rise(&mut self, idx: usize, ctx: &mut TimelineContext<'_>) {
        let Some(window) = self.window_after(idx) else {
            debug!(gate = %self.name, time = ctx.now(), "gate never falls, no burst");
            return;
        };
        match BurstShape::compute(window, &self.timing) {
            Some(shape) => {
                debug!(
                    gate = %self.name,
                    time = ctx.now(),
                    window,
                    toggles = shape.toggle_count,
                    "burst"
                );
                ctx.spawn(Box::new(StrobeBurst::new(self.outputs.clone(), shape)));
            }
            None => debug!(gate = %self.name, time = ctx.now(), "empty transfer window"),
        }
    }
}

impl Timeline for GateWatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut TimelineContext<'_>) -> ReplayResult<Step> {
        if let Some(idx) = self.pending.take() {
            let level = self.events[idx].level();
            if is_rising(self.level, level) {
                self.on_rise(idx, ctx);
            }
            self.level = level;
        }

        let Some(event) = self.events.get(self.cursor) else {
            return Ok(Step::Done);
        };
        let wait = event.time - self.last_time;
        self.last_time = event.time;
        self.pending = Some(self.cursor);
        self.cursor += 1;
        Ok(Step::Wait(wait))
    }
}
