//! Free-running clock synthesis.
//!
//! The `ClockTimeline` produces its own periodic edges at a computed half
//! period instead of replaying the recorded clock.

use crate::error::{ReplayError, ReplayResult};
use crate::logic::BitVector;
use crate::timeline::{Step, Timeline, TimelineContext};
use crate::types::SimTime;

/// A two-phase clock: `LOW` at its start instant, then a toggle every
/// `half_period`, forever.
///
/// The optional complement output is written in the same resume as the true
/// output, so both reflect each transition at the identical instant.
///
/// # Example
///
/// ```rust
/// use wavedrive::timelines::ClockTimeline;
///
/// let clock = ClockTimeline::new("ck", 5).unwrap().with_complement("ck_n");
/// assert_eq!(clock.half_period(), 5);
/// ```
#[derive(Debug)]
pub struct ClockTimeline {
    name: String,
    output: String,
    complement: Option<String>,
    half_period: SimTime,
    /// Level driven at the next resume
    level: bool,
}

impl ClockTimeline {
    /// Creates a clock driving `output`. A zero half period is rejected.
    pub fn new(output: impl Into<String>, half_period: SimTime) -> ReplayResult<Self> {
        let output = output.into();
        if half_period == 0 {
            return Err(ReplayError::InvalidTiming(format!(
                "clock {output} has a zero half period"
            )));
        }
        Ok(Self {
            name: format!("clock:{output}"),
            output,
            complement: None,
            half_period,
            level: false,
        })
    }

    /// Also drives `complement` with the inverse level.
    pub fn with_complement(mut self, complement: impl Into<String>) -> Self {
        self.complement = Some(complement.into());
        self
    }

    pub fn half_period(&self) -> SimTime {
        self.half_period
    }
}

impl Timeline for ClockTimeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_bounded(&self) -> bool {
        false
    }

    fn resume(&mut self, ctx: &mut TimelineContext<'_>) -> ReplayResult<Step> {
        ctx.drive(&self.output, &BitVector::level(self.level))?;
        if let Some(complement) = &self.complement {
            ctx.drive(complement, &BitVector::level(!self.level))?;
        }
        self.level = !self.level;
        Ok(Step::Wait(self.half_period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingRegistry, RecordingSink};
    use crate::scheduler::Scheduler;

    #[test]
    fn test_zero_half_period_rejected() {
        assert!(matches!(
            ClockTimeline::new("ck", 0),
            Err(ReplayError::InvalidTiming(_))
        ));
    }

    #[test]
    fn test_clock_waveform() {
        let ck = RecordingSink::new();
        let ck_n = RecordingSink::new();
        let bindings = BindingRegistry::new()
            .with("ck", ck.clone())
            .with("ck_n", ck_n.clone());
        let mut sched = Scheduler::new(bindings);

        let clock = ClockTimeline::new("ck", 3).unwrap().with_complement("ck_n");
        assert!(!clock.is_bounded());
        sched.spawn(Box::new(clock));
        sched.run_until(10).unwrap();

        assert_eq!(ck.times(), vec![0, 3, 6, 9]);
        assert_eq!(ck.values(), vec!["0", "1", "0", "1"]);
        assert_eq!(ck_n.times(), ck.times());
        assert_eq!(ck_n.values(), vec!["1", "0", "1", "0"]);
    }

    #[test]
    fn test_clock_without_complement() {
        let ck = RecordingSink::new();
        let mut sched = Scheduler::new(BindingRegistry::new().with("Clk", ck.clone()));
        sched.spawn(Box::new(ClockTimeline::new("Clk", 5).unwrap()));
        sched.run_until(12).unwrap();

        assert_eq!(ck.times(), vec![0, 5, 10]);
        assert_eq!(sched.stats().writes, 3);
    }
}
