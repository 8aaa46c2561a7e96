//! Recorded signal replay.
//!
//! A `ReplayTimeline` walks one signal's recorded events and applies each
//! value to an output binding at the recorded offset.

use tracing::trace;

use crate::error::ReplayResult;
use crate::event::Event;
use crate::logic::BitVector;
use crate::timeline::{Step, Timeline, TimelineContext};
use crate::trace::SignalRecord;
use crate::types::SimTime;

/// Replays a signal record onto a binding.
///
/// Waits are computed between consecutive events, and the first wait is
/// measured from the timeline's start rather than from the capture's
/// absolute clock. An optional extra delay is added to every wait.
///
/// The event sequence is consumed as it is replayed; a replay cannot be
/// restarted.
#[derive(Debug)]
pub struct ReplayTimeline {
    name: String,
    binding: String,
    events: std::vec::IntoIter<Event>,
    last_time: SimTime,
    extra_delay: SimTime,
    /// Value due at the next resume
    pending: Option<BitVector>,
}

impl ReplayTimeline {
    /// Creates a replay of `record` onto `binding`.
    pub fn new(record: &SignalRecord, binding: impl Into<String>) -> Self {
        let binding = binding.into();
        Self {
            name: format!("replay:{}->{}", record.name, binding),
            binding,
            events: record.events().to_vec().into_iter(),
            last_time: 0,
            extra_delay: 0,
            pending: None,
        }
    }

    /// Adds `delay` to every wait, skewing this signal against the others.
    pub fn with_delay(mut self, delay: SimTime) -> Self {
        self.extra_delay = delay;
        self
    }

    /// Events not yet scheduled.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl Timeline for ReplayTimeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut TimelineContext<'_>) -> ReplayResult<Step> {
        if let Some(value) = self.pending.take() {
            trace!(binding = %self.binding, time = ctx.now(), %value, "apply");
            ctx.drive(&self.binding, &value)?;
        }

        match self.events.next() {
            Some(event) => {
                let wait = event.time - self.last_time + self.extra_delay;
                self.last_time = event.time;
                self.pending = Some(event.value);
                Ok(Step::Wait(wait))
            }
            None => Ok(Step::Done),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingRegistry, RecordingSink};
    use crate::scheduler::Scheduler;

    fn replay(record: &SignalRecord, delay: SimTime) -> RecordingSink {
        let sink = RecordingSink::new();
        let mut sched = Scheduler::new(BindingRegistry::new().with("out", sink.clone()));
        let handle = sched.spawn(Box::new(ReplayTimeline::new(record, "out").with_delay(delay)));
        sched.join_all(&[handle]).unwrap();
        sink
    }

    #[test]
    fn test_replay_relative_offsets() {
        let record =
            SignalRecord::from_pairs("TOP.WEn", 1, &[(5, "0"), (10, "1"), (20, "0")]).unwrap();
        let sink = replay(&record, 0);

        assert_eq!(sink.times(), vec![5, 10, 20]);
        assert_eq!(sink.values(), vec!["0", "1", "0"]);
    }

    #[test]
    fn test_replay_extra_delay_added_to_every_wait() {
        let record =
            SignalRecord::from_pairs("TOP.WEn", 1, &[(5, "0"), (10, "1"), (20, "0")]).unwrap();
        let sink = replay(&record, 2);

        assert_eq!(sink.times(), vec![7, 14, 26]);
    }

    #[test]
    fn test_replay_empty_signal_completes_immediately() {
        let record = SignalRecord::new("TOP.ODT", 1);
        let sink = replay(&record, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_replay_keeps_undefined_bits() {
        let record = SignalRecord::from_pairs("TOP.BA", 3, &[(0, "xxx"), (4, "01z")]).unwrap();
        let sink = replay(&record, 0);
        assert_eq!(sink.times(), vec![0, 4]);
        assert_eq!(sink.values(), vec!["xxx", "01z"]);
    }

    #[test]
    fn test_remaining_counts_down() {
        let record = SignalRecord::from_pairs("TOP.CSn", 1, &[(1, "1"), (2, "0")]).unwrap();
        let timeline = ReplayTimeline::new(&record, "cs_n");
        assert_eq!(timeline.remaining(), 2);
        assert_eq!(timeline.name(), "replay:TOP.CSn->cs_n");
    }
}
