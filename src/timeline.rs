//! Timeline definitions and the `Timeline` trait.
//!
//! A timeline is an independently progressing unit of scheduled work. It
//! is an explicit state machine: the scheduler resumes it when its wait
//! expires, it performs its writes for that instant through the
//! [`TimelineContext`], and it tells the scheduler how to suspend next.

use std::fmt;

use crate::binding::{BindingRegistry, WriteBuffer};
use crate::error::ReplayResult;
use crate::logic::BitVector;
use crate::types::{SimTime, TimelineId};

/// Handle to a spawned timeline, used for joins and cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimelineHandle(pub(crate) TimelineId);

impl TimelineHandle {
    /// The spawn-order identifier behind this handle.
    pub fn id(&self) -> TimelineId {
        self.0
    }
}

impl fmt::Display for TimelineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a timeline suspends after a resume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Resume again after the given duration.
    Wait(SimTime),
    /// Resume once every listed timeline has finished.
    Join(Vec<TimelineHandle>),
    /// The action sequence is exhausted.
    Done,
}

/// The core trait implemented by every scheduled activity.
///
/// Each call to `resume` happens at a single simulated instant; writes made
/// during one call are atomic with respect to every other timeline.
pub trait Timeline: Send {
    /// Short name used in logs and statistics.
    fn name(&self) -> &str;

    /// Bounded timelines must finish for a run to complete. Unbounded ones
    /// (free-running clocks) are cancelled at teardown instead.
    fn is_bounded(&self) -> bool {
        true
    }

    /// Performs the actions due at the current instant.
    fn resume(&mut self, ctx: &mut TimelineContext<'_>) -> ReplayResult<Step>;
}

/// What a running timeline can do at its current instant.
pub struct TimelineContext<'a> {
    now: SimTime,
    handle: TimelineHandle,
    bindings: &'a BindingRegistry,
    staged: &'a mut WriteBuffer,
    spawned: &'a mut Vec<(TimelineHandle, Box<dyn Timeline>)>,
    next_id: &'a mut TimelineId,
}

impl<'a> TimelineContext<'a> {
    pub(crate) fn new(
        now: SimTime,
        handle: TimelineHandle,
        bindings: &'a BindingRegistry,
        staged: &'a mut WriteBuffer,
        spawned: &'a mut Vec<(TimelineHandle, Box<dyn Timeline>)>,
        next_id: &'a mut TimelineId,
    ) -> Self {
        Self {
            now,
            handle,
            bindings,
            staged,
            spawned,
            next_id,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Handle of the running timeline.
    pub fn handle(&self) -> TimelineHandle {
        self.handle
    }

    /// Writes `value` to the named output binding at the current instant.
    ///
    /// The write is delivered when the instant ends. If another timeline
    /// drives the same binding at the same instant, the one spawned later
    /// wins and the sink sees a single write.
    pub fn drive(&mut self, binding: &str, value: &BitVector) -> ReplayResult<()> {
        self.bindings.require(binding)?;
        self.staged.stage(binding, self.handle.id(), value);
        Ok(())
    }

    /// Spawns a child timeline that starts at the current instant, after
    /// every timeline spawned before it.
    pub fn spawn(&mut self, timeline: Box<dyn Timeline>) -> TimelineHandle {
        let handle = TimelineHandle(*self.next_id);
        *self.next_id += 1;
        self.spawned.push((handle, timeline));
        handle
    }
}
