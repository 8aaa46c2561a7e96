//! Deterministic discrete-event scheduler.
//!
//! The `Scheduler` time-multiplexes many timelines on one thread of
//! control. Ready timelines sit in a min-heap keyed by `(wake_time,
//! spawn_id)`, so timelines waking at the same instant always resume in
//! spawn order and every run over the same inputs is identical.
//!
//! Writes made during an instant are staged and delivered when simulated
//! time moves on, so each binding receives at most one write per instant.
//!
//! # Example
//!
//! ```
//! use wavedrive::binding::{BindingRegistry, RecordingSink};
//! use wavedrive::scheduler::Scheduler;
//! use wavedrive::timelines::ReplayTimeline;
//! use wavedrive::trace::SignalRecord;
//!
//! let cke = SignalRecord::from_pairs("TOP.CKE", 1, &[(5, "0"), (10, "1")]).unwrap();
//! let sink = RecordingSink::new();
//!
//! let mut scheduler = Scheduler::new(BindingRegistry::new().with("cke", sink.clone()));
//! let handle = scheduler.spawn(Box::new(ReplayTimeline::new(&cke, "cke")));
//! scheduler.join_all(&[handle]).unwrap();
//!
//! assert_eq!(sink.times(), vec![5, 10]);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};
use tracing::{debug, info, trace, warn};

use crate::binding::{BindingRegistry, WriteBuffer};
use crate::error::{ReplayError, ReplayResult};
use crate::stats::SchedulerStats;
use crate::timeline::{Step, Timeline, TimelineContext, TimelineHandle};
use crate::types::{SimTime, TimelineId};

/// Lifecycle state of a spawned timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineStatus {
    /// Queued or suspended in a join
    Pending,
    Completed,
    Failed,
    Cancelled,
}

struct Slot {
    timeline: Box<dyn Timeline>,
    bounded: bool,
    /// Timelines this one is joined on; non-empty means it is not queued.
    waiting_on: BTreeSet<TimelineId>,
}

/// Single-threaded cooperative scheduler driving timelines against a set of
/// output bindings.
pub struct Scheduler {
    /// Current simulated time
    now: SimTime,
    /// Next spawn identifier
    next_id: TimelineId,
    /// Ready queue of (wake time, spawn id)
    queue: BinaryHeap<Reverse<(SimTime, TimelineId)>>,
    /// Live timelines by spawn id
    live: BTreeMap<TimelineId, Slot>,
    /// Final status of finished timelines
    finished: HashMap<TimelineId, TimelineStatus>,
    /// Names of every timeline ever spawned
    names: HashMap<TimelineId, String>,
    /// Live bounded timelines
    live_bounded: usize,
    /// Live bounded timelines suspended in a join
    joining_bounded: usize,
    bindings: BindingRegistry,
    /// Writes made at the current instant, not yet delivered
    staged: WriteBuffer,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Creates a scheduler at time 0 that writes through `bindings`.
    pub fn new(bindings: BindingRegistry) -> Self {
        Self {
            now: 0,
            next_id: 0,
            queue: BinaryHeap::new(),
            live: BTreeMap::new(),
            finished: HashMap::new(),
            names: HashMap::new(),
            live_bounded: 0,
            joining_bounded: 0,
            bindings,
            staged: WriteBuffer::new(),
            stats: SchedulerStats::default(),
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Counters collected so far.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Number of timelines that have not finished.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Registers a timeline that starts at the current instant.
    pub fn spawn(&mut self, timeline: Box<dyn Timeline>) -> TimelineHandle {
        let handle = TimelineHandle(self.next_id);
        self.next_id += 1;
        self.insert(handle, timeline);
        handle
    }

    fn insert(&mut self, handle: TimelineHandle, timeline: Box<dyn Timeline>) {
        let id = handle.id();
        let bounded = timeline.is_bounded();
        debug!(timeline = timeline.name(), %handle, time = self.now, bounded, "spawn");

        self.names.insert(id, timeline.name().to_string());
        self.live.insert(
            id,
            Slot {
                timeline,
                bounded,
                waiting_on: BTreeSet::new(),
            },
        );
        if bounded {
            self.live_bounded += 1;
        }
        self.queue.push(Reverse((self.now, id)));
        self.stats.spawned += 1;
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.queue.len());
    }

    /// Name a timeline was spawned with.
    pub fn name_of(&self, handle: TimelineHandle) -> &str {
        self.names.get(&handle.id()).map_or("?", String::as_str)
    }

    /// Current status of a timeline.
    pub fn status(&self, handle: TimelineHandle) -> TimelineStatus {
        self.finished
            .get(&handle.id())
            .copied()
            .unwrap_or(TimelineStatus::Pending)
    }

    /// Resumes the next ready timeline.
    ///
    /// Returns `Ok(false)` when nothing is queued. Writes staged at the
    /// current instant are delivered before time advances. An error is the
    /// failure of the resumed timeline or a rejected write; the caller
    /// decides whether to abort the rest.
    pub fn step(&mut self) -> ReplayResult<bool> {
        let Some(Reverse((wake, id))) = self.queue.peek().copied() else {
            self.flush()?;
            return Ok(false);
        };
        if wake > self.now {
            self.flush()?;
        }
        self.queue.pop();
        // Stale entry of a cancelled timeline.
        let Some(mut slot) = self.live.remove(&id) else {
            return Ok(true);
        };

        self.now = wake;
        self.stats.resumes += 1;
        let handle = TimelineHandle(id);
        trace!(timeline = slot.timeline.name(), time = wake, "resume");

        let mut spawned = Vec::new();
        let result = {
            let mut ctx = TimelineContext::new(
                self.now,
                handle,
                &self.bindings,
                &mut self.staged,
                &mut spawned,
                &mut self.next_id,
            );
            slot.timeline.resume(&mut ctx)
        };

        for (child, timeline) in spawned {
            self.insert(child, timeline);
        }

        match result {
            Ok(Step::Wait(delay)) => {
                self.live.insert(id, slot);
                self.queue.push(Reverse((self.now + delay, id)));
            }
            Ok(Step::Join(handles)) => {
                slot.waiting_on = handles
                    .iter()
                    .map(TimelineHandle::id)
                    .filter(|h| *h != id && self.live.contains_key(h))
                    .collect();
                if slot.waiting_on.is_empty() {
                    self.queue.push(Reverse((self.now, id)));
                } else if slot.bounded {
                    self.joining_bounded += 1;
                }
                self.live.insert(id, slot);
            }
            Ok(Step::Done) => {
                debug!(timeline = slot.timeline.name(), time = self.now, "complete");
                self.finish(id, slot, TimelineStatus::Completed);
            }
            Err(e) => {
                warn!(
                    timeline = slot.timeline.name(),
                    time = self.now,
                    error = %e,
                    "timeline failed"
                );
                self.finish(id, slot, TimelineStatus::Failed);
                return Err(e);
            }
        }

        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.queue.len());
        Ok(true)
    }

    /// Delivers the writes staged at the current instant. A rejected write
    /// fails the timeline that made it.
    fn flush(&mut self) -> ReplayResult<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let Err((writer, e)) = self
            .staged
            .flush(&mut self.bindings, self.now, &mut self.stats.writes)
        else {
            return Ok(());
        };

        warn!(writer, time = self.now, error = %e, "write rejected");
        match self.live.remove(&writer) {
            Some(slot) => self.finish(writer, slot, TimelineStatus::Failed),
            None => {
                // The writer completed at this instant; its last write failed.
                if self.finished.insert(writer, TimelineStatus::Failed)
                    == Some(TimelineStatus::Completed)
                {
                    self.stats.completed -= 1;
                    self.stats.failed += 1;
                }
            }
        }
        Err(e)
    }

    fn finish(&mut self, id: TimelineId, slot: Slot, status: TimelineStatus) {
        if slot.bounded {
            self.live_bounded -= 1;
            if !slot.waiting_on.is_empty() {
                self.joining_bounded -= 1;
            }
        }
        match status {
            TimelineStatus::Completed => self.stats.completed += 1,
            TimelineStatus::Failed => self.stats.failed += 1,
            TimelineStatus::Cancelled => self.stats.cancelled += 1,
            TimelineStatus::Pending => {}
        }
        self.finished.insert(id, status);

        let mut woken = Vec::new();
        for (jid, joiner) in self.live.iter_mut() {
            if joiner.waiting_on.remove(&id) && joiner.waiting_on.is_empty() {
                woken.push((*jid, joiner.bounded));
            }
        }
        for (jid, bounded) in woken {
            if bounded {
                self.joining_bounded -= 1;
            }
            self.queue.push(Reverse((self.now, jid)));
        }
    }

    /// Cancels a timeline. Returns false if it had already finished.
    pub fn cancel(&mut self, handle: TimelineHandle) -> bool {
        match self.live.remove(&handle.id()) {
            Some(slot) => {
                debug!(timeline = slot.timeline.name(), time = self.now, "cancel");
                self.finish(handle.id(), slot, TimelineStatus::Cancelled);
                true
            }
            None => false,
        }
    }

    /// Cancels every live unbounded timeline and returns how many there were.
    pub fn cancel_unbounded(&mut self) -> usize {
        let ids: Vec<_> = self
            .live
            .iter()
            .filter(|(_, slot)| !slot.bounded)
            .map(|(id, _)| TimelineHandle(*id))
            .collect();
        ids.into_iter().filter(|h| self.cancel(*h)).count()
    }

    /// Cancels every live timeline and returns how many there were.
    pub fn cancel_all(&mut self) -> usize {
        let ids: Vec<_> = self.live.keys().map(|id| TimelineHandle(*id)).collect();
        ids.into_iter().filter(|h| self.cancel(*h)).count()
    }

    fn abort(&mut self, error: ReplayError) -> ReplayError {
        self.staged.discard();
        let cancelled = self.cancel_all();
        warn!(
            time = self.now,
            cancelled,
            error = %error,
            "run failed, remaining timelines cancelled"
        );
        self.stats.final_time = self.now;
        error
    }

    fn stalled(&self) -> bool {
        self.live_bounded > 0 && self.live_bounded == self.joining_bounded
    }

    /// Runs until every listed timeline has completed.
    ///
    /// Fails fast: the first timeline error is returned and every other live
    /// timeline is cancelled, so no sink sees further writes.
    pub fn join_all(&mut self, handles: &[TimelineHandle]) -> ReplayResult<()> {
        loop {
            let mut pending = 0;
            for handle in handles {
                match self.status(*handle) {
                    TimelineStatus::Completed => {}
                    TimelineStatus::Pending => {
                        if self.live.get(&handle.id()).is_some_and(|s| !s.bounded) {
                            let name = self.name_of(*handle).to_string();
                            return Err(ReplayError::UnboundedJoin(name));
                        }
                        pending += 1;
                    }
                    TimelineStatus::Failed => {
                        return Err(ReplayError::TimelineFailed(self.name_of(*handle).to_string()));
                    }
                    TimelineStatus::Cancelled => {
                        return Err(ReplayError::Cancelled(self.name_of(*handle).to_string()));
                    }
                }
            }
            if pending == 0 {
                if let Err(e) = self.flush() {
                    return Err(self.abort(e));
                }
                self.stats.final_time = self.now;
                return Ok(());
            }
            if self.stalled() {
                return Err(ReplayError::Stalled {
                    time: self.now,
                    pending,
                });
            }

            match self.step() {
                Ok(true) => {}
                Ok(false) => {
                    return Err(ReplayError::Stalled {
                        time: self.now,
                        pending,
                    })
                }
                Err(e) => return Err(self.abort(e)),
            }
        }
    }

    /// Joins every bounded timeline, including those spawned while running,
    /// then cancels the unbounded ones. Returns the completion time.
    pub fn run_bounded(&mut self) -> ReplayResult<SimTime> {
        while self.live_bounded > 0 {
            if self.stalled() {
                return Err(ReplayError::Stalled {
                    time: self.now,
                    pending: self.live_bounded,
                });
            }
            match self.step() {
                Ok(true) => {}
                Ok(false) => {
                    return Err(ReplayError::Stalled {
                        time: self.now,
                        pending: self.live_bounded,
                    })
                }
                Err(e) => return Err(self.abort(e)),
            }
        }

        if let Err(e) = self.flush() {
            return Err(self.abort(e));
        }
        let cancelled = self.cancel_unbounded();
        info!(time = self.now, cancelled, "all bounded timelines joined");
        self.stats.final_time = self.now;
        Ok(self.now)
    }

    /// Resumes every timeline due at or before `limit`, then advances the
    /// clock to `limit`.
    pub fn run_until(&mut self, limit: SimTime) -> ReplayResult<()> {
        while let Some(Reverse((wake, _))) = self.queue.peek() {
            if *wake > limit {
                break;
            }
            if let Err(e) = self.step() {
                return Err(self.abort(e));
            }
        }
        if let Err(e) = self.flush() {
            return Err(self.abort(e));
        }
        self.now = self.now.max(limit);
        self.stats.final_time = self.now;
        Ok(())
    }

    /// Exports scheduler statistics.
    pub fn export_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "current_time": self.now,
            "live": self.live.len(),
            "queued": self.queue.len(),
            "stats": self.stats,
        })
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("live", &self.live.len())
            .field("queued", &self.queue.len())
            .field("bindings", &self.bindings)
            .finish()
    }
}
