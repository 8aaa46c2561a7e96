//! Output bindings and the name-to-sink registry.
//!
//! The device-under-test adapter hands the engine one sink per logical
//! signal name. The registry is resolved once at setup; timelines only
//! refer to sinks by name.
//!
//! # Example
//!
//! ```
//! use wavedrive::binding::{BindingRegistry, RecordingSink};
//! use wavedrive::logic::BitVector;
//!
//! let sink = RecordingSink::new();
//! let mut registry = BindingRegistry::new();
//! registry.register("cke", sink.clone());
//!
//! registry.apply("cke", 10, &BitVector::high()).unwrap();
//! assert_eq!(sink.records(), vec![(10, BitVector::high())]);
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

use crate::error::{ReplayError, ReplayResult};
use crate::logic::BitVector;
use crate::types::{SimTime, TimelineId};

/// Reason a sink refused a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BindingError(pub String);

impl BindingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A sink accepting bit-vector writes at a point in simulated time.
///
/// The engine never reads a sink back; `apply` is a pure side effect from
/// its point of view.
pub trait OutputBinding: Send {
    fn apply(&mut self, time: SimTime, value: &BitVector) -> Result<(), BindingError>;
}

/// Adapts a closure into an [`OutputBinding`].
pub struct FnBinding<F>(pub F);

impl<F> OutputBinding for FnBinding<F>
where
    F: FnMut(SimTime, &BitVector) -> Result<(), BindingError> + Send,
{
    fn apply(&mut self, time: SimTime, value: &BitVector) -> Result<(), BindingError> {
        (self.0)(time, value)
    }
}

/// A sink that records every `(time, value)` it receives.
///
/// Clones share the same log, so a test can keep one clone and register
/// the other.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<(SimTime, BitVector)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every write so far, in arrival order.
    pub fn records(&self) -> Vec<(SimTime, BitVector)> {
        self.log.lock().clone()
    }

    /// Write times only.
    pub fn times(&self) -> Vec<SimTime> {
        self.log.lock().iter().map(|(t, _)| *t).collect()
    }

    /// Values rendered as bit strings.
    pub fn values(&self) -> Vec<String> {
        self.log.lock().iter().map(|(_, v)| v.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl OutputBinding for RecordingSink {
    fn apply(&mut self, time: SimTime, value: &BitVector) -> Result<(), BindingError> {
        self.log.lock().push((time, value.clone()));
        Ok(())
    }
}

/// Registry of output bindings keyed by logical signal name.
#[derive(Default)]
pub struct BindingRegistry {
    bindings: HashMap<String, Box<dyn OutputBinding>>,
}

impl BindingRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, binding: impl OutputBinding + 'static) {
        self.bindings.insert(name.into(), Box::new(binding));
    }

    /// Registers a closure sink under `name`.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, apply: F)
    where
        F: FnMut(SimTime, &BitVector) -> Result<(), BindingError> + Send + 'static,
    {
        self.register(name, FnBinding(apply));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, binding: impl OutputBinding + 'static) -> Self {
        self.register(name, binding);
        self
    }

    /// Returns true if a sink is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Fails with [`ReplayError::UnboundOutput`] unless `name` is registered.
    pub fn require(&self, name: &str) -> ReplayResult<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(ReplayError::UnboundOutput(name.to_string()))
        }
    }

    /// Hands `value` to the sink registered under `name`.
    pub fn apply(&mut self, name: &str, time: SimTime, value: &BitVector) -> ReplayResult<()> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| ReplayError::UnboundOutput(name.to_string()))?;

        binding
            .apply(time, value)
            .map_err(|e| ReplayError::BindingRejected {
                binding: name.to_string(),
                time,
                reason: e.0,
            })
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Registered names.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.bindings.keys()
    }

    /// Removes a sink.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.bindings.remove(name).is_some()
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.bindings.keys().collect();
        names.sort();
        f.debug_struct("BindingRegistry")
            .field("bindings", &names)
            .finish()
    }
}

struct StagedWrite {
    binding: String,
    writer: TimelineId,
    value: BitVector,
}

/// Writes staged during the current simulated instant.
///
/// Each binding holds at most one staged value. A write from a timeline
/// spawned at or after the current holder replaces it, so the
/// latest-spawned writer wins whatever order the instant's resumes ran in.
#[derive(Default)]
pub(crate) struct WriteBuffer {
    staged: Vec<StagedWrite>,
}

impl WriteBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stages `value` for `binding` on behalf of timeline `writer`.
    pub(crate) fn stage(&mut self, binding: &str, writer: TimelineId, value: &BitVector) {
        match self.staged.iter_mut().find(|w| w.binding == binding) {
            Some(held) => {
                if writer >= held.writer {
                    trace!(
                        binding,
                        superseded = held.writer,
                        by = writer,
                        "same-instant write merged"
                    );
                    held.writer = writer;
                    held.value = value.clone();
                }
            }
            None => self.staged.push(StagedWrite {
                binding: binding.to_string(),
                writer,
                value: value.clone(),
            }),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Delivers every staged write at `time` in first-staged order and
    /// empties the buffer. Stops at the first rejection, dropping the rest,
    /// and reports which timeline's write was refused.
    pub(crate) fn flush(
        &mut self,
        registry: &mut BindingRegistry,
        time: SimTime,
        delivered: &mut u64,
    ) -> Result<(), (TimelineId, ReplayError)> {
        for write in self.staged.drain(..) {
            registry
                .apply(&write.binding, time, &write.value)
                .map_err(|e| (write.writer, e))?;
            *delivered += 1;
        }
        Ok(())
    }

    /// Drops every staged write.
    pub(crate) fn discard(&mut self) {
        self.staged.clear();
    }
}

impl std::fmt::Debug for WriteBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBuffer")
            .field("staged", &self.staged.len())
            .finish()
    }
}
