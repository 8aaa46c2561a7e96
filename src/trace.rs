//! The trace store.
//!
//! A [`Trace`] holds a parsed waveform: every recorded signal with its
//! declared width and its time-ordered value changes. It is built once
//! (programmatically or from a JSON fixture) and only read afterwards.
//!
//! ```
//! use wavedrive::trace::{SignalRecord, Trace};
//!
//! let clk = SignalRecord::from_pairs("TOP.clk", 1, &[(0, "0"), (5, "1"), (10, "0")]).unwrap();
//! let trace = Trace::from_signals([clk]).unwrap();
//!
//! assert!(trace.find("TOP", "clk").is_some());
//! assert_eq!(trace.end_time(), 10);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::error::{ReplayError, ReplayResult};
use crate::event::Event;
use crate::logic::BitVector;
use crate::types::SimTime;

/// Errors raised while building a trace.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("invalid logic value '{0}'")]
    InvalidLogic(String),

    #[error("signal {signal}: timestamp {time} does not follow {previous}")]
    NonMonotonic {
        signal: String,
        previous: SimTime,
        time: SimTime,
    },

    #[error("signal {signal}: value at {time} has width {found}, declared {declared}")]
    WidthMismatch {
        signal: String,
        time: SimTime,
        declared: usize,
        found: usize,
    },

    #[error("duplicate signal: {0}")]
    DuplicateSignal(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for trace construction.
pub type TraceResult<T> = Result<T, TraceError>;

/// The recorded history of one signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecord {
    /// Hierarchical name, e.g. `TOP.ADDR`
    pub name: String,
    /// Declared bit width
    pub width: usize,
    #[serde(default)]
    events: Vec<Event>,
}

impl SignalRecord {
    /// Creates a record with no events.
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
            events: Vec::new(),
        }
    }

    /// Builds a record from `(time, bits)` pairs.
    pub fn from_pairs(
        name: impl Into<String>,
        width: usize,
        pairs: &[(SimTime, &str)],
    ) -> TraceResult<Self> {
        let mut record = Self::new(name, width);
        for (time, bits) in pairs {
            record.push(*time, BitVector::parse(bits)?)?;
        }
        Ok(record)
    }

    /// Appends a value change, enforcing strictly increasing timestamps
    /// and the declared width.
    pub fn push(&mut self, time: SimTime, value: BitVector) -> TraceResult<()> {
        if let Some(last) = self.events.last() {
            if time <= last.time {
                return Err(TraceError::NonMonotonic {
                    signal: self.name.clone(),
                    previous: last.time,
                    time,
                });
            }
        }
        if value.width() != self.width {
            return Err(TraceError::WidthMismatch {
                signal: self.name.clone(),
                time,
                declared: self.width,
                found: value.width(),
            });
        }
        self.events.push(Event::new(time, value));
        Ok(())
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_event(mut self, time: SimTime, value: BitVector) -> TraceResult<Self> {
        self.push(time, value)?;
        Ok(self)
    }

    /// Recorded events in time order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The final recorded event.
    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Returns true if nothing was recorded for this signal.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The value held at `time`: the latest event at or before it.
    pub fn value_at(&self, time: SimTime) -> Option<&BitVector> {
        let idx = self.events.partition_point(|e| e.time <= time);
        idx.checked_sub(1).map(|i| &self.events[i].value)
    }

    /// Re-checks the ordering and width invariants; used after
    /// deserialization.
    pub fn validate(&self) -> TraceResult<()> {
        let mut check = SignalRecord::new(self.name.clone(), self.width);
        for event in &self.events {
            check.push(event.time, event.value.clone())?;
        }
        Ok(())
    }
}

/// A parsed waveform: an ordered collection of signal records with name
/// lookup.
#[derive(Clone, Debug, Default)]
pub struct Trace {
    signals: Vec<SignalRecord>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct TraceFile {
    signals: Vec<SignalRecord>,
}

impl Trace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a trace from records, validating each one.
    pub fn from_signals(signals: impl IntoIterator<Item = SignalRecord>) -> TraceResult<Self> {
        let mut trace = Self::new();
        for record in signals {
            trace.add_signal(record)?;
        }
        Ok(trace)
    }

    /// Adds a record. Names must be unique.
    pub fn add_signal(&mut self, record: SignalRecord) -> TraceResult<()> {
        record.validate()?;
        if self.index.contains_key(&record.name) {
            return Err(TraceError::DuplicateSignal(record.name));
        }
        self.index.insert(record.name.clone(), self.signals.len());
        self.signals.push(record);
        Ok(())
    }

    /// Looks up a signal by full hierarchical name.
    pub fn get(&self, name: &str) -> Option<&SignalRecord> {
        self.index.get(name).map(|&i| &self.signals[i])
    }

    /// Looks up `scope.net`.
    pub fn find(&self, scope: &str, net: &str) -> Option<&SignalRecord> {
        self.get(&format!("{scope}.{net}"))
    }

    /// Looks up a signal, failing with [`ReplayError::SignalNotFound`].
    pub fn require(&self, name: &str) -> ReplayResult<&SignalRecord> {
        self.get(name)
            .ok_or_else(|| ReplayError::SignalNotFound(name.to_string()))
    }

    /// All records in insertion order.
    pub fn signals(&self) -> impl Iterator<Item = &SignalRecord> {
        self.signals.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns true if the trace has no records.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Timestamp of the latest event across all signals.
    pub fn end_time(&self) -> SimTime {
        self.signals
            .iter()
            .filter_map(|s| s.last().map(|e| e.time))
            .max()
            .unwrap_or(0)
    }

    /// Loads a trace from a JSON fixture of the form
    /// `{"signals": [{"name": .., "width": .., "events": [{"time": .., "value": ".."}]}]}`.
    pub fn from_json(json: &str) -> TraceResult<Self> {
        let file: TraceFile = serde_json::from_str(json)?;
        Self::from_signals(file.signals)
    }

    /// Serializes the trace to the JSON fixture form.
    pub fn to_json(&self) -> TraceResult<String> {
        let file = TraceFile {
            signals: self.signals.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}
