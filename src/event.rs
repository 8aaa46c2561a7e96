//! Recorded value-change events.
//!
//! An event is one entry of a signal's history in the trace: the signal
//! took `value` at `time`.

use serde::{Deserialize, Serialize};

use crate::logic::BitVector;
use crate::types::SimTime;

/// A timestamped value change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The trace time at which the value was recorded
    pub time: SimTime,
    /// The value the signal took at `time`
    pub value: BitVector,
}

impl Event {
    /// Creates a new event with the given time and value.
    pub fn new(time: SimTime, value: BitVector) -> Self {
        Self { time, value }
    }

    /// Returns the event's binary level, if its value is fully defined.
    pub fn level(&self) -> Option<bool> {
        self.value.as_level()
    }
}

/// Returns true if `prev -> next` is a rising edge: a definite low followed
/// by a definite high.
pub fn is_rising(prev: Option<bool>, next: Option<bool>) -> bool {
    prev == Some(false) && next == Some(true)
}

/// Returns true if `prev -> next` is a falling edge.
pub fn is_falling(prev: Option<bool>, next: Option<bool>) -> bool {
    prev == Some(true) && next == Some(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::Logic;

    #[test]
    fn test_event_creation() {
        let event = Event::new(100, BitVector::high());

        assert_eq!(event.time, 100);
        assert_eq!(event.level(), Some(true));
    }

    #[test]
    fn test_edges() {
        assert!(is_rising(Some(false), Some(true)));
        assert!(!is_rising(None, Some(true)));
        assert!(!is_rising(Some(true), Some(true)));
        assert!(is_falling(Some(true), Some(false)));
        assert!(!is_falling(None, Some(false)));
    }

    #[test]
    fn test_undefined_level() {
        let event = Event::new(5, BitVector::bit(Logic::X));
        assert_eq!(event.level(), None);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new(100, BitVector::from_u64(3, 2));
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(event, deserialized);
    }
}
