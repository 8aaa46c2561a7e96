//! Statistics collection and export.
//!
//! The scheduler counts its own activity in [`SchedulerStats`]; the harness
//! wraps that together with the extracted timing into a [`ReplayReport`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::timing::TimingParams;
use crate::types::SimTime;

/// Counters maintained by the scheduler.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Timelines spawned, including children spawned while running
    pub spawned: u64,
    /// Timelines that returned `Done`
    pub completed: u64,
    /// Timelines cancelled before completing
    pub cancelled: u64,
    /// Timelines that returned an error
    pub failed: u64,
    /// Total `resume` calls
    pub resumes: u64,
    /// Total binding writes
    pub writes: u64,
    /// Largest ready-queue depth observed
    pub peak_queue_depth: usize,
    /// Simulated time when the scheduler last stopped
    pub final_time: SimTime,
}

/// Outcome of a successful replay run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Timing parameters measured from the trace
    pub timing: TimingParams,
    /// Number of replayed trace signals
    pub replayed_signals: usize,
    /// Strobe bursts emitted by the gating watcher
    pub bursts: u64,
    /// Scheduler counters at the end of the run
    pub scheduler: SchedulerStats,
}

impl ReplayReport {
    /// Simulated time at which every bounded timeline had finished.
    pub fn final_time(&self) -> SimTime {
        self.scheduler.final_time
    }

    /// Exports the report as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "timing": {
                "clock_period": self.timing.clock_period,
                "phase_count": self.timing.phase_count,
                "data_rate": self.timing.data_rate,
            },
            "replayed_signals": self.replayed_signals,
            "bursts": self.bursts,
            "scheduler": self.scheduler,
        })
    }

    /// Writes the report as pretty JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json() {
        let report = ReplayReport {
            timing: TimingParams::new(20, 2, 2).unwrap(),
            replayed_signals: 3,
            bursts: 1,
            scheduler: SchedulerStats {
                spawned: 5,
                completed: 4,
                cancelled: 1,
                writes: 12,
                final_time: 140,
                ..Default::default()
            },
        };

        let json = report.to_json();
        assert_eq!(json["timing"]["clock_period"], 20);
        assert_eq!(json["replayed_signals"], 3);
        assert_eq!(json["scheduler"]["writes"], 12);
        assert_eq!(report.final_time(), 140);
    }

    #[test]
    fn test_report_written_as_json() {
        let report = ReplayReport {
            timing: TimingParams::new(10, 1, 1).unwrap(),
            replayed_signals: 0,
            bursts: 0,
            scheduler: SchedulerStats::default(),
        };
        let path = std::env::temp_dir()
            .join(format!("wavedrive-report-{}.json", std::process::id()));
        report.write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let back: ReplayReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back, report);
    }
}
