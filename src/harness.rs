//! End-to-end replay runs.
//!
//! A [`ReplayHarness`] turns a loaded [`Trace`] and a [`ReplayConfig`] into
//! one scheduler run:
//!
//! 1. timing parameters are extracted once, at construction;
//! 2. every trace signal and output binding the run needs is checked before
//!    anything is spawned;
//! 3. the clock, then one replayer per mapping (in mapping order), then the
//!    gating watcher are spawned at time 0;
//! 4. all bounded timelines are joined and the clock is cancelled.
//!
//! # Example
//!
//! ```
//! use wavedrive::binding::{BindingRegistry, RecordingSink};
//! use wavedrive::config::ReplayConfigBuilder;
//! use wavedrive::harness::ReplayHarness;
//! use wavedrive::trace::{SignalRecord, Trace};
//!
//! let trace = Trace::from_signals([
//!     SignalRecord::from_pairs("TOP.clk", 1, &[(0, "0"), (5, "1"), (10, "0"), (15, "1")])
//!         .unwrap(),
//!     SignalRecord::from_pairs("TOP.phaseCount", 2, &[(0, "01")]).unwrap(),
//!     SignalRecord::from_pairs("TOP.CKE", 1, &[(3, "0"), (12, "1")]).unwrap(),
//! ])
//! .unwrap();
//!
//! let config = ReplayConfigBuilder::new("clk", "phaseCount")
//!     .scope("TOP")
//!     .map("CKE", "cke")
//!     .build()
//!     .unwrap();
//!
//! let cke = RecordingSink::new();
//! let harness = ReplayHarness::new(&trace, config).unwrap();
//! let report = harness.run(BindingRegistry::new().with("cke", cke.clone())).unwrap();
//!
//! assert_eq!(report.timing.clock_period, 10);
//! assert_eq!(cke.times(), vec![3, 12]);
//! ```

use tracing::{debug, info};

use crate::binding::BindingRegistry;
use crate::config::ReplayConfig;
use crate::error::ReplayResult;
use crate::scheduler::Scheduler;
use crate::stats::ReplayReport;
use crate::timelines::{ClockTimeline, GateWatcher, ReplayTimeline, StrobeOutputs};
use crate::timing::TimingParams;
use crate::trace::Trace;

/// Replays one trace according to one configuration.
///
/// The harness borrows the trace and never mutates it, so `run` may be
/// called repeatedly; each call uses a fresh scheduler.
#[derive(Debug)]
pub struct ReplayHarness<'a> {
    trace: &'a Trace,
    config: ReplayConfig,
    timing: TimingParams,
}

impl<'a> ReplayHarness<'a> {
    /// Validates `config` and extracts the timing parameters from `trace`.
    pub fn new(trace: &'a Trace, config: ReplayConfig) -> ReplayResult<Self> {
        config.validate()?;
        let timing = TimingParams::extract(
            trace,
            &config.resolve(&config.timing.clock_signal),
            &config.resolve(&config.timing.phase_count_signal),
            config.timing.data_rate,
        )?;
        info!(
            clock_period = timing.clock_period,
            phase_count = timing.phase_count,
            data_rate = timing.data_rate,
            "timing extracted"
        );
        Ok(Self {
            trace,
            config,
            timing,
        })
    }

    /// Timing parameters measured at construction.
    pub fn timing(&self) -> &TimingParams {
        &self.timing
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Checks that every signal and output the run touches exists.
    fn check(&self, bindings: &BindingRegistry) -> ReplayResult<()> {
        for mapping in &self.config.signals {
            self.trace.require(&self.config.resolve(&mapping.signal))?;
        }
        if let Some(strobe) = &self.config.strobe {
            self.trace.require(&self.config.resolve(&strobe.gate_signal))?;
        }
        for output in self.config.outputs() {
            bindings.require(output)?;
        }
        Ok(())
    }

    /// Runs the replay against `bindings` until every bounded timeline has
    /// finished.
    ///
    /// Setup failures are returned before any timeline is spawned, so no
    /// binding sees a write. A runtime failure aborts the run.
    pub fn run(&self, bindings: BindingRegistry) -> ReplayResult<ReplayReport> {
        self.check(&bindings)?;
        let mut scheduler = Scheduler::new(bindings);

        if let Some(clock) = &self.config.clock {
            let mut timeline = ClockTimeline::new(&clock.output, self.timing.half_period())?;
            if let Some(complement) = &clock.complement {
                timeline = timeline.with_complement(complement);
            }
            scheduler.spawn(Box::new(timeline));
        }

        for mapping in &self.config.signals {
            let record = self.trace.require(&self.config.resolve(&mapping.signal))?;
            scheduler.spawn(Box::new(
                ReplayTimeline::new(record, &mapping.output).with_delay(mapping.delay),
            ));
        }

        if let Some(strobe) = &self.config.strobe {
            let gate = self.trace.require(&self.config.resolve(&strobe.gate_signal))?;
            let mut outputs = StrobeOutputs::new(&strobe.strobe);
            if let Some(complement) = &strobe.complement {
                outputs = outputs.with_complement(complement);
            }
            scheduler.spawn(Box::new(GateWatcher::new(gate, self.timing, outputs)));
        }

        let started = scheduler.stats().spawned;
        debug!(timelines = started, "replay started");

        let end = scheduler.run_bounded()?;
        let stats = scheduler.stats().clone();
        info!(time = end, writes = stats.writes, "replay finished");

        Ok(ReplayReport {
            timing: self.timing,
            replayed_signals: self.config.signals.len(),
            bursts: stats.spawned - started,
            scheduler: stats,
        })
    }
}
