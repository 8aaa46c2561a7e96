//! Tests for timing extraction and the built-in timelines.
//!
//! Tests timing measurement, ClockTimeline, ReplayTimeline, GateWatcher
//! and user-defined timelines on the Scheduler.

use wavedrive::timelines::{BurstShape, ClockTimeline, GateWatcher, ReplayTimeline, StrobeOutputs};
use wavedrive::timing::{clock_period, last_value, phase_count};
use wavedrive::types::SimTime;
use wavedrive::{
    BindingError, BindingRegistry, BitVector, RecordingSink, ReplayError, ReplayResult, Scheduler,
    SignalRecord, Step, Timeline, TimelineContext, TimelineStatus, TimingParams, Trace,
};

// ============================================================================
// Timing Extraction Tests
// ============================================================================

#[test]
fn test_clock_period_ignores_later_spacing() {
    let trace = Trace::from_signals([SignalRecord::from_pairs(
        "TOP.clk",
        1,
        &[(0, "0"), (7, "1"), (9, "0"), (17, "1"), (18, "0"), (50, "1"), (51, "0"), (52, "1")],
    )
    .unwrap()])
    .unwrap();

    assert_eq!(clock_period(&trace, "TOP.clk").unwrap(), 10);
}

#[test]
fn test_clock_period_first_high_is_not_an_edge() {
    let trace = Trace::from_signals([SignalRecord::from_pairs(
        "clk",
        1,
        &[(0, "1"), (5, "0"), (10, "1"), (15, "0"), (22, "1")],
    )
    .unwrap()])
    .unwrap();

    assert_eq!(clock_period(&trace, "clk").unwrap(), 12);
}

#[test]
fn test_clock_period_undefined_after_settling() {
    let trace = Trace::from_signals([SignalRecord::from_pairs(
        "clk",
        1,
        &[(0, "0"), (5, "1"), (8, "z"), (10, "1")],
    )
    .unwrap()])
    .unwrap();

    assert!(matches!(
        clock_period(&trace, "clk"),
        Err(ReplayError::UndefinedValue { time: 8, .. })
    ));
}

#[test]
fn test_phase_count_uses_final_value() {
    let trace = Trace::from_signals([
        SignalRecord::from_pairs("pc", 4, &[(0, "xxxx"), (3, "0001"), (9, "0100")]).unwrap(),
        SignalRecord::from_pairs("zero", 2, &[(0, "00")]).unwrap(),
        SignalRecord::from_pairs("undef", 2, &[(0, "01"), (4, "1x")]).unwrap(),
    ])
    .unwrap();

    assert_eq!(last_value(&trace, "pc").unwrap().to_string(), "0100");
    assert_eq!(phase_count(&trace, "pc").unwrap(), 4);
    assert!(matches!(phase_count(&trace, "zero"), Err(ReplayError::InvalidTiming(_))));
    assert!(matches!(
        phase_count(&trace, "undef"),
        Err(ReplayError::UndefinedValue { time: 4, .. })
    ));
}

#[test]
fn test_timing_params_rejects_zero_data_rate() {
    let trace = Trace::from_signals([
        SignalRecord::from_pairs("clk", 1, &[(0, "0"), (1, "1"), (2, "0"), (3, "1")]).unwrap(),
        SignalRecord::from_pairs("pc", 1, &[(0, "1")]).unwrap(),
    ])
    .unwrap();

    assert!(TimingParams::extract(&trace, "clk", "pc", 1).is_ok());
    assert!(matches!(
        TimingParams::extract(&trace, "clk", "pc", 0),
        Err(ReplayError::InvalidTiming(_))
    ));
}

// ============================================================================
// Clock and Strobe Tests
// ============================================================================

#[test]
fn test_clock_from_extracted_timing() {
    let timing = TimingParams::new(40, 4, 2).unwrap();
    let ck = RecordingSink::new();
    let mut sched = Scheduler::new(BindingRegistry::new().with("ck", ck.clone()));

    sched.spawn(Box::new(ClockTimeline::new("ck", timing.half_period()).unwrap()));
    sched.run_until(35).unwrap();

    assert_eq!(ck.times(), vec![0, 10, 20, 30]);
    assert_eq!(ck.values(), vec!["0", "1", "0", "1"]);
}

#[test]
fn test_burst_shape_reference_point() {
    let timing = TimingParams::new(20, 2, 2).unwrap();
    let shape = BurstShape::compute(10, &timing).unwrap();

    assert_eq!(shape.toggle_count, 2);
    assert_eq!(shape.toggle_interval, 10);
    assert_eq!(shape.active_duration, 15);
    assert_eq!(shape.toggle_offsets().collect::<Vec<_>>(), vec![0, 10]);
}

#[test]
fn test_burst_shape_quad_phase() {
    // 4 phases, DDR: 8 slots per 80-unit period.
    let timing = TimingParams::new(80, 4, 2).unwrap();
    let shape = BurstShape::compute(40, &timing).unwrap();

    assert_eq!(shape.toggle_count, 3);
    assert_eq!(shape.toggle_interval, 20);
    assert_eq!(shape.active_duration, 70);
    assert_eq!(shape.toggle_offsets().collect::<Vec<_>>(), vec![0, 20, 40]);
}

#[test]
fn test_gate_watcher_complement_tracks_strobe() {
    let gate = SignalRecord::from_pairs("TOP.writeEnable", 1, &[(0, "0"), (20, "1"), (30, "0")])
        .unwrap();
    let timing = TimingParams::new(20, 2, 2).unwrap();
    let dqs = RecordingSink::new();
    let dqs_n = RecordingSink::new();
    let mut sched = Scheduler::new(
        BindingRegistry::new()
            .with("dqs", dqs.clone())
            .with("dqs_n", dqs_n.clone()),
    );

    let outputs = StrobeOutputs::new("dqs").with_complement("dqs_n");
    sched.spawn(Box::new(GateWatcher::new(&gate, timing, outputs)));
    sched.run_bounded().unwrap();

    assert_eq!(dqs.times(), vec![20, 30]);
    assert_eq!(dqs_n.times(), vec![20, 30]);
    assert_eq!(dqs_n.values(), vec!["0", "1"]);
}

// ============================================================================
// Custom Timeline Tests
// ============================================================================

/// Fails at its first resume after `after`.
struct FailAt {
    name: String,
    after: SimTime,
    started: bool,
}

impl Timeline for FailAt {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut TimelineContext<'_>) -> ReplayResult<Step> {
        if self.started {
            let msg = format!("{} failed at {}", self.name, ctx.now());
            return Err(ReplayError::InvalidTiming(msg));
        }
        self.started = true;
        Ok(Step::Wait(self.after))
    }
}

/// Replays two records, then writes a marker once both have finished.
struct Sequencer {
    first: Option<(SignalRecord, SignalRecord)>,
}

impl Timeline for Sequencer {
    fn name(&self) -> &str {
        "sequencer"
    }

    fn resume(&mut self, ctx: &mut TimelineContext<'_>) -> ReplayResult<Step> {
        match self.first.take() {
            Some((a, b)) => {
                let ha = ctx.spawn(Box::new(ReplayTimeline::new(&a, "bus")));
                let hb = ctx.spawn(Box::new(ReplayTimeline::new(&b, "bus").with_delay(1)));
                Ok(Step::Join(vec![ha, hb]))
            }
            None => {
                ctx.drive("done", &BitVector::high())?;
                Ok(Step::Done)
            }
        }
    }
}

#[test]
fn test_join_all_reports_earliest_failure() {
    let sink = RecordingSink::new();
    let mut sched = Scheduler::new(BindingRegistry::new().with("bus", sink.clone()));

    let record = SignalRecord::from_pairs("BUS", 2, &[(2, "00"), (5, "01"), (9, "10")]).unwrap();
    let replay = sched.spawn(Box::new(ReplayTimeline::new(&record, "bus")));
    let late = sched.spawn(Box::new(FailAt { name: "late".into(), after: 7, started: false }));
    let early = sched.spawn(Box::new(FailAt { name: "early".into(), after: 4, started: false }));

    let err = sched.join_all(&[replay, late, early]).unwrap_err();
    assert!(matches!(err, ReplayError::InvalidTiming(msg) if msg == "early failed at 4"));
    assert_eq!(sink.times(), vec![2]);
    assert_eq!(sched.status(early), TimelineStatus::Failed);
    assert_eq!(sched.status(late), TimelineStatus::Cancelled);
    assert_eq!(sched.status(replay), TimelineStatus::Cancelled);
}

#[test]
fn test_spawned_children_joined_by_parent() {
    let bus = RecordingSink::new();
    let done = RecordingSink::new();
    let mut sched = Scheduler::new(
        BindingRegistry::new()
            .with("bus", bus.clone())
            .with("done", done.clone()),
    );

    let a = SignalRecord::from_pairs("A", 1, &[(3, "1"), (6, "0")]).unwrap();
    let b = SignalRecord::from_pairs("B", 1, &[(3, "0")]).unwrap();
    let parent = sched.spawn(Box::new(Sequencer { first: Some((a, b)) }));

    sched.join_all(&[parent]).unwrap();
    assert_eq!(bus.times(), vec![3, 4, 6]);
    assert_eq!(done.times(), vec![6]);
    assert_eq!(sched.stats().spawned, 3);
}

#[test]
fn test_rejecting_binding_fails_replay() {
    let mut bindings = BindingRegistry::new();
    bindings.register_fn("ro", |_, _| Err(BindingError::new("read-only")));
    let mut sched = Scheduler::new(bindings);

    let record = SignalRecord::from_pairs("RO", 1, &[(1, "1")]).unwrap();
    let handle = sched.spawn(Box::new(ReplayTimeline::new(&record, "ro")));

    let err = sched.join_all(&[handle]).unwrap_err();
    assert!(matches!(
        err,
        ReplayError::BindingRejected { time: 1, ref reason, .. } if reason == "read-only"
    ));
}
