//! Performance benchmarks for wavedrive replay.
//!
//! Run with: `cargo bench`
//! Or for specific bench: `cargo bench --bench replay_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use wavedrive::binding::OutputBinding;
use wavedrive::timelines::{BurstShape, ReplayTimeline};
use wavedrive::types::SimTime;
use wavedrive::{
    BindingError, BindingRegistry, BitVector, ReplayConfigBuilder, ReplayHarness, Scheduler,
    SignalRecord, TimingParams, Trace,
};

// ============================================================================
// Benchmark Fixtures
// ============================================================================

/// A sink that only counts writes (no allocation)
#[derive(Default)]
struct CountingSink {
    count: u64,
}

impl OutputBinding for CountingSink {
    fn apply(&mut self, _time: SimTime, value: &BitVector) -> Result<(), BindingError> {
        self.count += value.width() as u64;
        black_box(self.count);
        Ok(())
    }
}

/// A bus signal toggling every `step` units for `events` changes.
fn bus_signal(name: &str, width: usize, events: u64, step: SimTime) -> SignalRecord {
    let mut record = SignalRecord::new(name, width);
    for i in 0..events {
        record
            .push(i * step, BitVector::from_u64(i, width))
            .expect("monotonic fixture");
    }
    record
}

/// A DDR capture with `signals` bus signals and one write burst per
/// 100 time units.
fn ddr_trace(signals: usize, events: u64) -> Trace {
    let mut clk = SignalRecord::new("TOP.clk", 1);
    for i in 0..8 {
        clk.push(i * 10, BitVector::level(i % 2 == 1)).expect("monotonic fixture");
    }
    let mut gate = SignalRecord::new("TOP.writeEnable", 1);
    for i in 0..events / 10 {
        gate.push(i * 100 + 40, BitVector::high()).expect("monotonic fixture");
        gate.push(i * 100 + 60, BitVector::low()).expect("monotonic fixture");
    }

    let mut records = vec![
        clk,
        SignalRecord::from_pairs("TOP.phaseCount", 2, &[(0, "10")]).expect("fixture"),
        gate,
    ];
    for s in 0..signals {
        records.push(bus_signal(&format!("TOP.BUS{s}"), 8, events, 10));
    }
    Trace::from_signals(records).expect("valid fixture")
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_scheduler_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_replay");

    for timelines in [1usize, 16, 128] {
        let records: Vec<_> = (0..timelines)
            .map(|i| bus_signal(&format!("BUS{i}"), 16, 1_000, 3 + i as SimTime % 7))
            .collect();
        group.throughput(Throughput::Elements(timelines as u64 * 1_000));

        group.bench_with_input(BenchmarkId::from_parameter(timelines), &records, |b, records| {
            b.iter(|| {
                let mut bindings = BindingRegistry::new();
                for i in 0..records.len() {
                    bindings.register(format!("out{i}"), CountingSink::default());
                }
                let mut scheduler = Scheduler::new(bindings);
                let handles: Vec<_> = records
                    .iter()
                    .enumerate()
                    .map(|(i, r)| {
                        scheduler.spawn(Box::new(ReplayTimeline::new(r, format!("out{i}"))))
                    })
                    .collect();
                scheduler.join_all(&handles).expect("replay succeeds");
                black_box(scheduler.stats().writes)
            });
        });
    }

    group.finish();
}

fn bench_ddr_harness(c: &mut Criterion) {
    let mut group = c.benchmark_group("ddr_harness");

    for events in [100u64, 1_000, 10_000] {
        let trace = ddr_trace(8, events);
        let mut builder = ReplayConfigBuilder::new("clk", "phaseCount")
            .scope("TOP")
            .data_rate(2)
            .clock("ck", Some("ck_n"))
            .strobe("writeEnable", "dqs", Some("dqs_n"));
        for s in 0..8 {
            builder = builder.map(format!("BUS{s}"), format!("bus{s}"));
        }
        let config = builder.build().expect("valid config");
        let harness = ReplayHarness::new(&trace, config).expect("timing extracts");

        group.bench_with_input(BenchmarkId::from_parameter(events), &harness, |b, harness| {
            b.iter(|| {
                let mut bindings = BindingRegistry::new();
                for name in harness.config().outputs() {
                    bindings.register(name, CountingSink::default());
                }
                black_box(harness.run(bindings).expect("replay succeeds"))
            });
        });
    }

    group.finish();
}

fn bench_burst_shape(c: &mut Criterion) {
    let timing = TimingParams::new(20, 2, 2).expect("valid timing");

    c.bench_function("burst_shape", |b| {
        b.iter(|| {
            let mut total = 0;
            for window in 1..1_000 {
                if let Some(shape) = BurstShape::compute(black_box(window), &timing) {
                    total += shape.planned_toggles();
                }
            }
            black_box(total)
        });
    });
}

fn bench_bitvector_parse(c: &mut Criterion) {
    let inputs = ["0", "b0101", "01xz01xz01xz01xz", "b1111_0000_1111_0000_1111_0000_1111_0000"];

    c.bench_function("bitvector_parse", |b| {
        b.iter(|| {
            for input in inputs {
                black_box(BitVector::parse(black_box(input)).expect("valid input"));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_scheduler_replay,
    bench_ddr_harness,
    bench_burst_shape,
    bench_bitvector_parse,
);

criterion_main!(benches);
