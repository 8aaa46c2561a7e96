//! DDR Replay Example
//!
//! This example replays a small built-in capture twice:
//! - A DDR interface: differential clock `ck`/`ck_n`, a gated strobe
//!   `dqs`/`dqs_n` with its complement, and two bus signals
//! - An SDR interface: a plain `Clk` with no complement and no strobe,
//!   plus the same bus signals
//!
//! Both runs measure the clock period and phase count from the capture
//! itself before any timeline is spawned.
//!
//! Run with: `cargo run --example ddr_replay`

use wavedrive::types::SimTime;
use wavedrive::{
    BindingRegistry, RecordingSink, ReplayConfig, ReplayConfigBuilder, ReplayHarness,
    ReplayResult, SignalRecord, Trace,
};

// ============================================================================
// Capture Layout
// ============================================================================

const SCOPE: &str = "TOP";
const CLOCK_NET: &str = "clk";
const PHASE_COUNT_NET: &str = "phaseCount";
const GATE_NET: &str = "writeEnable";
const DDR_RATE: u64 = 2;

// Bus nets and the DUT inputs they drive
const BUS: [(&str, &str); 2] = [("ADDR", "addr"), ("CKE", "cke")];

// ============================================================================
// Built-in Capture
// ============================================================================

/// A 20-unit reference clock, two phases and two write windows.
fn capture() -> ReplayResult<Trace> {
    let trace = Trace::from_signals([
        SignalRecord::from_pairs(
            "TOP.clk",
            1,
            &[(0, "x"), (5, "0"), (10, "1"), (20, "0"), (30, "1"), (40, "0"), (52, "1")],
        )?,
        SignalRecord::from_pairs("TOP.phaseCount", 3, &[(0, "001"), (8, "010")])?,
        SignalRecord::from_pairs(
            "TOP.writeEnable",
            1,
            &[(0, "0"), (40, "1"), (50, "0"), (100, "1"), (105, "0")],
        )?,
        SignalRecord::from_pairs("TOP.ADDR", 4, &[(5, "0000"), (45, "0101"), (60, "1111")])?,
        SignalRecord::from_pairs("TOP.CKE", 1, &[(0, "0"), (20, "1")])?,
    ])?;
    Ok(trace)
}

// ============================================================================
// Harness Configurations
// ============================================================================

fn ddr_config() -> ReplayResult<ReplayConfig> {
    let mut builder = ReplayConfigBuilder::new(CLOCK_NET, PHASE_COUNT_NET)
        .scope(SCOPE)
        .data_rate(DDR_RATE)
        .clock("ck", Some("ck_n"))
        .strobe(GATE_NET, "dqs", Some("dqs_n"));
    for (net, output) in BUS {
        builder = builder.map(net, output);
    }
    Ok(builder.build()?)
}

fn sdr_config() -> ReplayResult<ReplayConfig> {
    let mut builder = ReplayConfigBuilder::new(CLOCK_NET, PHASE_COUNT_NET)
        .scope(SCOPE)
        .clock("Clk", None);
    for (net, output) in BUS {
        builder = builder.map(net, output);
    }
    Ok(builder.build()?)
}

// ============================================================================
// Runner
// ============================================================================

/// Runs one harness instantiation with a recording sink per output and
/// prints what each output saw.
fn replay(label: &str, trace: &Trace, config: ReplayConfig) -> ReplayResult<()> {
    let harness = ReplayHarness::new(trace, config)?;

    let mut bindings = BindingRegistry::new();
    let mut sinks = Vec::new();
    for name in harness.config().outputs() {
        let sink = RecordingSink::new();
        bindings.register(name, sink.clone());
        sinks.push((name.to_string(), sink));
    }

    let report = harness.run(bindings)?;

    println!("--- {label} ---");
    println!(
        "Timing: period {} / {} phases / rate {} -> half period {}",
        report.timing.clock_period,
        report.timing.phase_count,
        report.timing.data_rate,
        report.timing.half_period(),
    );
    for (name, sink) in &sinks {
        let writes: Vec<String> = sink
            .records()
            .iter()
            .map(|(time, value)| format!("{time}:{value}"))
            .collect();
        println!("  {name:>6}: {}", writes.join(" "));
    }
    let end: SimTime = report.final_time();
    println!("Finished at t={end} after {} bursts", report.bursts);
    println!("{}", serde_json::to_string_pretty(&report.to_json()).unwrap_or_default());
    println!();
    Ok(())
}

fn main() -> ReplayResult<()> {
    wavedrive::init_logging("info");

    let trace = capture()?;
    println!("Capture: {} signals ending at t={}", trace.len(), trace.end_time());
    println!();

    replay("DDR with complements", &trace, ddr_config()?)?;
    replay("SDR without complements", &trace, sdr_config()?)?;
    Ok(())
}
