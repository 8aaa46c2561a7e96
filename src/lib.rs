//! # Wavedrive
//!
//! Waveform-driven stimulus replay for hardware testbenches.
//!
//! A previously captured waveform is replayed onto a device under test's
//! inputs with the original relative timing, while the device clock and a
//! double-data-rate strobe are synthesized from timing parameters measured
//! from the capture itself.
//!
//! ## Design Principles
//!
//! - **Trace-Derived Timing**: Clock period and phase count come from the
//!   trace, never from constants.
//! - **Independent Timelines**: Every replayed signal, the clock and each
//!   strobe burst is its own timeline; relative timing is kept per signal.
//! - **Deterministic Scheduling**: Timelines waking at the same instant
//!   resume in spawn order, so identical inputs give identical outputs.
//! - **Fail Fast**: The first failure cancels every remaining timeline.
//!
//! ## Quick Start
//!
//! ```rust
//! use wavedrive::{BindingRegistry, RecordingSink, ReplayConfigBuilder, ReplayHarness};
//! use wavedrive::trace::{SignalRecord, Trace};
//!
//! let trace = Trace::from_signals([
//!     SignalRecord::from_pairs("TOP.clk", 1, &[(0, "0"), (10, "1"), (20, "0"), (30, "1")])
//!         .unwrap(),
//!     SignalRecord::from_pairs("TOP.phaseCount", 2, &[(0, "10")]).unwrap(),
//!     SignalRecord::from_pairs("TOP.writeEnable", 1, &[(0, "0"), (40, "1"), (50, "0")]).unwrap(),
//! ])
//! .unwrap();
//!
//! let config = ReplayConfigBuilder::new("clk", "phaseCount")
//!     .scope("TOP")
//!     .data_rate(2)
//!     .clock("ck", Some("ck_n"))
//!     .strobe("writeEnable", "dqs", Some("dqs_n"))
//!     .build()
//!     .unwrap();
//!
//! let dqs = RecordingSink::new();
//! let bindings = BindingRegistry::new()
//!     .with("ck", RecordingSink::new())
//!     .with("ck_n", RecordingSink::new())
//!     .with("dqs", dqs.clone())
//!     .with("dqs_n", RecordingSink::new());
//!
//! let report = ReplayHarness::new(&trace, config).unwrap().run(bindings).unwrap();
//! assert_eq!(report.bursts, 1);
//! assert_eq!(dqs.times(), vec![40, 50]);
//! println!("{}", report.to_json());
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use wavedrive::config::ReplayConfig;
//!
//! let config = ReplayConfig::from_file("replay.yaml")?;
//! wavedrive::init_logging(&config.log_level);
//! ```

pub mod types;
pub mod logic;
pub mod event;
pub mod trace;
pub mod error;
pub mod timing;
pub mod binding;
pub mod timeline;
pub mod scheduler;
pub mod timelines;
pub mod stats;
pub mod config;
pub mod harness;

// Re-export commonly used types
pub use types::{SimTime, TimelineId};
pub use logic::{BitVector, Logic};
pub use event::Event;
pub use trace::{SignalRecord, Trace, TraceError};
pub use error::{ReplayError, ReplayResult};
pub use timing::TimingParams;
pub use binding::{BindingError, BindingRegistry, OutputBinding, RecordingSink};
pub use timeline::{Step, Timeline, TimelineContext, TimelineHandle};
pub use scheduler::{Scheduler, TimelineStatus};
pub use stats::{ReplayReport, SchedulerStats};
pub use config::{ConfigError, ReplayConfig, ReplayConfigBuilder};
pub use harness::ReplayHarness;

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging. `RUST_LOG`
/// overrides `level` when set.
///
/// # Example
///
/// ```rust,ignore
/// wavedrive::init_logging("debug");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
