//! Replay run configuration.
//!
//! A run is described by names only: which trace signals carry the clock,
//! the phase count and the transfer gate, which trace signals are replayed
//! onto which output bindings, and where the synthesized clock and strobe
//! go. Configurations load from YAML or JSON.
//!
//! # Configuration File Structure
//!
//! ```yaml
//! scope: TOP
//! timing:
//!   clock_signal: clk
//!   phase_count_signal: phaseCount
//!   data_rate: 2
//! clock:
//!   output: ck
//!   complement: ck_n
//! strobe:
//!   gate_signal: writeEnable
//!   strobe: dqs
//!   complement: dqs_n
//! signals:
//!   - signal: ADDR
//!     output: addr
//!   - signal: CKE
//!     output: cke
//!     delay: 2
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::types::SimTime;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Trace signals timing is measured from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Reference clock whose first two rising edges give the period
    pub clock_signal: String,

    /// Signal whose final value is the phase count
    pub phase_count_signal: String,

    /// Transfers per strobe period (2 for DDR)
    #[serde(default = "default_data_rate")]
    pub data_rate: u64,
}

fn default_data_rate() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Synthesized device clock outputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// True clock binding
    pub output: String,

    /// Complement clock binding
    #[serde(default)]
    pub complement: Option<String>,
}

/// Gated strobe synthesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrobeConfig {
    /// Trace signal whose pulses mark transfer windows
    pub gate_signal: String,

    /// True strobe binding
    pub strobe: String,

    /// Complement strobe binding
    #[serde(default)]
    pub complement: Option<String>,
}

/// One replayed trace signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalMapping {
    /// Trace signal (relative to `scope` when one is set)
    pub signal: String,

    /// Output binding name
    pub output: String,

    /// Extra delay added to every wait of this replay
    #[serde(default)]
    pub delay: SimTime,
}

/// Complete replay configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Hierarchy prefix joined to every trace signal name with `.`
    #[serde(default)]
    pub scope: Option<String>,

    pub timing: TimingConfig,

    #[serde(default)]
    pub clock: Option<ClockConfig>,

    #[serde(default)]
    pub strobe: Option<StrobeConfig>,

    #[serde(default)]
    pub signals: Vec<SignalMapping>,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ReplayConfig {
    /// Creates a configuration with only the timing signals set.
    pub fn new(clock_signal: impl Into<String>, phase_count_signal: impl Into<String>) -> Self {
        Self {
            scope: None,
            timing: TimingConfig {
                clock_signal: clock_signal.into(),
                phase_count_signal: phase_count_signal.into(),
                data_rate: default_data_rate(),
            },
            clock: None,
            strobe: None,
            signals: Vec::new(),
            log_level: default_log_level(),
        }
    }

    /// Full trace name of `net` under the configured scope.
    pub fn resolve(&self, net: &str) -> String {
        match &self.scope {
            Some(scope) => format!("{scope}.{net}"),
            None => net.to_string(),
        }
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: ReplayConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: ReplayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Validates the configuration.
    ///
    /// Every output binding may be written by at most one source, which is
    /// what keeps a single write per binding per instant.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timing.data_rate == 0 {
            return Err(ConfigError::Validation("data_rate must be at least 1".into()));
        }
        if self.timing.clock_signal.is_empty() || self.timing.phase_count_signal.is_empty() {
            return Err(ConfigError::Validation(
                "clock_signal and phase_count_signal must be set".into(),
            ));
        }

        let mut outputs = HashSet::new();
        let mut claim = |name: &str, owner: &str| -> ConfigResult<()> {
            if name.is_empty() {
                return Err(ConfigError::Validation(format!("{owner} has an empty output name")));
            }
            if !outputs.insert(name.to_string()) {
                return Err(ConfigError::Validation(format!(
                    "Output {name} is driven more than once ({owner})"
                )));
            }
            Ok(())
        };

        if let Some(clock) = &self.clock {
            claim(&clock.output, "clock")?;
            if let Some(complement) = &clock.complement {
                claim(complement, "clock complement")?;
            }
        }
        if let Some(strobe) = &self.strobe {
            if strobe.gate_signal.is_empty() {
                return Err(ConfigError::Validation("strobe gate_signal must be set".into()));
            }
            claim(&strobe.strobe, "strobe")?;
            if let Some(complement) = &strobe.complement {
                claim(complement, "strobe complement")?;
            }
        }
        for mapping in &self.signals {
            if mapping.signal.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Mapping to {} has an empty signal name",
                    mapping.output
                )));
            }
            claim(&mapping.output, &mapping.signal)?;
        }

        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every output binding name the configuration writes to.
    pub fn outputs(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if let Some(clock) = &self.clock {
            names.push(clock.output.as_str());
            names.extend(clock.complement.as_deref());
        }
        if let Some(strobe) = &self.strobe {
            names.push(strobe.strobe.as_str());
            names.extend(strobe.complement.as_deref());
        }
        names.extend(self.signals.iter().map(|m| m.output.as_str()));
        names
    }
}

/// Builder for creating ReplayConfig programmatically.
pub struct ReplayConfigBuilder {
    config: ReplayConfig,
}

impl ReplayConfigBuilder {
    /// Creates a new builder measuring timing from the given signals.
    pub fn new(clock_signal: impl Into<String>, phase_count_signal: impl Into<String>) -> Self {
        Self {
            config: ReplayConfig::new(clock_signal, phase_count_signal),
        }
    }

    /// Sets the hierarchy prefix.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.config.scope = Some(scope.into());
        self
    }

    /// Sets the data rate.
    pub fn data_rate(mut self, rate: u64) -> Self {
        self.config.timing.data_rate = rate;
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Synthesizes a clock on `output`.
    pub fn clock(mut self, output: impl Into<String>, complement: Option<&str>) -> Self {
        self.config.clock = Some(ClockConfig {
            output: output.into(),
            complement: complement.map(str::to_string),
        });
        self
    }

    /// Synthesizes a gated strobe.
    pub fn strobe(
        mut self,
        gate_signal: impl Into<String>,
        strobe: impl Into<String>,
        complement: Option<&str>,
    ) -> Self {
        self.config.strobe = Some(StrobeConfig {
            gate_signal: gate_signal.into(),
            strobe: strobe.into(),
            complement: complement.map(str::to_string),
        });
        self
    }

    /// Replays `signal` onto `output`.
    pub fn map(self, signal: impl Into<String>, output: impl Into<String>) -> Self {
        self.map_delayed(signal, output, 0)
    }

    /// Replays `signal` onto `output` with an extra per-wait delay.
    pub fn map_delayed(
        mut self,
        signal: impl Into<String>,
        output: impl Into<String>,
        delay: SimTime,
    ) -> Self {
        self.config.signals.push(SignalMapping {
            signal: signal.into(),
            output: output.into(),
            delay,
        });
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<ReplayConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
