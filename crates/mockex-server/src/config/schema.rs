use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use mockex_core::error::{MockError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    /// Snapshot file in exposition format.
    #[serde(default)]
    pub mock: PathBuf,

    #[serde(default)]
    pub web: WebSection,

    #[serde(default)]
    pub chaos: ChaosSection,
}

impl ExporterConfig {
    /// Defaults for everything except the snapshot path.
    pub fn with_mock(mock: impl Into<PathBuf>) -> Self {
        Self {
            mock: mock.into(),
            web: WebSection::default(),
            chaos: ChaosSection::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mock.as_os_str().is_empty() {
            return Err(MockError::Config("mock snapshot path is required".into()));
        }

        self.web.validate()?;
        self.chaos.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebSection {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// URL path the snapshot is exposed under.
    #[serde(default = "default_path")]
    pub path: String,

    /// First port of the range.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of consecutive ports to try.
    #[serde(default = "default_length")]
    pub length: u16,

    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Append process CPU/memory collectors to every response.
    #[serde(default = "default_true")]
    pub process_metrics: bool,

    /// Treat a range where no port could be bound as a startup failure.
    #[serde(default = "default_true")]
    pub fail_when_unbound: bool,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            path: default_path(),
            port: default_port(),
            length: default_length(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            process_metrics: true,
            fail_when_unbound: true,
        }
    }
}

impl WebSection {
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(MockError::Config("web.path must start with '/'".into()));
        }
        if self.path.contains([':', '*']) {
            return Err(MockError::Config(
                "web.path must be a literal path without ':' or '*'".into(),
            ));
        }
        if self.port == 0 {
            return Err(MockError::Config("web.port must be between 1 and 65535".into()));
        }
        if self.length == 0 {
            return Err(MockError::Config("web.length must be at least 1".into()));
        }
        if self.shutdown_grace_ms > 120_000 {
            return Err(MockError::Config(
                "web.shutdown_grace_ms must be at most 120000".into(),
            ));
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_path() -> String {
    "/metrics".into()
}
fn default_port() -> u16 {
    10000
}
fn default_length() -> u16 {
    50
}
fn default_shutdown_grace_ms() -> u64 {
    5000
}
fn default_true() -> bool {
    true
}

/// How perturbation work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// One task per counter/gauge series.
    #[default]
    PerSeries,
    /// One task walking every series each tick.
    Consolidated,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChaosSection {
    /// Volatility coefficient. `0` disables perturbation.
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default)]
    pub schedule: Schedule,

    /// Fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ChaosSection {
    fn default() -> Self {
        Self {
            coefficient: default_coefficient(),
            interval_ms: default_interval_ms(),
            schedule: Schedule::default(),
            seed: None,
        }
    }
}

impl ChaosSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.coefficient.is_finite() && self.coefficient >= 0.0) {
            return Err(MockError::Config(
                "chaos.coefficient must be a finite number >= 0".into(),
            ));
        }
        if !(10..=60_000).contains(&self.interval_ms) {
            return Err(MockError::Config(
                "chaos.interval_ms must be between 10 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn is_enabled(&self) -> bool {
        self.coefficient > 0.0
    }
}

fn default_coefficient() -> f64 {
    1.0
}
fn default_interval_ms() -> u64 {
    1000
}
