//! Command-line flags. Every flag overrides the matching config file field.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use mockex_core::error::Result;

use crate::config::{self, ExporterConfig};

#[derive(Debug, Parser)]
#[command(name = "mock-exporter", version, about = "Serve a Prometheus snapshot on a range of ports")]
pub struct Cli {
    /// YAML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Sample prom file that requires mocking.
    #[arg(short = 'm', long = "mock")]
    pub mock: Option<PathBuf>,

    /// Path under which to expose metrics.
    #[arg(short = 'p', long = "path")]
    pub path: Option<String>,

    /// Address every listener binds to.
    #[arg(long = "web.host")]
    pub host: Option<IpAddr>,

    /// The starting value of the port.
    #[arg(long = "web.port")]
    pub port: Option<u16>,

    /// Length of the port range. Occupied ports are skipped.
    #[arg(long = "web.length")]
    pub length: Option<u16>,

    /// Chaos coefficient.
    #[arg(short = 'c', long = "chaos")]
    pub chaos: Option<f64>,
}

impl Cli {
    /// Merge flags over the config file (or defaults) and validate.
    pub fn into_config(self) -> Result<ExporterConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::read_file(path)?,
            None => ExporterConfig::with_mock(PathBuf::new()),
        };

        if let Some(mock) = self.mock {
            cfg.mock = mock;
        }
        if let Some(path) = self.path {
            cfg.web.path = path;
        }
        if let Some(host) = self.host {
            cfg.web.host = host;
        }
        if let Some(port) = self.port {
            cfg.web.port = port;
        }
        if let Some(length) = self.length {
            cfg.web.length = length;
        }
        if let Some(chaos) = self.chaos {
            cfg.chaos.coefficient = chaos;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}
