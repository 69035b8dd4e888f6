//! Helpers shared by the server integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::{IpAddr, Ipv4Addr, TcpListener};

use mockex_core::exposition::{parse_snapshot, Snapshot};
use mockex_core::model::SeriesValue;
use mockex_server::config::ExporterConfig;
use rand::Rng;

pub const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Find `len` consecutive ports that are free right now.
pub fn free_port_range(len: u16) -> u16 {
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let base: u16 = rng.gen_range(20_000..60_000);
        let held: Vec<TcpListener> = (0..len)
            .filter_map(|i| TcpListener::bind((LOCALHOST, base + i)).ok())
            .collect();
        if held.len() == usize::from(len) {
            return base;
        }
    }
    panic!("no free range of {len} ports");
}

/// Config on localhost for `vector`, chaos disabled.
pub fn config(vector: &str, base: u16, len: u16) -> ExporterConfig {
    let mut cfg = ExporterConfig::with_mock(format!("tests/vectors/{vector}"));
    cfg.web.host = LOCALHOST;
    cfg.web.port = base;
    cfg.web.length = len;
    cfg.web.shutdown_grace_ms = 2000;
    cfg.chaos.coefficient = 0.0;
    cfg
}

pub struct Scrape {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

pub async fn scrape(port: u16, path: &str) -> Scrape {
    let resp = reqwest::get(format!("http://127.0.0.1:{port}{path}"))
        .await
        .expect("request should reach the listener");
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = resp.text().await.unwrap();
    Scrape {
        status,
        content_type,
        body,
    }
}

/// Parse a response body with the snapshot parser.
pub fn parse(body: &str) -> Snapshot {
    parse_snapshot(body).unwrap_or_else(|e| panic!("response is not valid exposition text: {e}\n{body}"))
}

/// Value of the first series of a counter or gauge family.
pub fn first_scalar(snap: &Snapshot, family: &str) -> f64 {
    let fam = snap
        .registry
        .get(family)
        .unwrap_or_else(|| panic!("family {family} missing"));
    match fam.series()[0].value() {
        SeriesValue::Counter(c) => c.get(),
        SeriesValue::Gauge(g) => g.get(),
        other => panic!("{family} is not a scalar: {other:?}"),
    }
}
