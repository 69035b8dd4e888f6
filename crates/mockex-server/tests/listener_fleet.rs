//! End-to-end listener tests on real localhost sockets.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use std::io::Write;
use std::net::{TcpListener, TcpStream};

use futures_util::future::join_all;
use mockex_server::listener::{ListenerState, ShutdownOutcome};
use mockex_server::Exporter;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn occupied_port_is_skipped_and_others_serve() {
    let base = support::free_port_range(3);
    let occupier = TcpListener::bind((support::LOCALHOST, base + 1)).unwrap();

    let exporter = Exporter::start(support::config("basic.prom", base, 3))
        .await
        .unwrap();
    assert_eq!(exporter.bound_ports(), vec![base, base + 2]);
    assert_eq!(exporter.fleet().skipped_ports(), &[base + 1]);
    assert_eq!(exporter.state().metrics().listeners_bound.get(), 2);

    let table = exporter.fleet().table();
    assert_eq!(table.get(base), Some(ListenerState::Serving));
    assert_eq!(table.get(base + 1), Some(ListenerState::Skipped));
    assert_eq!(table.get(base + 2), Some(ListenerState::Serving));

    for port in [base, base + 2] {
        let res = support::scrape(port, "/metrics").await;
        assert_eq!(res.status, 200);
        assert!(res.content_type.starts_with("text/plain"));
        let snap = support::parse(&res.body);
        assert_eq!(support::first_scalar(&snap, "http_requests_total"), 100.0);
        assert_eq!(support::first_scalar(&snap, "queue_depth"), 5.2);
    }

    // The skipped port still belongs to whoever held it.
    let mut stream = TcpStream::connect((support::LOCALHOST, base + 1)).unwrap();
    stream.write_all(b"ping").unwrap();
    let (_, peer) = occupier.accept().unwrap();
    assert_eq!(peer, stream.local_addr().unwrap());

    assert_eq!(exporter.shutdown().await, ShutdownOutcome::Drained);
    assert_eq!(table.get(base), Some(ListenerState::Stopped));
    assert_eq!(table.get(base + 1), Some(ListenerState::Skipped));
    assert_eq!(table.get(base + 2), Some(ListenerState::Stopped));
    assert_eq!(table.count(ListenerState::Stopped), 2);
    assert_eq!(table.ports_in(ListenerState::Skipped), vec![base + 1]);
    assert!(TcpStream::connect((support::LOCALHOST, base)).is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_port_serves_the_same_registry() {
    let base = support::free_port_range(2);
    let mut cfg = support::config("full.prom", base, 2);
    cfg.chaos.coefficient = 5.0;
    cfg.chaos.interval_ms = 10;

    let exporter = Exporter::start(cfg).await.unwrap();
    assert_eq!(exporter.bound_ports().len(), 2);
    assert_eq!(exporter.engine_tasks(), 5);

    let requests = (0..20).map(|i| support::scrape(base + (i % 2), "/metrics"));
    let responses = join_all(requests).await;

    let registry = exporter.state().registry();
    for res in responses {
        assert_eq!(res.status, 200);
        let snap = support::parse(&res.body);
        for fam in registry.families() {
            let got = snap
                .registry
                .get(fam.name())
                .unwrap_or_else(|| panic!("{} missing", fam.name()));
            assert_eq!(got.kind(), fam.kind());
            assert_eq!(got.series().len(), fam.series().len());
        }
    }

    let scrapes = &exporter.state().metrics().scrapes;
    assert_eq!(scrapes.with_label_values(&[&base.to_string()]).get(), 10);
    assert_eq!(scrapes.with_label_values(&[&(base + 1).to_string()]).get(), 10);

    assert_eq!(exporter.shutdown().await, ShutdownOutcome::Drained);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_path_is_not_found_on_every_port() {
    let base = support::free_port_range(2);
    let exporter = Exporter::start(support::config("basic.prom", base, 2))
        .await
        .unwrap();

    for port in [base, base + 1] {
        assert_eq!(support::scrape(port, "/").await.status, 404);
        assert_eq!(support::scrape(port, "/metric").await.status, 404);
    }
    exporter.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn no_bound_port_is_fatal_by_default() {
    let base = support::free_port_range(2);
    let _a = TcpListener::bind((support::LOCALHOST, base)).unwrap();
    let _b = TcpListener::bind((support::LOCALHOST, base + 1)).unwrap();

    let err = Exporter::start(support::config("basic.prom", base, 2))
        .await
        .err()
        .expect("nothing could bind");
    assert_eq!(err.code().as_str(), "NO_LISTENERS");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn no_bound_port_can_be_tolerated() {
    let base = support::free_port_range(2);
    let _a = TcpListener::bind((support::LOCALHOST, base)).unwrap();
    let _b = TcpListener::bind((support::LOCALHOST, base + 1)).unwrap();

    let mut cfg = support::config("basic.prom", base, 2);
    cfg.web.fail_when_unbound = false;
    let exporter = Exporter::start(cfg).await.unwrap();
    assert!(exporter.bound_ports().is_empty());
    assert_eq!(exporter.fleet().skipped_ports(), &[base, base + 1]);
    assert_eq!(exporter.state().metrics().listeners_bound.get(), 0);
    assert_eq!(exporter.shutdown().await, ShutdownOutcome::Drained);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn range_is_clamped_at_the_last_port() {
    let mut cfg = support::config("basic.prom", 65534, 5);
    cfg.web.fail_when_unbound = false;
    let exporter = Exporter::start(cfg).await.unwrap();

    let fleet = exporter.fleet();
    assert!(fleet.bound_count() + fleet.skipped_ports().len() <= 2);
    for port in fleet.bound_ports() {
        assert!(port >= 65534);
    }
    exporter.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_snapshot_fails_before_binding() {
    let base = support::free_port_range(1);
    let err = Exporter::start(support::config("does-not-exist.prom", base, 1))
        .await
        .err()
        .expect("snapshot is missing");
    assert_eq!(err.code().as_str(), "IO");
    TcpListener::bind((support::LOCALHOST, base)).expect("port was never taken");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_until_serves_until_signalled() {
    let base = support::free_port_range(1);
    let cfg = support::config("basic.prom", base, 1);
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(mockex_server::run_until(cfg, async {
        let _ = rx.await;
    }));

    let mut status = 0;
    for _ in 0..50 {
        if let Ok(res) = reqwest::get(format!("http://127.0.0.1:{base}/metrics")).await {
            status = res.status().as_u16();
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(status, 200);

    tx.send(()).unwrap();
    let outcome = server.await.unwrap().unwrap();
    assert_eq!(outcome, ShutdownOutcome::Drained);
}
