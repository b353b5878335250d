//! Concurrency and race condition tests
//!
//! These tests verify thread-safety and concurrent operation:
//! - Id allocation across OS threads with the real clock
//! - Concurrent first reports under one name
//! - Probe cycles running alongside ingest

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use fleet_monitor::{id::IdGenerator, storage::EventRange};

use crate::helpers::*;

#[test]
fn test_ids_unique_across_threads_with_system_clock() {
    let generator = Arc::new(IdGenerator::new(9).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let generator = generator.clone();
            thread::spawn(move || {
                (0..5_000)
                    .map(|_| generator.next_id().unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        let ids = handle.join().unwrap();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for id in ids {
            assert_eq!(id.worker_id(), 9);
            assert!(all.insert(id), "duplicate id {id}");
        }
    }
    assert_eq!(all.len(), 40_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_reports_share_one_server() {
    let fleet = Fleet::in_memory();

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let recorder = fleet.recorder.clone();
            tokio::spawn(async move {
                recorder
                    .record(report_for("burst", i as f64, None), "10.0.0.1", None)
                    .await
            })
        })
        .collect();

    let mut server_ids = HashSet::new();
    let mut heartbeat_ids = HashSet::new();
    for task in tasks {
        let recorded = task.await.unwrap().unwrap();
        server_ids.insert(recorded.server_id);
        heartbeat_ids.insert(recorded.heartbeat_id);
    }

    assert_eq!(server_ids.len(), 1);
    assert_eq!(heartbeat_ids.len(), 32);
    assert_eq!(fleet.registry.list().await.unwrap().len(), 1);

    let server_id = server_ids.into_iter().next().unwrap();
    let rows = fleet
        .storage
        .query_heartbeats(EventRange::since(server_id, 0))
        .await
        .unwrap();
    assert_eq!(rows.len(), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_probe_cycle_alongside_ingest() {
    let fleet = Fleet::in_memory();
    for i in 0..10 {
        fleet
            .registry
            .register(&format!("host-{i}"), Some(&format!("10.0.1.{i}")))
            .await
            .unwrap();
    }
    let prober = Arc::new(fleet.prober(TablePinger::up(&["10.0.1.0", "10.0.1.5"])));

    let cycle = tokio::spawn({
        let prober = prober.clone();
        async move { prober.run_cycle().await }
    });
    let ingest: Vec<_> = (0..10)
        .map(|i| {
            let recorder = fleet.recorder.clone();
            tokio::spawn(async move {
                recorder
                    .record(report_for(&format!("host-{i}"), 5.0, Some(5.0)), "10.0.2.1", None)
                    .await
            })
        })
        .collect();

    for task in ingest {
        task.await.unwrap().unwrap();
    }
    let report = cycle.await.unwrap().unwrap();

    assert_eq!(report.probed, 10);
    assert_eq!(report.written, 10);
    assert_eq!(fleet.registry.list().await.unwrap().len(), 10);
}
