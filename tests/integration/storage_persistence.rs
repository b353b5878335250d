//! Integration tests for storage persistence
//!
//! These tests verify that:
//! - Servers and events survive a reopen of the SQLite file
//! - The unique name constraint settles concurrent registrations
//! - Range queries come back ordered

use std::sync::Arc;

use fleet_monitor::storage::{EventRange, StorageBackend, sqlite::SqliteBackend};
use tempfile::tempdir;

use crate::helpers::*;

#[tokio::test]
async fn test_history_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("nested").join("status.db");

    let server_id = {
        let backend = Arc::new(SqliteBackend::new(&db_path).await.unwrap());
        let fleet = Fleet::new(backend.clone());

        let recorded = fleet
            .recorder
            .record(report_for("web", 25.0, Some(50.0)), "10.0.0.1", None)
            .await
            .unwrap();
        fleet
            .prober(TablePinger::up(&["10.0.0.1"]))
            .run_cycle()
            .await
            .unwrap();

        backend.close().await.unwrap();
        recorded.server_id
    };

    let backend = SqliteBackend::new(&db_path).await.unwrap();

    let server = backend.get_server(server_id).await.unwrap().unwrap();
    assert_eq!(server.name, "web");
    assert_eq!(server.address, "10.0.0.1");

    let heartbeats = backend
        .query_heartbeats(EventRange::since(server_id, 0))
        .await
        .unwrap();
    assert_eq!(heartbeats.len(), 1);
    assert_eq!(heartbeats[0].cpu_load, Some(25.0));
    assert_eq!(heartbeats[0].timestamp, T0_SECS);

    let pings = backend
        .query_reachability(EventRange::since(server_id, 0))
        .await
        .unwrap();
    assert_eq!(pings.len(), 1);
    assert!(pings[0].reachable);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_on_sqlite() {
    let temp_dir = tempdir().unwrap();
    let backend = Arc::new(
        SqliteBackend::new(temp_dir.path().join("race.db"))
            .await
            .unwrap(),
    );
    let fleet = Fleet::new(backend);

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let registry = fleet.registry.clone();
            tokio::spawn(async move { registry.register("contested", None).await })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap().id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(fleet.registry.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_page_from_sqlite() {
    let temp_dir = tempdir().unwrap();
    let backend = Arc::new(
        SqliteBackend::new(temp_dir.path().join("page.db"))
            .await
            .unwrap(),
    );
    let fleet = Fleet::new(backend);

    for minute in 0..10 {
        fleet
            .recorder
            .record(report_for("web", minute as f64, Some(40.0)), "10.0.0.1", None)
            .await
            .unwrap();
        fleet.advance_secs(60);
    }

    let page = fleet.board.page().await.unwrap();
    let web = &page.servers[0];

    assert_eq!(web.current.cpu, Some(9.0));
    let filled: Vec<_> = web
        .resource_series
        .iter()
        .filter_map(|p| p.cpu)
        .collect();
    assert_eq!(filled.len(), 1);
    assert_eq!(filled[0], 4.5);
}
