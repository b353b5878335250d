//! Prober actor driving cycles against real components

use std::sync::Arc;
use std::time::Duration;

use fleet_monitor::{actors::ProberHandle, storage::EventRange};

use crate::helpers::*;

#[tokio::test]
async fn test_actor_probes_on_start_and_on_demand() {
    let fleet = Fleet::in_memory();
    let web = fleet.registry.register("web", Some("10.0.0.1")).await.unwrap();
    let db = fleet.registry.register("db", Some("10.0.0.2")).await.unwrap();

    let prober = Arc::new(fleet.prober(TablePinger::up(&["10.0.0.1"])));
    let handle = ProberHandle::spawn(prober, Duration::from_secs(3600));

    fleet.advance_secs(1);
    let report = handle.probe_now().await.unwrap();
    assert_eq!(report.probed, 2);
    assert_eq!(report.reachable, 1);

    handle.shutdown().await;

    // the explicit cycle, plus the start-up tick if it ran first
    let web_rows = fleet
        .storage
        .query_reachability(EventRange::since(web.id, 0))
        .await
        .unwrap();
    let db_rows = fleet
        .storage
        .query_reachability(EventRange::since(db.id, 0))
        .await
        .unwrap();
    assert_eq!(web_rows.len(), db_rows.len());
    assert!(!web_rows.is_empty());
    assert!(web_rows.iter().all(|r| r.reachable));
    assert!(db_rows.iter().all(|r| !r.reachable));
}

#[tokio::test]
async fn test_unknown_address_is_recorded_unreachable() {
    let fleet = Fleet::in_memory();
    let server = fleet.registry.register("quiet", None).await.unwrap();

    let report = fleet
        .prober(fleet_monitor::prober::SystemPinger::default())
        .run_cycle()
        .await
        .unwrap();

    assert_eq!(report.written, 1);
    assert_eq!(report.reachable, 0);
    let rows = fleet
        .storage
        .query_reachability(EventRange::since(server.id, 0))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].reachable);
    assert_eq!(rows[0].latency_ms, None);
}
