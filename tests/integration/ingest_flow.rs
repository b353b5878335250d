//! End-to-end flow over the in-memory backend
//!
//! Reports and probe cycles go in through the public components; the status
//! page that comes out must reflect both axes.

use fleet_monitor::{
    aggregate::PingState,
    health::{ReachabilityHealth, ReportingHealth},
    status::OverallStatus,
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_status_page_tracks_reports_and_probes() {
    let fleet = Fleet::in_memory();

    // t0: both agents report, both hosts answer pings
    fleet
        .recorder
        .record(report_for("web", 10.0, Some(30.0)), "10.0.0.1", None)
        .await
        .unwrap();
    fleet
        .recorder
        .record(report_for("db", 50.0, Some(70.0)), "10.0.0.2", None)
        .await
        .unwrap();
    fleet
        .prober(TablePinger::up(&["10.0.0.1", "10.0.0.2"]))
        .run_cycle()
        .await
        .unwrap();

    // t0 + 5 min: both report again, db stops answering pings
    fleet.advance_secs(300);
    fleet
        .recorder
        .record(report_for("web", 12.0, Some(31.0)), "10.0.0.1", None)
        .await
        .unwrap();
    fleet
        .recorder
        .record(report_for("db", 55.0, None), "10.0.0.2", None)
        .await
        .unwrap();
    let report = fleet
        .prober(TablePinger::up(&["10.0.0.1"]))
        .run_cycle()
        .await
        .unwrap();
    assert_eq!((report.probed, report.reachable, report.written), (2, 1, 2));

    // slots end at `now` exclusive
    fleet.advance_secs(1);
    let page = fleet.board.page().await.unwrap();
    assert_eq!(page.overall_status, OverallStatus::Warn);

    let db = page.servers.iter().find(|s| s.name == "db").unwrap();
    assert_eq!(db.reachability, ReachabilityHealth::Warn);
    assert_eq!(db.reporting, ReportingHealth::Ok);
    assert_eq!(db.current.cpu, Some(55.0));
    assert_eq!(db.current.mem, None);

    let web = page.servers.iter().find(|s| s.name == "web").unwrap();
    assert_eq!(web.reachability, ReachabilityHealth::Ok);
    assert_eq!(web.timeline.len(), 288);
    assert_eq!(web.timeline.iter().filter(|s| s.heartbeat == 1).count(), 2);
    assert_eq!(
        web.timeline.iter().filter(|s| s.ping == PingState::Ok).count(),
        2
    );

    // nobody has reported for 201 s
    fleet.advance_secs(200);
    let page = fleet.board.page().await.unwrap();
    assert_eq!(page.overall_status, OverallStatus::Error);
    assert!(
        page.servers
            .iter()
            .all(|s| s.reporting == ReportingHealth::Down)
    );
}

#[tokio::test]
async fn test_new_source_address_is_probed_next_cycle() {
    let fleet = Fleet::in_memory();

    let first = fleet
        .recorder
        .record(report_for("mover", 1.0, None), "10.0.0.1", None)
        .await
        .unwrap();
    fleet.advance_secs(60);
    let second = fleet
        .recorder
        .record(report_for("mover", 1.0, None), "10.0.0.9", None)
        .await
        .unwrap();
    assert_eq!(first.server_id, second.server_id);

    let server = fleet.registry.get(first.server_id).await.unwrap().unwrap();
    assert_eq!(server.address, "10.0.0.9");

    let report = fleet
        .prober(TablePinger::up(&["10.0.0.9"]))
        .run_cycle()
        .await
        .unwrap();
    assert_eq!(report.reachable, 1);
}

#[tokio::test]
async fn test_detail_holds_last_day_only() {
    let fleet = Fleet::in_memory();

    let old = fleet
        .recorder
        .record(report_for("web", 1.0, None), "10.0.0.1", None)
        .await
        .unwrap();
    fleet.advance_secs(2 * 86_400);
    fleet
        .recorder
        .record(report_for("web", 2.0, None), "10.0.0.1", None)
        .await
        .unwrap();

    let detail = fleet.board.detail(old.server_id).await.unwrap();

    assert_eq!(detail.heartbeat_data.len(), 1);
    assert_eq!(detail.heartbeat_data[0].cpu_load, Some(2.0));
}
