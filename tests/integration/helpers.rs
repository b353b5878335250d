//! Helper functions for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fleet_monitor::{
    clock::ManualClock,
    heartbeat::{HeartbeatRecorder, HeartbeatReport},
    id::{EPOCH_MILLIS, IdGenerator},
    prober::{Pinger, ProbeFailure, ProbeSettings, ReachabilityProber},
    registry::ServerRegistry,
    status::StatusBoard,
    storage::{MemoryBackend, StorageBackend},
};

/// 2024-06-01T00:00:00Z
pub const T0_SECS: i64 = EPOCH_MILLIS / 1000 + 152 * 86_400;

/// Pinger answering from a fixed address table; unknown addresses fail
#[derive(Debug, Default, Clone)]
pub struct TablePinger {
    pub reachable: HashMap<String, Option<f64>>,
}

impl TablePinger {
    pub fn up(addresses: &[&str]) -> Self {
        Self {
            reachable: addresses.iter().map(|a| (a.to_string(), Some(1.0))).collect(),
        }
    }
}

#[async_trait]
impl Pinger for TablePinger {
    async fn ping(&self, address: &str) -> Result<Option<f64>, ProbeFailure> {
        self.reachable
            .get(address)
            .copied()
            .ok_or_else(|| ProbeFailure::ExitStatus("exit status: 1".to_string()))
    }
}

/// Every core component wired around one backend and one manual clock
pub struct Fleet {
    pub storage: Arc<dyn StorageBackend>,
    pub clock: Arc<ManualClock>,
    pub ids: Arc<IdGenerator>,
    pub registry: Arc<ServerRegistry>,
    pub recorder: Arc<HeartbeatRecorder>,
    pub board: StatusBoard,
}

impl Fleet {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let clock = Arc::new(ManualClock::from_secs(T0_SECS));
        let ids = Arc::new(IdGenerator::with_clock(1, clock.clone()).unwrap());
        let registry = Arc::new(ServerRegistry::new(
            storage.clone(),
            ids.clone(),
            clock.clone(),
        ));
        let recorder = Arc::new(HeartbeatRecorder::new(
            registry.clone(),
            storage.clone(),
            ids.clone(),
            clock.clone(),
        ));
        let board = StatusBoard::new(storage.clone(), clock.clone());

        Self {
            storage,
            clock,
            ids,
            registry,
            recorder,
            board,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn prober(&self, pinger: impl Pinger + 'static) -> ReachabilityProber {
        ReachabilityProber::new(
            self.storage.clone(),
            self.ids.clone(),
            self.clock.clone(),
            Arc::new(pinger),
            ProbeSettings::default(),
        )
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance_millis(secs * 1000);
    }
}

pub fn report_for(name: &str, cpu: f64, mem: Option<f64>) -> HeartbeatReport {
    HeartbeatReport {
        server_name: Some(name.to_string()),
        cpu_load: Some(cpu),
        mem_load: mem,
        up_bytes: 1_024,
        down_bytes: 4_096,
        ..Default::default()
    }
}
