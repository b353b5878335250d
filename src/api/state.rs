//! API shared state

use std::sync::Arc;

use crate::actors::ProberHandle;
use crate::clock::Clock;
use crate::heartbeat::HeartbeatRecorder;
use crate::id::IdGenerator;
use crate::registry::ServerRegistry;
use crate::status::StatusBoard;
use crate::storage::StorageBackend;

/// Shared state passed to all API handlers
///
/// Cheap to clone; every component is behind an `Arc`.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<ServerRegistry>,
    pub recorder: Arc<HeartbeatRecorder>,
    pub board: Arc<StatusBoard>,
    pub storage: Arc<dyn StorageBackend>,

    /// Present when the hub runs a prober actor
    pub prober: Option<ProberHandle>,
}

impl ApiState {
    /// Wire the core components around one storage backend, id generator and clock
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        ids: Arc<IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = Arc::new(ServerRegistry::new(
            storage.clone(),
            ids.clone(),
            clock.clone(),
        ));
        let recorder = Arc::new(HeartbeatRecorder::new(
            registry.clone(),
            storage.clone(),
            ids,
            clock.clone(),
        ));
        let board = Arc::new(StatusBoard::new(storage.clone(), clock));

        Self {
            registry,
            recorder,
            board,
            storage,
            prober: None,
        }
    }

    pub fn with_prober(mut self, prober: ProberHandle) -> Self {
        self.prober = Some(prober);
        self
    }
}
