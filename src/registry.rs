//! Server identity resolution
//!
//! Agents identify themselves either by a previously issued server id or by a
//! name. Names self-register on first use, so resolution is idempotent by
//! name: every report under the same name lands on the same identity and
//! keeps the stored address fresh.
//!
//! ## Concurrent first registrations
//!
//! Lookup-then-insert is racy. The storage layer holds a unique constraint on
//! the name; the loser of a race gets `StorageError::Conflict`, re-reads the
//! winner's row and returns it.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::error::{MonitorError, MonitorResult};
use crate::id::{Id, IdGenerator};
use crate::storage::{ServerRow, StorageBackend, StorageError, UNKNOWN_ADDRESS};

/// Attempts to settle a contested first registration
const MAX_REGISTRATION_ATTEMPTS: usize = 3;

/// What a caller knows about the server it wants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerLookup {
    pub id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
}

impl ServerLookup {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Blank strings count as absent
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub struct ServerRegistry {
    storage: Arc<dyn StorageBackend>,
    ids: Arc<IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl ServerRegistry {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        ids: Arc<IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            ids,
            clock,
        }
    }

    /// Resolve a lookup to a durable server
    ///
    /// - id present: direct lookup, a miss is `NotFound`
    /// - otherwise name present: found rows get their address refreshed,
    ///   unknown names are registered
    /// - neither: `UnresolvableServer`
    #[instrument(skip(self))]
    pub async fn resolve(&self, lookup: &ServerLookup) -> MonitorResult<ServerRow> {
        if let Some(raw_id) = present(lookup.id.as_deref()) {
            let id: Id = raw_id
                .parse()
                .map_err(|_| MonitorError::NotFound(raw_id.to_string()))?;

            return self
                .storage
                .get_server(id)
                .await?
                .ok_or_else(|| MonitorError::NotFound(raw_id.to_string()));
        }

        let Some(name) = present(lookup.name.as_deref()) else {
            return Err(MonitorError::UnresolvableServer);
        };

        self.resolve_by_name(name, present(lookup.address.as_deref()))
            .await
    }

    /// Explicit registration entry point, same semantics as resolving by name
    pub async fn register(&self, name: &str, address: Option<&str>) -> MonitorResult<ServerRow> {
        let mut lookup = ServerLookup::by_name(name);
        lookup.address = address.map(str::to_string);
        self.resolve(&lookup).await
    }

    pub async fn get(&self, id: Id) -> MonitorResult<Option<ServerRow>> {
        Ok(self.storage.get_server(id).await?)
    }

    /// Every registered server, newest first
    pub async fn list(&self) -> MonitorResult<Vec<ServerRow>> {
        Ok(self.storage.list_servers().await?)
    }

    async fn resolve_by_name(&self, name: &str, address: Option<&str>) -> MonitorResult<ServerRow> {
        for attempt in 1..=MAX_REGISTRATION_ATTEMPTS {
            if let Some(mut server) = self.storage.get_server_by_name(name).await? {
                if let Some(address) = address {
                    let now = self.clock.now_secs();
                    self.storage
                        .update_server_address(server.id, address, now)
                        .await?;
                    server.address = address.to_string();
                    server.updated_at = now;
                }
                return Ok(server);
            }

            let now = self.clock.now_secs();
            let server = ServerRow {
                id: self.ids.next_id()?,
                name: name.to_string(),
                address: address.unwrap_or(UNKNOWN_ADDRESS).to_string(),
                created_at: now,
                updated_at: now,
                note: None,
            };

            match self.storage.insert_server(server.clone()).await {
                Ok(()) => {
                    info!("registered server {} as {}", server.name, server.id);
                    return Ok(server);
                }
                Err(StorageError::Conflict(reason)) => {
                    debug!("registration of {name} lost a race (attempt {attempt}): {reason}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!("giving up on registering {name} after {MAX_REGISTRATION_ATTEMPTS} conflicts");
        Err(StorageError::Conflict(format!("could not settle registration of '{name}'")).into())
    }
}
