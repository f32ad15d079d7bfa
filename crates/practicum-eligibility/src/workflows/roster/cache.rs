use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::transport::{RosterTransport, TransportError};

#[derive(Debug, Clone)]
struct CachedRoster {
    path: String,
    modified_at: DateTime<Utc>,
    bytes: Arc<[u8]>,
}

/// Single-slot cache of the roster file, refreshed only when the remote mtime changes.
///
/// Filtering happens after the bytes leave the cache, so previews for different programs share
/// one transfer. The slot lock is held across the remote calls, which keeps concurrent callers
/// from racing each other into duplicate transfers.
pub struct RosterCache {
    transport: Arc<dyn RosterTransport>,
    slot: Mutex<Option<CachedRoster>>,
}

impl std::fmt::Debug for RosterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterCache").finish_non_exhaustive()
    }
}

impl RosterCache {
    pub fn new(transport: Arc<dyn RosterTransport>) -> Self {
        Self {
            transport,
            slot: Mutex::new(None),
        }
    }

    /// Return the roster bytes for `remote_path`, transferring them only if the cached copy is
    /// stale or belongs to another path.
    pub async fn get_roster_bytes(&self, remote_path: &str) -> Result<Arc<[u8]>, TransportError> {
        let mut slot = self.slot.lock().await;
        let mut session = self.transport.connect().await?;
        let modified_at = session.modified_at(remote_path).await?;

        if let Some(cached) = slot
            .as_ref()
            .filter(|cached| cached.path == remote_path && cached.modified_at == modified_at)
        {
            debug!(path = remote_path, %modified_at, "roster cache hit");
            return Ok(cached.bytes.clone());
        }

        let bytes: Arc<[u8]> = session.read(remote_path).await?.into();
        drop(session);

        info!(
            path = remote_path,
            %modified_at,
            size = bytes.len(),
            "roster cache refreshed"
        );

        *slot = Some(CachedRoster {
            path: remote_path.to_string(),
            modified_at,
            bytes: bytes.clone(),
        });

        Ok(bytes)
    }

    /// Modification time of the cached copy, if any.
    pub async fn cached_modified_at(&self) -> Option<DateTime<Utc>> {
        self.slot.lock().await.as_ref().map(|cached| cached.modified_at)
    }
}
