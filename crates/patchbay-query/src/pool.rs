use crate::error::{QueryError, Result};
use crate::traits::{Connection, DatasourceConfig, DatasourcePlugin};
use crate::types::ConnectionIdentity;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Per-identity pool slot.
///
/// The slot mutex is the only mutual exclusion in the pool: it serializes
/// creation for one identity without blocking lookups for any other.
struct Slot {
    connection: Option<Arc<dyn Connection>>,
    /// Set when the slot has been removed from the map, either by
    /// `invalidate` or by a failed creation. Waiters that acquire a retired
    /// slot take the shared failure if one is recorded, otherwise they
    /// re-fetch from the map instead of installing a connection into an
    /// orphaned slot.
    retired: bool,
    /// Outcome of a failed creation, handed to every lookup that was queued
    /// on this slot while the attempt ran.
    failure: Option<Arc<QueryError>>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            connection: None,
            retired: false,
            failure: None,
        }
    }
}

/// Creation failure propagated to lookups queued behind the one attempt.
#[derive(Debug)]
struct SharedCreateError(Arc<QueryError>);

impl fmt::Display for SharedCreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SharedCreateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0.as_ref())
    }
}

fn shared_failure(err: &Arc<QueryError>) -> QueryError {
    let message = match err.as_ref() {
        QueryError::Connection { message, .. } => message.clone(),
        other => other.to_string(),
    };
    QueryError::Connection {
        message,
        source: Some(Box::new(SharedCreateError(err.clone()))),
    }
}

/// Concurrency-safe cache mapping [`ConnectionIdentity`] to a live
/// connection handle.
///
/// Creation on miss is single-flight per identity: N concurrent first
/// lookups trigger exactly one `create_connection` call and all N observe
/// its outcome, success or failure. A failed creation installs nothing and
/// retires its slot, so the shared failure reaches only the lookups that
/// were already queued; a fresh lookup afterwards retries. Creation and
/// destruction delegate entirely to the plugin; the handle is an opaque
/// token here.
///
/// Pools are explicit instances scoped to their owner's lifetime, so tests
/// can construct isolated pools instead of sharing ambient global state.
pub struct ConnectionPool {
    slots: Mutex<HashMap<ConnectionIdentity, Arc<Mutex<Slot>>>>,
    create_times: RwLock<HashMap<ConnectionIdentity, u64>>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            create_times: RwLock::new(HashMap::new()),
        }
    }

    /// Get the live handle for this configuration's identity, creating it
    /// via the plugin on a miss.
    ///
    /// Concurrent callers for the same never-seen identity all receive the
    /// one handle produced by the single creation call, or all receive that
    /// call's failure. Failure does not poison the identity: the next
    /// lookup arriving after the failed wave performs a fresh attempt.
    pub async fn get(
        &self,
        plugin: &dyn DatasourcePlugin,
        config: &dyn DatasourceConfig,
    ) -> Result<Arc<dyn Connection>> {
        let identity = config.cache_key();

        loop {
            let slot = {
                let mut slots = self.slots.lock().await;
                slots
                    .entry(identity.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(Slot::empty())))
                    .clone()
            };

            let mut guard = slot.lock().await;
            if let Some(connection) = &guard.connection {
                debug!("Pool hit for identity: {}", identity);
                return Ok(connection.clone());
            }
            if guard.retired {
                if let Some(failure) = &guard.failure {
                    // Queued behind the attempt that just failed: share its
                    // outcome instead of issuing another upstream call.
                    return Err(shared_failure(failure));
                }
                // Lost a race with invalidate; the map no longer holds this
                // slot. Start over with a fresh one.
                continue;
            }

            debug!("Pool miss for identity: {}, creating connection", identity);
            match plugin.create_connection(config).await {
                Ok(connection) => {
                    guard.connection = Some(connection.clone());

                    let mut counters = self.create_times.write().await;
                    *counters.entry(identity.clone()).or_insert(0) += 1;

                    return Ok(connection);
                }
                Err(e) => {
                    warn!("Connection creation failed for identity {}: {}", identity, e);
                    let failure = Arc::new(e);
                    guard.failure = Some(failure.clone());
                    guard.retired = true;

                    // Drop the slot from the map while still holding its
                    // lock, so lookups arriving after the failure start a
                    // fresh attempt while queued waiters still see the
                    // recorded outcome. An invalidate may already have
                    // removed it and a fresh slot may be installed; only
                    // remove our own.
                    let mut slots = self.slots.lock().await;
                    if let Some(current) = slots.get(&identity) {
                        if Arc::ptr_eq(current, &slot) {
                            slots.remove(&identity);
                        }
                    }

                    return Err(shared_failure(&failure));
                }
            }
        }
    }

    /// Remove and destroy the entry for `identity`, if present.
    ///
    /// The entry is removed from the map before destruction, so no new
    /// lookup can return a handle that is being destroyed. Queries already
    /// holding the handle keep it alive through their own `Arc` clones.
    /// No-op when the identity is absent.
    pub async fn invalidate(
        &self,
        plugin: &dyn DatasourcePlugin,
        identity: &ConnectionIdentity,
    ) -> Result<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.remove(identity)
        };

        let Some(slot) = slot else {
            return Ok(());
        };

        let connection = {
            let mut guard = slot.lock().await;
            guard.retired = true;
            guard.connection.take()
        };

        if let Some(connection) = connection {
            debug!("Destroying connection for identity: {}", identity);
            if let Err(e) = plugin.destroy_connection(connection).await {
                warn!("Destroy failed for identity {}: {}", identity, e);
                return Err(e);
            }
        }

        Ok(())
    }

    /// Diagnostic counter of successful creations for this identity since
    /// the pool was constructed. Starts at 0 for unseen identities.
    pub async fn create_times(&self, identity: &ConnectionIdentity) -> u64 {
        let counters = self.create_times.read().await;
        counters.get(identity).copied().unwrap_or(0)
    }

    /// Number of identities currently holding a pool slot.
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}
