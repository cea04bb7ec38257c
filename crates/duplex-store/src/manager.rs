use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use duplex_core::health::{BackendHealth, HealthStatus};
use duplex_core::note::BackendId;

use crate::database::Database;
use crate::error::StoreError;

/// A probe round-trip slower than this marks the backend degraded.
const DEGRADED_LATENCY_MS: u64 = 250;

/// Connection lifecycle and health tracking for one backend store.
///
/// The manager owns its store exclusively: connects lazily, records every
/// probe as a health snapshot, and retries a lost connection exactly once
/// inside `execute` before surfacing `BackendUnavailable`. Probing is driven
/// externally (a periodic sweep), never self-scheduled.
pub struct BackendManager {
    backend: BackendId,
    path: PathBuf,
    db: RwLock<Option<Database>>,
    health: RwLock<BackendHealth>,
    // Serializes concurrent connect attempts so a reconnect race cannot
    // open two stores.
    connect_guard: tokio::sync::Mutex<()>,
}

impl BackendManager {
    pub fn new(backend: BackendId, path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            path: path.into(),
            db: RwLock::new(None),
            health: RwLock::new(BackendHealth::unknown(backend)),
            connect_guard: tokio::sync::Mutex::new(()),
        })
    }

    pub fn backend(&self) -> BackendId {
        self.backend
    }

    /// Current health snapshot without a round trip.
    pub fn health(&self) -> BackendHealth {
        self.health.read().clone()
    }

    /// Establish or reuse the store connection. Idempotent; safe to call
    /// concurrently.
    pub async fn connect(&self) -> Result<Database, StoreError> {
        if let Some(db) = self.db.read().clone() {
            return Ok(db);
        }

        let _guard = self.connect_guard.lock().await;

        // Another caller may have connected while we waited on the guard.
        if let Some(db) = self.db.read().clone() {
            return Ok(db);
        }

        match Database::open(&self.path) {
            Ok(db) => {
                *self.db.write() = Some(db.clone());
                info!(backend = %self.backend, path = %self.path.display(), "backend connected");
                Ok(db)
            }
            Err(e) => {
                warn!(backend = %self.backend, error = %e, "backend connect failed");
                Err(e)
            }
        }
    }

    /// Run one trivial round trip and record the result. Never returns an
    /// error — a failed probe becomes a `disconnected` snapshot, so a sweep
    /// across managers cannot abort early.
    pub async fn probe(&self) -> BackendHealth {
        let started = Instant::now();

        let result = match self.connect().await {
            Ok(db) => db.with_conn(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(StoreError::from)
            }),
            Err(e) => Err(e),
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        let snapshot = match result {
            Ok(_) => BackendHealth {
                backend: self.backend,
                status: if latency_ms > DEGRADED_LATENCY_MS {
                    HealthStatus::Degraded
                } else {
                    HealthStatus::Healthy
                },
                latency_ms: Some(latency_ms),
                last_error: None,
                checked_at: Some(Utc::now().to_rfc3339()),
            },
            Err(e) => {
                // A failed round trip invalidates the cached handle so the
                // next execute goes through reconnect.
                *self.db.write() = None;
                BackendHealth {
                    backend: self.backend,
                    status: HealthStatus::Disconnected,
                    latency_ms: Some(latency_ms),
                    last_error: Some(e.to_string()),
                    checked_at: Some(Utc::now().to_rfc3339()),
                }
            }
        };

        debug!(backend = %self.backend, status = %snapshot.status, latency_ms, "probe");
        *self.health.write() = snapshot.clone();
        snapshot
    }

    /// Run an operation against the live connection, reconnecting once if
    /// the connection is absent.
    pub async fn execute<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError>,
    {
        let db = match self.connect().await {
            Ok(db) => db,
            Err(first) => {
                debug!(backend = %self.backend, error = %first, "retrying connect");
                self.connect().await.map_err(|e| {
                    StoreError::BackendUnavailable(format!("{}: {e}", self.backend))
                })?
            }
        };

        op(&db)
    }

    /// Release the pooled connection. The manager stays usable — the next
    /// `connect` reopens.
    pub async fn close(&self) {
        let _guard = self.connect_guard.lock().await;
        if self.db.write().take().is_some() {
            info!(backend = %self.backend, "backend closed");
        }
        let mut health = self.health.write();
        health.status = HealthStatus::Disconnected;
    }
}
