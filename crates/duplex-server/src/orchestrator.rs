//! Multi-backend orchestrator.
//!
//! Issues the same logical note operation against one or both backend
//! stores. Per-target failures are captured as data and returned alongside
//! successes; the only error a multi-target write can raise is "every
//! requested target failed". Single-target operations never fall back to
//! the other backend because note identifiers are not unique across stores.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use duplex_core::health::BackendHealth;
use duplex_core::ids::NoteId;
use duplex_core::note::{BackendId, Note, NoteDraft, WriteTarget};
use duplex_store::{NoteBackend, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid note: {0}")]
    InvalidNote(String),

    #[error("all write targets failed")]
    TotalWriteFailure { failures: Vec<TargetOutcome> },

    #[error("note {id} not found on backend {backend}")]
    NotFound { backend: BackendId, id: NoteId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one target's attempt inside a multi-target write.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOutcome {
    pub target: BackendId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Note>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TargetOutcome {
    fn ok(target: BackendId, note: Note) -> Self {
        Self {
            target,
            success: true,
            note: Some(note),
            error: None,
        }
    }

    fn failed(target: BackendId, reason: String) -> Self {
        Self {
            target,
            success: false,
            note: None,
            error: Some(reason),
        }
    }
}

/// Aggregate of a multi-target write. `overall_success` is true when at
/// least one target succeeded; callers inspect `per_target` to see which.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub overall_success: bool,
    pub per_target: Vec<TargetOutcome>,
}

pub struct NotesOrchestrator {
    backends: Vec<Arc<dyn NoteBackend>>,
}

impl NotesOrchestrator {
    /// Backends are injected, one per store; the orchestrator never opens
    /// connections of its own.
    pub fn new(primary: Arc<dyn NoteBackend>, analytics: Arc<dyn NoteBackend>) -> Self {
        debug_assert_eq!(primary.id(), BackendId::Primary);
        debug_assert_eq!(analytics.id(), BackendId::Analytics);
        Self {
            backends: vec![primary, analytics],
        }
    }

    fn backend(&self, id: BackendId) -> &Arc<dyn NoteBackend> {
        match id {
            BackendId::Primary => &self.backends[0],
            BackendId::Analytics => &self.backends[1],
        }
    }

    /// Write the draft to every requested target, settle-all. The insert
    /// attempts run concurrently; completion order is unconstrained.
    pub async fn write_to_all(
        &self,
        draft: &NoteDraft,
        target: WriteTarget,
    ) -> Result<WriteOutcome, OrchestratorError> {
        draft.validate().map_err(OrchestratorError::InvalidNote)?;

        let targets = target.targets();
        let attempts = targets
            .iter()
            .map(|&id| async move { (id, self.backend(id).insert(draft).await) });
        let results = futures::future::join_all(attempts).await;

        let per_target: Vec<TargetOutcome> = results
            .into_iter()
            .map(|(id, result)| match result {
                Ok(note) => TargetOutcome::ok(id, note),
                Err(e) => {
                    warn!(backend = %id, error = %e, "write target failed");
                    TargetOutcome::failed(id, e.to_string())
                }
            })
            .collect();

        if per_target.iter().any(|o| o.success) {
            Ok(WriteOutcome {
                overall_success: true,
                per_target,
            })
        } else {
            Err(OrchestratorError::TotalWriteFailure {
                failures: per_target,
            })
        }
    }

    /// Merged listing across every backend whose last health snapshot is
    /// healthy or unknown. Individual query failures are logged and the
    /// merge continues; ordering is created_at descending, ties broken by
    /// backend id so repeated calls are deterministic.
    pub async fn read_all(&self) -> Vec<Note> {
        let readable: Vec<&Arc<dyn NoteBackend>> = self
            .backends
            .iter()
            .filter(|b| {
                let h = b.health();
                if !h.is_readable() {
                    warn!(backend = %b.id(), status = %h.status, "skipping backend for merged read");
                }
                h.is_readable()
            })
            .collect();

        let lists =
            futures::future::join_all(readable.iter().map(|b| async { (b.id(), b.list().await) }))
                .await;

        let mut notes: Vec<Note> = Vec::new();
        for (id, result) in lists {
            match result {
                Ok(mut batch) => notes.append(&mut batch),
                Err(e) => warn!(backend = %id, error = %e, "merged read lost a backend"),
            }
        }

        notes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.backend.cmp(&b.backend))
        });
        notes
    }

    /// Single-target read. Does not fall back to the other backend.
    pub async fn read_one(
        &self,
        backend: BackendId,
        id: &NoteId,
    ) -> Result<Note, OrchestratorError> {
        self.backend(backend)
            .find(id)
            .await
            .map_err(|e| Self::map_single(backend, id, e))
    }

    /// Single-target update, re-targeting the backend the note came from.
    pub async fn update_one(
        &self,
        backend: BackendId,
        id: &NoteId,
        draft: &NoteDraft,
    ) -> Result<Note, OrchestratorError> {
        draft.validate().map_err(OrchestratorError::InvalidNote)?;
        self.backend(backend)
            .update(id, draft)
            .await
            .map_err(|e| Self::map_single(backend, id, e))
    }

    /// Single-target delete. Deleting "both" copies is two independent
    /// calls at the caller's discretion.
    pub async fn delete_one(
        &self,
        backend: BackendId,
        id: &NoteId,
    ) -> Result<(), OrchestratorError> {
        self.backend(backend)
            .delete(id)
            .await
            .map_err(|e| Self::map_single(backend, id, e))
    }

    fn map_single(backend: BackendId, id: &NoteId, e: StoreError) -> OrchestratorError {
        if e.is_not_found() {
            OrchestratorError::NotFound {
                backend,
                id: id.clone(),
            }
        } else {
            OrchestratorError::Store(e)
        }
    }

    /// Latest health snapshots, no round trips.
    pub fn health_all(&self) -> Vec<BackendHealth> {
        self.backends.iter().map(|b| b.health()).collect()
    }

    /// Probe every backend. Probes never error, so the sweep always covers
    /// all of them.
    pub async fn probe_all(&self) -> Vec<BackendHealth> {
        futures::future::join_all(self.backends.iter().map(|b| b.probe())).await
    }

    pub async fn close_all(&self) {
        for b in &self.backends {
            b.close().await;
        }
    }
}
