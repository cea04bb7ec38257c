use std::sync::Arc;

use async_trait::async_trait;

use duplex_core::health::BackendHealth;
use duplex_core::ids::NoteId;
use duplex_core::note::{BackendId, Note, NoteDraft};

use crate::error::StoreError;
use crate::manager::BackendManager;
use crate::notes::NoteRepo;

/// One backend store as the orchestrator sees it: note operations plus
/// connection health. Implementations own their connection exclusively.
#[async_trait]
pub trait NoteBackend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Latest health snapshot, no round trip.
    fn health(&self) -> BackendHealth;

    /// Round-trip health check; failures are recorded, never raised.
    async fn probe(&self) -> BackendHealth;

    async fn insert(&self, draft: &NoteDraft) -> Result<Note, StoreError>;
    async fn find(&self, id: &NoteId) -> Result<Note, StoreError>;
    async fn list(&self) -> Result<Vec<Note>, StoreError>;
    async fn update(&self, id: &NoteId, draft: &NoteDraft) -> Result<Note, StoreError>;
    async fn delete(&self, id: &NoteId) -> Result<(), StoreError>;

    async fn close(&self);
}

/// SQLite-backed store: a `BackendManager` for lifecycle plus a `NoteRepo`
/// per operation for the statement text.
pub struct SqliteBackend {
    manager: Arc<BackendManager>,
}

impl SqliteBackend {
    pub fn new(manager: Arc<BackendManager>) -> Self {
        Self { manager }
    }

    fn repo(db: &crate::database::Database, backend: BackendId) -> NoteRepo {
        NoteRepo::new(db.clone(), backend)
    }
}

#[async_trait]
impl NoteBackend for SqliteBackend {
    fn id(&self) -> BackendId {
        self.manager.backend()
    }

    fn health(&self) -> BackendHealth {
        self.manager.health()
    }

    async fn probe(&self) -> BackendHealth {
        self.manager.probe().await
    }

    async fn insert(&self, draft: &NoteDraft) -> Result<Note, StoreError> {
        let backend = self.id();
        self.manager
            .execute(move |db| Self::repo(db, backend).insert(draft))
            .await
    }

    async fn find(&self, id: &NoteId) -> Result<Note, StoreError> {
        let backend = self.id();
        self.manager
            .execute(move |db| Self::repo(db, backend).find(id))
            .await
    }

    async fn list(&self) -> Result<Vec<Note>, StoreError> {
        let backend = self.id();
        self.manager
            .execute(move |db| Self::repo(db, backend).list())
            .await
    }

    async fn update(&self, id: &NoteId, draft: &NoteDraft) -> Result<Note, StoreError> {
        let backend = self.id();
        self.manager
            .execute(move |db| Self::repo(db, backend).update(id, draft))
            .await
    }

    async fn delete(&self, id: &NoteId) -> Result<(), StoreError> {
        let backend = self.id();
        self.manager
            .execute(move |db| Self::repo(db, backend).delete(id))
            .await
    }

    async fn close(&self) {
        self.manager.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_backend(backend: BackendId) -> SqliteBackend {
        let path = std::env::temp_dir()
            .join(format!("duplex-backend-{}", uuid::Uuid::now_v7()))
            .join("notes.db");
        SqliteBackend::new(BackendManager::new(backend, path))
    }

    #[tokio::test]
    async fn crud_through_the_trait() {
        let backend: Box<dyn NoteBackend> = Box::new(sqlite_backend(BackendId::Analytics));

        let note = backend
            .insert(&NoteDraft::new("via trait", "payload"))
            .await
            .unwrap();
        assert_eq!(note.backend, BackendId::Analytics);

        let found = backend.find(&note.id).await.unwrap();
        assert_eq!(found.title, "via trait");

        let updated = backend
            .update(&note.id, &NoteDraft::new("edited", "payload"))
            .await
            .unwrap();
        assert_eq!(updated.title, "edited");

        backend.delete(&note.id).await.unwrap();
        assert!(backend.find(&note.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn ids_do_not_cross_backends() {
        let primary = sqlite_backend(BackendId::Primary);
        let analytics = sqlite_backend(BackendId::Analytics);

        let note = primary
            .insert(&NoteDraft::new("only on primary", ""))
            .await
            .unwrap();

        // Same identifier, wrong backend: must not resolve.
        let err = analytics.find(&note.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn probe_reflects_store_state() {
        let backend = sqlite_backend(BackendId::Primary);
        let health = backend.probe().await;
        assert!(health.is_healthy());
        assert_eq!(backend.health().status, health.status);
    }
}
