use chrono::Utc;
use tracing::instrument;

use duplex_core::ids::NoteId;
use duplex_core::note::{BackendId, Note, NoteDraft};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// The per-backend mapping layer: owns the statement text for one store and
/// tags every row it produces with the originating backend.
pub struct NoteRepo {
    db: Database,
    backend: BackendId,
}

impl NoteRepo {
    pub fn new(db: Database, backend: BackendId) -> Self {
        Self { db, backend }
    }

    /// Insert a new note. The row is built and returned in the same
    /// statement scope — there is no separate read-back that could fail
    /// after the write landed.
    #[instrument(skip(self, draft), fields(backend = %self.backend))]
    pub fn insert(&self, draft: &NoteDraft) -> Result<Note, StoreError> {
        let id = NoteId::new();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notes (id, title, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id.as_str(), draft.title, draft.content, now, now],
            )?;

            Ok(Note {
                id,
                title: draft.title.clone(),
                content: draft.content.clone(),
                backend: self.backend,
                created_at: now.clone(),
                updated_at: now,
            })
        })
    }

    #[instrument(skip(self), fields(backend = %self.backend, id = %id))]
    pub fn find(&self, id: &NoteId) -> Result<Note, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, content, created_at, updated_at FROM notes WHERE id = ?1",
                [id.as_str()],
                |row| Ok(self.row_to_note(row)),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound(format!("note {id} on {}", self.backend))
                }
                other => StoreError::Database(other.to_string()),
            })?
        })
    }

    /// All notes in this store, newest first.
    #[instrument(skip(self), fields(backend = %self.backend))]
    pub fn list(&self) -> Result<Vec<Note>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, created_at, updated_at FROM notes
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt.query_map([], |row| Ok(self.row_to_note(row)))?;
            let mut notes = Vec::new();
            for row in rows {
                notes.push(row??);
            }
            Ok(notes)
        })
    }

    #[instrument(skip(self, draft), fields(backend = %self.backend, id = %id))]
    pub fn update(&self, id: &NoteId, draft: &NoteDraft) -> Result<Note, StoreError> {
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notes SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                rusqlite::params![draft.title, draft.content, now, id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!(
                    "note {id} on {}",
                    self.backend
                )));
            }

            conn.query_row(
                "SELECT id, title, content, created_at, updated_at FROM notes WHERE id = ?1",
                [id.as_str()],
                |row| Ok(self.row_to_note(row)),
            )
            .map_err(StoreError::from)?
        })
    }

    #[instrument(skip(self), fields(backend = %self.backend, id = %id))]
    pub fn delete(&self, id: &NoteId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM notes WHERE id = ?1", [id.as_str()])?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!(
                    "note {id} on {}",
                    self.backend
                )));
            }
            Ok(())
        })
    }

    fn row_to_note(&self, row: &rusqlite::Row<'_>) -> Result<Note, StoreError> {
        Ok(Note {
            id: NoteId::from_raw(row_helpers::get::<String>(row, 0, "notes", "id")?),
            title: row_helpers::get(row, 1, "notes", "title")?,
            content: row_helpers::get(row, 2, "notes", "content")?,
            backend: self.backend,
            created_at: row_helpers::get(row, 3, "notes", "created_at")?,
            updated_at: row_helpers::get(row, 4, "notes", "updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> NoteRepo {
        NoteRepo::new(Database::in_memory().unwrap(), BackendId::Primary)
    }

    #[test]
    fn insert_and_find() {
        let repo = repo();
        let note = repo.insert(&NoteDraft::new("first", "body")).unwrap();
        assert!(note.id.as_str().starts_with("note_"));
        assert_eq!(note.backend, BackendId::Primary);

        let found = repo.find(&note.id).unwrap();
        assert_eq!(found, note);
    }

    #[test]
    fn find_missing_is_not_found() {
        let repo = repo();
        let err = repo.find(&NoteId::from_raw("note_missing")).unwrap_err();
        assert!(err.is_not_found(), "got: {err}");
    }

    #[test]
    fn content_may_be_empty() {
        let repo = repo();
        let note = repo.insert(&NoteDraft::new("title only", "")).unwrap();
        assert_eq!(note.content, "");
    }

    #[test]
    fn list_is_newest_first() {
        let repo = repo();
        let a = repo.insert(&NoteDraft::new("a", "")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = repo.insert(&NoteDraft::new("b", "")).unwrap();

        let notes = repo.list().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, b.id);
        assert_eq!(notes[1].id, a.id);
    }

    #[test]
    fn update_changes_fields_and_bumps_updated_at() {
        let repo = repo();
        let note = repo.insert(&NoteDraft::new("old", "old body")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let updated = repo
            .update(&note.id, &NoteDraft::new("new", "new body"))
            .unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.content, "new body");
        assert_eq!(updated.created_at, note.created_at);
        assert!(updated.updated_at > note.updated_at);
    }

    #[test]
    fn update_missing_is_not_found() {
        let repo = repo();
        let err = repo
            .update(&NoteId::from_raw("note_missing"), &NoteDraft::new("x", ""))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn delete_removes_and_reports_missing() {
        let repo = repo();
        let note = repo.insert(&NoteDraft::new("gone soon", "")).unwrap();
        repo.delete(&note.id).unwrap();
        assert!(repo.find(&note.id).unwrap_err().is_not_found());
        assert!(repo.delete(&note.id).unwrap_err().is_not_found());
    }
}
