//! Data access for notes and their share links.
//!
//! Every public operation on [`NoteStore`] runs in exactly one transaction, so
//! multi-statement work such as removing a note together with its share links
//! is applied atomically.

use libsql::{Connection, Row, Value};
use uuid::Uuid;

use crate::db::Database;
use crate::error::NotesError;
use crate::model::{self, NewNote, Note, NoteChanges, SharedNote};

const NOTE_COLUMNS: &str = "id, title, content, created_at, updated_at";
const SHARE_COLUMNS: &str = "id, note_id, unique_token, created_at";

/// How many fresh tokens to try before giving up on a share link.
const MAX_TOKEN_ATTEMPTS: usize = 5;

pub const MISSING_CONTENT: &str = "Missing content for note";
pub const NO_UPDATE_DATA: &str = "No data provided for update";

pub struct NoteStore<'a> {
    db: &'a Database,
}

impl<'a> NoteStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create_note(&self, input: NewNote) -> Result<Note, NotesError> {
        let content = input
            .content
            .ok_or_else(|| NotesError::validation(MISSING_CONTENT))?;
        let title = input.title;

        let note = self
            .db
            .transaction(|conn| insert_note(conn, title, content))
            .await?;

        tracing::info!(note_id = note.id, "note created");
        Ok(note)
    }

    /// All notes, oldest first.
    pub async fn list_notes(&self) -> Result<Vec<Note>, NotesError> {
        self.db.transaction(select_all_notes).await
    }

    pub async fn get_note(&self, id: i64) -> Result<Note, NotesError> {
        self.db.transaction(|conn| require_note(conn, id)).await
    }

    pub async fn update_note(&self, id: i64, changes: NoteChanges) -> Result<Note, NotesError> {
        let note = self
            .db
            .transaction(|conn| apply_changes(conn, id, changes))
            .await?;

        tracing::info!(note_id = note.id, "note updated");
        Ok(note)
    }

    /// Removes the note and every share link pointing at it.
    pub async fn delete_note(&self, id: i64) -> Result<(), NotesError> {
        let removed_shares = self
            .db
            .transaction(|conn| delete_note_and_shares(conn, id))
            .await?;

        tracing::info!(note_id = id, removed_shares, "note deleted");
        Ok(())
    }

    pub async fn create_share(&self, note_id: i64) -> Result<SharedNote, NotesError> {
        let share = self
            .db
            .transaction(|conn| insert_share(conn, note_id))
            .await?;

        tracing::info!(note_id, share_id = share.id, "share link created");
        Ok(share)
    }

    pub async fn get_share_by_token(&self, token: &str) -> Result<(SharedNote, Note), NotesError> {
        self.db
            .transaction(|conn| resolve_share(conn, token))
            .await
    }

    pub async fn list_shares(&self, note_id: i64) -> Result<Vec<SharedNote>, NotesError> {
        self.db
            .transaction(|conn| select_shares(conn, note_id))
            .await
    }
}

pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

fn note_not_found(id: i64) -> NotesError {
    NotesError::not_found(format!("Note {id} not found"))
}

fn share_not_found() -> NotesError {
    NotesError::not_found("Shared note not found")
}

fn row_to_note(row: &Row) -> Result<Note, NotesError> {
    let created_at: String = row.get(3)?;
    let updated_at: Option<String> = row.get(4)?;

    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: model::parse_timestamp(&created_at)?,
        updated_at: updated_at
            .as_deref()
            .map(model::parse_timestamp)
            .transpose()?,
    })
}

fn row_to_share(row: &Row) -> Result<SharedNote, NotesError> {
    let created_at: String = row.get(3)?;

    Ok(SharedNote {
        id: row.get(0)?,
        note_id: row.get(1)?,
        unique_token: row.get(2)?,
        created_at: model::parse_timestamp(&created_at)?,
    })
}

async fn insert_note(
    conn: &Connection,
    title: Option<String>,
    content: String,
) -> Result<Note, NotesError> {
    let created_at = model::format_timestamp(&model::now());
    let query = format!(
        "INSERT INTO notes (title, content, created_at) VALUES (?, ?, ?) RETURNING {NOTE_COLUMNS}"
    );

    let mut rows = conn
        .query(&query, libsql::params![title, content, created_at])
        .await?;

    match rows.next().await? {
        Some(row) => row_to_note(&row),
        None => Err(NotesError::Database(anyhow::anyhow!("Failed to create note"))),
    }
}

async fn select_all_notes(conn: &Connection) -> Result<Vec<Note>, NotesError> {
    let query = format!("SELECT {NOTE_COLUMNS} FROM notes ORDER BY id ASC");
    let mut rows = conn.query(&query, ()).await?;
    let mut notes = Vec::new();

    while let Some(row) = rows.next().await? {
        notes.push(row_to_note(&row)?);
    }

    Ok(notes)
}

async fn find_note(conn: &Connection, id: i64) -> Result<Option<Note>, NotesError> {
    let query = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?");
    let mut rows = conn.query(&query, libsql::params![id]).await?;

    match rows.next().await? {
        Some(row) => Ok(Some(row_to_note(&row)?)),
        None => Ok(None),
    }
}

async fn require_note(conn: &Connection, id: i64) -> Result<Note, NotesError> {
    find_note(conn, id).await?.ok_or_else(|| note_not_found(id))
}

async fn apply_changes(
    conn: &Connection,
    id: i64,
    changes: NoteChanges,
) -> Result<Note, NotesError> {
    require_note(conn, id).await?;

    if changes.is_empty() {
        return Err(NotesError::validation(NO_UPDATE_DATA));
    }

    let mut updates = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(title) = changes.title {
        updates.push("title = ?");
        params.push(title.map_or(Value::Null, Value::Text));
    }
    if let Some(content) = changes.content {
        let content =
            content.ok_or_else(|| NotesError::validation("Note content cannot be null"))?;
        updates.push("content = ?");
        params.push(Value::Text(content));
    }

    updates.push("updated_at = ?");
    params.push(Value::Text(model::format_timestamp(&model::now())));
    params.push(Value::Integer(id));

    let query = format!("UPDATE notes SET {} WHERE id = ?", updates.join(", "));
    conn.execute(&query, params).await?;

    require_note(conn, id).await
}

async fn delete_note_and_shares(conn: &Connection, id: i64) -> Result<u64, NotesError> {
    require_note(conn, id).await?;

    let removed_shares = conn
        .execute(
            "DELETE FROM shared_notes WHERE note_id = ?",
            libsql::params![id],
        )
        .await?;
    conn.execute("DELETE FROM notes WHERE id = ?", libsql::params![id])
        .await?;

    Ok(removed_shares)
}

async fn token_in_use(conn: &Connection, token: &str) -> Result<bool, NotesError> {
    let mut rows = conn
        .query(
            "SELECT 1 FROM shared_notes WHERE unique_token = ?",
            libsql::params![token],
        )
        .await?;
    Ok(rows.next().await?.is_some())
}

async fn insert_share(conn: &Connection, note_id: i64) -> Result<SharedNote, NotesError> {
    require_note(conn, note_id).await?;

    for _ in 0..MAX_TOKEN_ATTEMPTS {
        let token = generate_token();
        if token_in_use(conn, &token).await? {
            tracing::warn!("share token collision, generating another");
            continue;
        }

        let created_at = model::format_timestamp(&model::now());
        let query = format!(
            "INSERT INTO shared_notes (note_id, unique_token, created_at) VALUES (?, ?, ?) RETURNING {SHARE_COLUMNS}"
        );
        let mut rows = conn
            .query(&query, libsql::params![note_id, token, created_at])
            .await?;

        return match rows.next().await? {
            Some(row) => row_to_share(&row),
            None => Err(NotesError::Database(anyhow::anyhow!("Failed to create share link"))),
        };
    }

    Err(NotesError::Database(anyhow::anyhow!(
        "could not generate a unique share token after {MAX_TOKEN_ATTEMPTS} attempts"
    )))
}

async fn resolve_share(conn: &Connection, token: &str) -> Result<(SharedNote, Note), NotesError> {
    let query = format!("SELECT {SHARE_COLUMNS} FROM shared_notes WHERE unique_token = ?");
    let mut rows = conn.query(&query, libsql::params![token]).await?;

    let share = match rows.next().await? {
        Some(row) => row_to_share(&row)?,
        None => return Err(share_not_found()),
    };

    // Shares are removed with their note, but a dangling row must still read as missing.
    let note = find_note(conn, share.note_id)
        .await?
        .ok_or_else(share_not_found)?;

    Ok((share, note))
}

async fn select_shares(conn: &Connection, note_id: i64) -> Result<Vec<SharedNote>, NotesError> {
    require_note(conn, note_id).await?;

    let query = format!("SELECT {SHARE_COLUMNS} FROM shared_notes WHERE note_id = ? ORDER BY id ASC");
    let mut rows = conn.query(&query, libsql::params![note_id]).await?;
    let mut shares = Vec::new();

    while let Some(row) = rows.next().await? {
        shares.push(row_to_share(&row)?);
    }

    Ok(shares)
}
