use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::api::{
    MessageResponse, NoteList, NoteWritten, ShareCreated, ShareList, SharedNoteView,
    WELCOME_MESSAGE,
};
use crate::db::Database;
use crate::error::NotesError;
use crate::model::{NewNote, NoteChanges};
use crate::notes::NoteStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub public_url: Option<String>,
}

impl AppState {
    pub fn new(db: Arc<Database>, public_url: Option<String>) -> Self {
        AppState { db, public_url }
    }

    fn notes(&self) -> NoteStore<'_> {
        NoteStore::new(&self.db)
    }

    /// Base for absolute share links: the configured URL, else the request's host.
    fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.public_url {
            return url.clone();
        }

        let host = headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .filter(|host| !host.is_empty())
            .unwrap_or("localhost");
        format!("http://{host}")
    }
}

/// Ids arrive as raw path segments; anything that is not an integer cannot
/// name a note.
fn parse_note_id(raw: &str) -> Result<i64, NotesError> {
    raw.parse()
        .map_err(|_| NotesError::not_found(format!("Note {raw} not found")))
}

/// A missing or non-JSON body reads as an empty payload and is left to the
/// store's presence checks. A well-formed body with mistyped fields is
/// reported as such.
fn read_payload<T: Default>(payload: Result<Json<T>, JsonRejection>) -> Result<T, NotesError> {
    match payload {
        Ok(Json(input)) => Ok(input),
        Err(JsonRejection::JsonDataError(e)) => Err(NotesError::validation(e.body_text())),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable payload, treating as empty");
            Ok(T::default())
        }
    }
}

pub async fn welcome() -> impl IntoResponse {
    Json(MessageResponse::new(WELCOME_MESSAGE))
}

pub async fn create_note(
    State(state): State<AppState>,
    payload: Result<Json<NewNote>, JsonRejection>,
) -> Result<Response, NotesError> {
    let input = read_payload(payload)?;
    let note = state.notes().create_note(input).await?;
    let body = NoteWritten::new(note, "Note created successfully");
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn list_notes(State(state): State<AppState>) -> Result<Json<NoteList>, NotesError> {
    let notes = state.notes().list_notes().await?;
    tracing::debug!(count = notes.len(), "listed notes");
    Ok(Json(NoteList { notes }))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, NotesError> {
    let id = parse_note_id(&id)?;
    let note = state.notes().get_note(id).await?;
    Ok(Json(note).into_response())
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NoteChanges>, JsonRejection>,
) -> Result<Json<NoteWritten>, NotesError> {
    let id = parse_note_id(&id)?;
    let changes = match read_payload(payload) {
        Ok(changes) => changes,
        Err(e) => {
            // A missing note still wins over a malformed body.
            state.notes().get_note(id).await?;
            return Err(e);
        }
    };

    let note = state.notes().update_note(id, changes).await?;
    Ok(Json(NoteWritten::new(note, "Note updated successfully")))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, NotesError> {
    let id = parse_note_id(&id)?;
    state.notes().delete_note(id).await?;
    Ok(Json(MessageResponse::new("Note deleted successfully")))
}

pub async fn share_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, NotesError> {
    let id = parse_note_id(&id)?;
    let share = state.notes().create_share(id).await?;
    let share_url = format!("{}/shared/{}", state.base_url(&headers), share.unique_token);

    let body = ShareCreated {
        message: "Note shared successfully. Share this URL with others.".to_string(),
        share_token: share.unique_token,
        share_url,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn list_shares(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ShareList>, NotesError> {
    let id = parse_note_id(&id)?;
    let shares = state.notes().list_shares(id).await?;
    Ok(Json(ShareList { shares }))
}

pub async fn view_shared_note(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SharedNoteView>, NotesError> {
    let (share, note) = state.notes().get_share_by_token(&token).await?;
    tracing::debug!(note_id = note.id, share_id = share.id, "shared note viewed");
    Ok(Json(SharedNoteView::new(share, note)))
}
