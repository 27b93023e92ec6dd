use crate::model::{Note, SharedNote};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const WELCOME_MESSAGE: &str = "Welcome to the Notes API!";

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(msg: &str) -> Self {
        MessageResponse {
            message: msg.to_owned(),
        }
    }
}

/// Body returned by create and update: the note without its timestamps.
#[derive(Debug, Serialize, Deserialize)]
pub struct NoteWritten {
    pub id: i64,
    pub title: Option<String>,
    pub content: String,
    pub message: String,
}

impl NoteWritten {
    pub fn new(note: Note, msg: &str) -> Self {
        NoteWritten {
            id: note.id,
            title: note.title,
            content: note.content,
            message: msg.to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteList {
    pub notes: Vec<Note>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareCreated {
    pub message: String,
    pub share_token: String,
    pub share_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareList {
    pub shares: Vec<SharedNote>,
}

/// What a holder of a share link gets to see.
#[derive(Debug, Serialize, Deserialize)]
pub struct SharedNoteView {
    pub title: Option<String>,
    pub content: String,
    pub shared_at: DateTime<Utc>,
}

impl SharedNoteView {
    pub fn new(share: SharedNote, note: Note) -> Self {
        SharedNoteView {
            title: note.title,
            content: note.content,
            shared_at: share.created_at,
        }
    }
}
