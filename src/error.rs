use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotesError {
    #[error("NotFound: {0}")]
    NotFound(String),
    #[error("ValidationError: {0}")]
    Validation(String),
    #[error("DatabaseError: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<libsql::Error> for NotesError {
    fn from(error: libsql::Error) -> Self {
        NotesError::Database(error.into())
    }
}

impl NotesError {
    pub fn not_found(what: impl Into<String>) -> Self {
        NotesError::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        NotesError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            NotesError::NotFound(_) => StatusCode::NOT_FOUND,
            NotesError::Validation(_) => StatusCode::BAD_REQUEST,
            NotesError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for NotesError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            NotesError::NotFound(msg) | NotesError::Validation(msg) => msg,
            NotesError::Database(e) => {
                tracing::error!(error = %crate::unpack_error(&*e), "database operation failed");
                "internal server error".to_string()
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
