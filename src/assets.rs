use axum::{
    body::Body,
    extract::Path,
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "web"]
pub struct Assets;

const INDEX_PAGE: &str = "index.html";
const SHARED_NOTE_PAGE: &str = "view_note.html";

fn embedded(path: &str) -> Response {
    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.to_string())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn serve_index() -> Response {
    embedded(INDEX_PAGE)
}

/// The page reads the token from its own URL and fetches the note client-side.
pub async fn serve_shared_note_page(Path(_token): Path<String>) -> Response {
    embedded(SHARED_NOTE_PAGE)
}

pub async fn serve_embedded(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');
    if path.is_empty() {
        return embedded(INDEX_PAGE);
    }
    embedded(path)
}
