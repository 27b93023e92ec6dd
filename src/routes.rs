use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::assets::{serve_embedded, serve_index, serve_shared_note_page};
use crate::handler::{self, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/welcome", get(handler::welcome))
        .route("/notes", get(handler::list_notes).post(handler::create_note))
        .route(
            "/notes/:id",
            get(handler::get_note)
                .put(handler::update_note)
                .delete(handler::delete_note),
        )
        .route("/notes/:id/share", post(handler::share_note))
        .route("/notes/:id/shares", get(handler::list_shares))
        .route("/share/:token", get(handler::view_shared_note))
}

/// The complete service: JSON API under `/api` plus the two HTML pages.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(serve_index))
        .route("/shared/:token", get(serve_shared_note_page))
        .nest("/api", api_routes())
        .fallback(serve_embedded)
        .layer(cors)
        .with_state(state)
}
