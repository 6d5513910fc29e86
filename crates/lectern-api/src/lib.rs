pub mod admin;
pub mod auth;
pub mod books;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod moderation;
pub mod notifications;
pub mod reports;
pub mod songs;
pub mod users;

use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use tracing::error;

use lectern_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::{require_admin, require_auth};

/// Run a blocking database call off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Unexpected(e.into())
        })?
        .map_err(ApiError::from)
}

/// The full `/api` surface plus `/health`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/books", get(books::list_books))
        .route("/api/books/{id}", get(books::get_book))
        .route("/api/books/{id}/download", post(books::record_download))
        .route("/api/songs", get(songs::list_songs))
        .route("/api/songs/{id}", get(songs::get_song))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/user/profile", get(users::get_profile).put(users::update_profile))
        .route("/api/user/change-password", put(users::change_password))
        .route("/api/user/favorites/books", get(users::favorite_books))
        .route("/api/user/favorites/books/{book_id}", post(users::toggle_favorite_book))
        .route("/api/user/favorites/songs", get(users::favorite_songs))
        .route("/api/user/favorites/songs/{song_id}", post(users::toggle_favorite_song))
        .route("/api/books/submit", post(books::submit_book))
        .route("/api/books/{id}/reviews", post(books::add_review))
        .route(
            "/api/books/{id}/reviews/{review_id}",
            put(books::update_review).delete(books::delete_review),
        )
        .route("/api/songs/submit", post(songs::submit_song))
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/{id}/read", put(notifications::mark_read))
        .route("/api/reports", post(reports::create_report).get(reports::list_reports))
        .route("/api/reports/{id}/status", put(reports::set_report_status))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}/active", put(admin::set_user_active))
        .route("/api/admin/books", post(admin::create_book))
        .route("/api/admin/songs", post(admin::create_song))
        .route("/api/admin/pending", get(admin::pending))
        .route("/api/admin/books/{id}/approve", put(moderation::approve_book))
        .route("/api/admin/books/{id}/reject", put(moderation::reject_book))
        .route("/api/admin/songs/{id}/approve", put(moderation::approve_song))
        .route("/api/admin/songs/{id}/reject", put(moderation::reject_song))
        .route("/api/admin/notifications", post(admin::send_notification))
        .layer(from_fn(require_admin))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .fallback(route_not_found)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".into())
}
