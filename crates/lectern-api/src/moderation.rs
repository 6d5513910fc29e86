//! Admin approve/reject for submitted books and songs.
//!
//! The status change is written first and is the durable result. The
//! submitter notification that follows is best-effort: if it cannot be
//! stored the failure is logged and the response still reports success.

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use lectern_types::api::RejectRequest;
use lectern_types::models::Notification;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::CurrentUser;
use crate::run_db;

pub async fn approve_book(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (book, ()) = run_db(&state, move |db| {
        db.update_book(id, |book| book.approve(admin.id, Utc::now()))
    })
    .await?;

    info!("Book {} approved by {}", book.id, admin.id);
    if let Some(submitter) = book.submitted_by {
        notify(
            &state,
            Notification::new(
                "Book Approved",
                format!("Your book \"{}\" has been approved", book.details.title),
                Some(submitter),
                Utc::now(),
            ),
        )
        .await;
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Book approved successfully",
        "book": book,
    })))
}

pub async fn reject_book(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RejectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (book, ()) = run_db(&state, move |db| {
        db.update_book(id, |book| book.reject(&req.reason, Utc::now()))
    })
    .await?;

    info!("Book {} rejected by {}", book.id, admin.id);
    if let Some(submitter) = book.submitted_by {
        notify(
            &state,
            Notification::new(
                "Book Rejected",
                format!(
                    "Your book \"{}\" was not approved. Reason: {}",
                    book.details.title,
                    book.moderation().rejection_reason().unwrap_or_default()
                ),
                Some(submitter),
                Utc::now(),
            ),
        )
        .await;
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Book rejected",
        "book": book,
    })))
}

pub async fn approve_song(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (song, ()) = run_db(&state, move |db| {
        db.update_song(id, |song| song.approve(admin.id, Utc::now()))
    })
    .await?;

    info!("Song {} approved by {}", song.id, admin.id);
    if let Some(submitter) = song.submitted_by {
        notify(
            &state,
            Notification::new(
                "Song Approved",
                format!("Your song \"{}\" has been approved", song.details.title),
                Some(submitter),
                Utc::now(),
            ),
        )
        .await;
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Song approved successfully",
        "song": song,
    })))
}

pub async fn reject_song(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RejectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (song, ()) = run_db(&state, move |db| {
        db.update_song(id, |song| song.reject(&req.reason, Utc::now()))
    })
    .await?;

    info!("Song {} rejected by {}", song.id, admin.id);
    if let Some(submitter) = song.submitted_by {
        notify(
            &state,
            Notification::new(
                "Song Rejected",
                format!(
                    "Your song \"{}\" was not approved. Reason: {}",
                    song.details.title,
                    song.moderation().rejection_reason().unwrap_or_default()
                ),
                Some(submitter),
                Utc::now(),
            ),
        )
        .await;
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Song rejected",
        "song": song,
    })))
}

async fn notify(state: &AppState, notification: Notification) {
    let id = notification.id;
    if let Err(e) = run_db(state, move |db| db.insert_notification(&notification)).await {
        warn!("Failed to store notification {}: {}", id, e);
    }
}
