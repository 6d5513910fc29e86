use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use lectern_types::api::{BookRequest, SendNotificationRequest, SetActiveRequest, SongRequest};
use lectern_types::book::{Book, BookDetails};
use lectern_types::models::{Notification, Song, SongDetails};
use lectern_types::validate;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::CurrentUser;
use crate::run_db;

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = run_db(&state, |db| db.list_users()).await?;
    Ok(Json(serde_json::json!({ "success": true, "users": users })))
}

pub async fn set_user_active(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SetActiveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if id == admin.id && !req.is_active {
        return Err(ApiError::Validation("You cannot deactivate your own account".into()));
    }

    let user = run_db(&state, move |db| db.set_active(id, req.is_active, Utc::now())).await?;

    info!("User {} active={} (by {})", user.id, user.is_active, admin.id);
    Ok(Json(serde_json::json!({ "success": true, "user": user })))
}

/// Admin additions skip the moderation queue.
pub async fn create_book(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<BookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let details = BookDetails::try_from(req)?;
    let book = Book::publish(details, admin.id, Utc::now());

    let book = run_db(&state, move |db| {
        db.insert_book(&book)?;
        db.increment_contributions(admin.id)?;
        Ok(book)
    })
    .await?;

    info!("Book {} published by {}", book.id, admin.id);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Book added successfully",
            "book": book,
        })),
    ))
}

pub async fn create_song(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<SongRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let details = SongDetails::try_from(req)?;
    let song = Song::publish(details, admin.id, Utc::now());

    let song = run_db(&state, move |db| {
        db.insert_song(&song)?;
        db.increment_contributions(admin.id)?;
        Ok(song)
    })
    .await?;

    info!("Song {} published by {}", song.id, admin.id);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Song added successfully",
            "song": song,
        })),
    ))
}

pub async fn pending(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (books, songs) = run_db(&state, |db| Ok((db.pending_books()?, db.pending_songs()?))).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "books": books,
        "songs": songs,
    })))
}

/// Without `userId` the notification is broadcast to everyone.
pub async fn send_notification(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SendNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = validate::required("Title", &req.title, 200)?;
    let message = validate::required("Message", &req.message, 2000)?;
    let notification = Notification::new(title, message, req.user_id, Utc::now());

    let notification = run_db(&state, move |db| {
        if let Some(user_id) = notification.user_id {
            if db.get_user(user_id)?.is_none() {
                return Ok(None);
            }
        }
        db.insert_notification(&notification)?;
        Ok(Some(notification))
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User"))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Notification sent",
            "notification": notification,
        })),
    ))
}
