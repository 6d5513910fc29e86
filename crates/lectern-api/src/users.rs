use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use lectern_db::users::ProfileUpdate;
use lectern_types::api::{ChangePasswordRequest, UpdateProfileRequest};
use lectern_types::models::FavoriteKind;
use lectern_types::validate;

use crate::auth::{AppState, hash_password, verify_password};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::CurrentUser;
use crate::run_db;

pub async fn get_profile(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(serde_json::json!({ "success": true, "user": user }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut preferences = req.preferences;
    if let Some(prefs) = preferences.as_mut() {
        prefs.language = prefs
            .language
            .as_deref()
            .map(|l| validate::required("Language", l, 50))
            .transpose()?;
    }

    let update = ProfileUpdate {
        name: req.name.map(|n| validate::required("Name", &n, 50)).transpose()?,
        bio: req.bio.map(|b| validate::bounded("Bio", &b, 500)).transpose()?,
        location: req
            .location
            .map(|l| validate::bounded("Location", &l, 100))
            .transpose()?,
        preferences,
    };

    let user = run_db(&state, move |db| db.update_profile(user.id, update, Utc::now())).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": user,
    })))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::password(&req.new_password)?;

    let row = run_db(&state, move |db| db.get_user_row(user.id))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if !verify_password(&req.current_password, &row.password_hash)? {
        return Err(ApiError::Validation("Current password is incorrect".into()));
    }

    let password_hash = hash_password(&req.new_password)?;
    run_db(&state, move |db| db.set_password(row.user.id, &password_hash, Utc::now())).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Password changed successfully",
    })))
}

pub async fn favorite_books(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let books = run_db(&state, move |db| db.favorite_books(user.id)).await?;
    Ok(Json(serde_json::json!({ "success": true, "books": books })))
}

pub async fn favorite_songs(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let songs = run_db(&state, move |db| db.favorite_songs(user.id)).await?;
    Ok(Json(serde_json::json!({ "success": true, "songs": songs })))
}

pub async fn toggle_favorite_book(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(book_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(state, user.id, FavoriteKind::Book, book_id).await
}

pub async fn toggle_favorite_song(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(song_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(state, user.id, FavoriteKind::Song, song_id).await
}

async fn toggle(
    state: AppState,
    user_id: Uuid,
    kind: FavoriteKind,
    item_id: Uuid,
) -> Result<Json<serde_json::Value>, ApiError> {
    let toggled = run_db(&state, move |db| {
        let exists = match kind {
            FavoriteKind::Book => db.get_book(item_id)?.is_some(),
            FavoriteKind::Song => db.get_song(item_id)?.is_some(),
        };
        if !exists {
            return Ok(None);
        }
        db.toggle_favorite(user_id, kind, item_id, Utc::now()).map(Some)
    })
    .await?;

    let (label, list_key) = match kind {
        FavoriteKind::Book => ("Book", "favoriteBooks"),
        FavoriteKind::Song => ("Song", "favoriteSongs"),
    };
    let toggled = toggled.ok_or_else(|| ApiError::not_found(label))?;

    let message = if toggled.is_favorite {
        format!("{} added to favorites", label)
    } else {
        format!("{} removed from favorites", label)
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "message": message,
        "isFavorite": toggled.is_favorite,
        list_key: toggled.favorites,
    })))
}
