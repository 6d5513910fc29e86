use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use lectern_types::api::SongRequest;
use lectern_types::models::{Song, SongDetails};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::CurrentUser;
use crate::run_db;

#[derive(Debug, Deserialize)]
pub struct SongListParams {
    pub search: Option<String>,
}

pub async fn list_songs(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SongListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let songs = run_db(&state, move |db| db.list_songs(params.search.as_deref())).await?;
    Ok(Json(songs))
}

pub async fn get_song(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let song = run_db(&state, move |db| db.get_song(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Song"))?;
    Ok(Json(song))
}

pub async fn submit_song(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<SongRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let details = SongDetails::try_from(req)?;
    let song = Song::submit(details, user.id, Utc::now());

    let song = run_db(&state, move |db| {
        db.insert_song(&song)?;
        db.increment_contributions(user.id)?;
        Ok(song)
    })
    .await?;

    info!("Song {} submitted by {}", song.id, user.id);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Song submitted for review",
            "song": song,
        })),
    ))
}
