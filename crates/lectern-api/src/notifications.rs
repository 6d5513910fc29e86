use axum::{Extension, Json, extract::State, response::IntoResponse};
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::middleware::CurrentUser;
use crate::run_db;

/// The caller's own notifications plus broadcasts, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = run_db(&state, move |db| db.notifications_for(user.id)).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "notifications": notifications,
    })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = run_db(&state, move |db| db.mark_notification_read(id, user.id))
        .await?
        .ok_or_else(|| ApiError::not_found("Notification"))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "notification": notification,
    })))
}
