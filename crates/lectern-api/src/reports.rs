use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use lectern_types::api::{CreateReportRequest, ReportStatusRequest};
use lectern_types::models::{Report, ReportStatus};
use lectern_types::validate;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{CurrentUser, forbidden};
use crate::run_db;

pub async fn create_report(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let report = Report {
        id: Uuid::new_v4(),
        kind: req.kind,
        title: validate::required("Title", &req.title, 200)?,
        description: validate::required("Description", &req.description, 2000)?,
        screenshot_url: validate::required("Screenshot", &req.screenshot_url, 2048)?,
        reporter_id: user.id,
        reporter_name: user.name,
        status: ReportStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    let report = run_db(&state, move |db| {
        db.insert_report(&report)?;
        Ok(report)
    })
    .await?;

    info!("Report {} filed by {}", report.id, report.reporter_id);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Report submitted successfully",
            "report": report,
        })),
    ))
}

/// Admin only. Shares its path with `create_report`, so the check lives here
/// rather than in the admin layer.
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_admin {
        return Err(forbidden());
    }
    let reports = run_db(&state, |db| db.list_reports()).await?;
    Ok(Json(serde_json::json!({ "success": true, "reports": reports })))
}

/// Any status may be set from any other.
pub async fn set_report_status(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ReportStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_admin {
        return Err(forbidden());
    }
    let report = run_db(&state, move |db| db.set_report_status(id, req.status, Utc::now())).await?;

    info!("Report {} marked {} by {}", report.id, report.status, user.id);
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Report status updated",
        "report": report,
    })))
}
