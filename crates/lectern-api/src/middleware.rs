use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use lectern_types::models::User;

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;
use crate::run_db;

/// The authenticated caller, inserted by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Validate the bearer token and load the caller. Deleted or deactivated
/// accounts are refused even while their token is unexpired.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Authentication("No token, authorization denied".into()))?;

    let claims = decode_token(&state.jwt_secret, token).map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Authentication("Token is not valid".into())
    })?;

    let user = run_db(&state, move |db| db.get_user(claims.sub))
        .await?
        .ok_or_else(|| ApiError::Authentication("Token is not valid".into()))?;

    if !user.is_active {
        return Err(ApiError::Authentication("Account has been deactivated".into()));
    }

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Must run after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    match req.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) if user.is_admin => Ok(next.run(req).await),
        Some(_) => Err(forbidden()),
        None => Err(ApiError::Authentication("No token, authorization denied".into())),
    }
}

pub(crate) fn forbidden() -> ApiError {
    ApiError::Authorization("Access denied. Admin privileges required.".into())
}
