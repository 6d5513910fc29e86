use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use tracing::info;
use uuid::Uuid;

use lectern_db::Database;
use lectern_db::users::NewUser;
use lectern_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use lectern_types::models::{User, normalize_email};
use lectern_types::validate;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::run_db;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = validate::required("Name", &req.name, 50)?;
    let email = validate::email(&req.email)?;
    validate::password(&req.password)?;

    let password_hash = hash_password(&req.password)?;

    let user = run_db(&state, move |db| {
        let now = Utc::now();
        let user = db.create_user(
            NewUser {
                name: &name,
                email: &email,
                password_hash: &password_hash,
                is_admin: false,
            },
            now,
        )?;
        db.record_login(user.id, now)
    })
    .await?;

    info!("Registered user {}", user.id);
    let token = create_token(&state, user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "User registered successfully".into(),
            token,
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Please provide email and password".into()));
    }

    let email = normalize_email(&req.email);
    let row = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(invalid_credentials)?;

    if !row.user.is_active {
        return Err(ApiError::Authentication("Account has been deactivated".into()));
    }

    if !verify_password(&req.password, &row.password_hash)? {
        return Err(invalid_credentials());
    }

    let user_id = row.user.id;
    let user = run_db(&state, move |db| db.record_login(user_id, Utc::now())).await?;
    let token = create_token(&state, user.id)?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".into(),
        token,
        user,
    }))
}

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(serde_json::json!({ "success": true, "user": user }))
}

pub async fn refresh(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let token = create_token(&state, user.id)?;
    Ok(Json(AuthResponse {
        success: true,
        message: "Token refreshed successfully".into(),
        token,
        user,
    }))
}

/// Tokens are stateless; the client drops its copy.
pub async fn logout() -> impl IntoResponse {
    Json(serde_json::json!({ "success": true, "message": "Logged out successfully" }))
}

/// Create the configured admin account, or promote it if it already exists.
pub fn bootstrap_admin(db: &Database, email: &str, password: &str) -> anyhow::Result<User> {
    let email = validate::email(email)?;
    validate::password(password)?;

    let now = Utc::now();
    if let Some(row) = db.get_user_by_email(&email)? {
        if row.user.is_admin {
            return Ok(row.user);
        }
        info!("Promoting {} to admin", email);
        return db.set_admin(row.user.id, true, now);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!("{}", e))?;
    let user = db.create_user(
        NewUser {
            name: "Administrator",
            email: &email,
            password_hash: &password_hash,
            is_admin: true,
        },
        now,
    )?;
    info!("Created admin account {}", email);
    Ok(user)
}

fn invalid_credentials() -> ApiError {
    ApiError::Authentication("Invalid email or password".into())
}

pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Unexpected(anyhow::anyhow!("password hashing failed: {}", e)))
}

pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Unexpected(anyhow::anyhow!("stored hash unreadable: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn create_token(state: &AppStateInner, user_id: Uuid) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        exp: (Utc::now() + state.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Unexpected(e.into()))
}

pub(crate) fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}
