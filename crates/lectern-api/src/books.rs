use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use lectern_db::catalog::{CatalogQuery, Counter};
use lectern_types::api::{BookRequest, ReviewRequest, UpdateReviewRequest};
use lectern_types::book::{Book, BookDetails, Category, Review, ReviewPatch};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::CurrentUser;
use crate::run_db;

#[derive(Debug, Deserialize)]
pub struct BookListParams {
    pub search: Option<String>,
    pub category: Option<String>,
}

pub async fn list_books(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<BookListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let category = match params.category.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => Some(c.parse::<Category>()?),
        _ => None,
    };
    let query = CatalogQuery {
        search: params.search,
        category,
    };

    let books = run_db(&state, move |db| db.list_books(&query)).await?;
    Ok(Json(books))
}

/// Fetching a book counts as a view.
pub async fn get_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let book = run_db(&state, move |db| db.increment_book_counter(id, Counter::Views)).await?;
    Ok(Json(book))
}

pub async fn record_download(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let book = run_db(&state, move |db| db.increment_book_counter(id, Counter::Downloads)).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "downloadCount": book.download_count,
    })))
}

pub async fn submit_book(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<BookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let details = BookDetails::try_from(req)?;
    let book = Book::submit(details, user.id, Utc::now());

    let book = run_db(&state, move |db| {
        db.insert_book(&book)?;
        db.increment_contributions(user.id)?;
        Ok(book)
    })
    .await?;

    info!("Book {} submitted by {}", book.id, user.id);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Book submitted for review",
            "book": book,
        })),
    ))
}

pub async fn add_review(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(book_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (comment, rating) = req.validate()?;
    let review = Review::new(user.id, user.name, comment, rating, Utc::now());

    let (book, review) = run_db(&state, move |db| {
        db.update_book(book_id, |book| book.add_review(review).cloned())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Review added successfully",
            "review": review,
            "book": book,
        })),
    ))
}

/// Only the review's author may edit it.
pub async fn update_review(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((book_id, review_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = ReviewPatch::try_from(req)?;
    let author = review_author(&state, book_id, review_id).await?;
    if author != user.id {
        return Err(ApiError::Authorization(
            "You can only edit your own reviews".into(),
        ));
    }

    let (book, review) = run_db(&state, move |db| {
        db.update_book(book_id, |book| {
            book.update_review(review_id, patch, Utc::now()).cloned()
        })
    })
    .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Review updated successfully",
        "review": review,
        "book": book,
    })))
}

/// Authors may delete their own review; admins may delete any.
pub async fn delete_review(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((book_id, review_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let author = review_author(&state, book_id, review_id).await?;
    if author != user.id && !user.is_admin {
        return Err(ApiError::Authorization(
            "You can only delete your own reviews".into(),
        ));
    }

    let (book, _) = run_db(&state, move |db| {
        db.update_book(book_id, |book| book.delete_review(review_id, Utc::now()))
    })
    .await?;

    if author != user.id {
        info!("Admin {} removed review {} from book {}", user.id, review_id, book_id);
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Review deleted successfully",
        "book": book,
    })))
}

async fn review_author(state: &AppState, book_id: Uuid, review_id: Uuid) -> Result<Uuid, ApiError> {
    let book = run_db(state, move |db| db.get_book(book_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Book"))?;
    book.review(review_id)
        .map(|r| r.user_id)
        .ok_or_else(|| ApiError::not_found("Review"))
}
