use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::book::{BookDetails, Category, MAX_COMMENT_LEN, Rating, ReviewPatch};
use crate::error::DomainError;
use crate::models::{PreferencesPatch, ReportKind, ReportStatus, SongDetails, User};
use crate::validate;

// -- JWT Claims --

/// Bearer token payload. Only the user id is trusted; everything else about
/// the caller is re-read from the database on each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: User,
}

// -- Profile --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub preferences: Option<PreferencesPatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// -- Catalog --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub title: String,
    pub author: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub page_count: Option<i64>,
    pub isbn: Option<String>,
    pub units_available: Option<i64>,
    pub image_url: Option<String>,
}

impl TryFrom<BookRequest> for BookDetails {
    type Error = DomainError;

    fn try_from(req: BookRequest) -> Result<Self, Self::Error> {
        let title = validate::required("Book title", &req.title, 200)?;
        let author = validate::required("Author", &req.author, 100)?;
        let description = validate::required("Description", &req.description, 2000)?;

        let tags = req
            .tags
            .iter()
            .map(|t| validate::bounded("Tag", t, 30))
            .filter(|t| !matches!(t, Ok(s) if s.is_empty()))
            .collect::<Result<Vec<_>, _>>()?;

        let language = match req.language.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => "English".to_string(),
        };

        let page_count = u32::try_from(req.page_count.unwrap_or(0))
            .map_err(|_| DomainError::validation("Page count cannot be negative"))?;
        let units_available = u32::try_from(req.units_available.unwrap_or(0))
            .map_err(|_| DomainError::validation("Units available cannot be negative"))?;

        let isbn = match req.isbn.as_deref().map(str::trim) {
            Some(i) if !i.is_empty() => Some(validate::isbn(i)?),
            _ => None,
        };

        Ok(BookDetails {
            title,
            author,
            description,
            category: req.category.unwrap_or_default(),
            tags,
            language,
            page_count,
            isbn,
            units_available,
            image_url: req.image_url.unwrap_or_default().trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRequest {
    pub title: String,
    pub singer: String,
    pub lyrics: String,
    pub audio_url: Option<String>,
}

impl TryFrom<SongRequest> for SongDetails {
    type Error = DomainError;

    fn try_from(req: SongRequest) -> Result<Self, Self::Error> {
        Ok(SongDetails {
            title: validate::required("Song title", &req.title, 200)?,
            singer: validate::required("Singer", &req.singer, 100)?,
            lyrics: validate::required("Lyrics", &req.lyrics, 20_000)?,
            audio_url: req.audio_url.unwrap_or_default().trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    pub comment: String,
    pub rating: i64,
}

impl ReviewRequest {
    pub fn validate(&self) -> Result<(String, Rating), DomainError> {
        let comment = validate::required("Review comment", &self.comment, MAX_COMMENT_LEN)?;
        let rating = Rating::try_from(self.rating)?;
        Ok((comment, rating))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReviewRequest {
    pub comment: Option<String>,
    pub rating: Option<i64>,
}

impl TryFrom<UpdateReviewRequest> for ReviewPatch {
    type Error = DomainError;

    fn try_from(req: UpdateReviewRequest) -> Result<Self, Self::Error> {
        Ok(ReviewPatch {
            comment: req
                .comment
                .map(|c| validate::required("Review comment", &c, MAX_COMMENT_LEN))
                .transpose()?,
            rating: req.rating.map(Rating::try_from).transpose()?,
        })
    }
}

// -- Moderation --

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    pub title: String,
    pub message: String,
    pub user_id: Option<Uuid>,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub title: String,
    pub description: String,
    pub screenshot_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportStatusRequest {
    pub status: ReportStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_request() -> BookRequest {
        serde_json::from_value(serde_json::json!({
            "title": " Philokalia ",
            "author": "Various",
            "description": "Texts on prayer",
            "category": "Prayer Book",
            "tags": ["prayer", "  "],
            "pageCount": 400,
            "isbn": "978-0-306-40615-7"
        }))
        .unwrap()
    }

    #[test]
    fn test_book_request_defaults() {
        let details = BookDetails::try_from(book_request()).unwrap();
        assert_eq!(details.title, "Philokalia");
        assert_eq!(details.category, Category::PrayerBook);
        assert_eq!(details.tags, vec!["prayer".to_string()]);
        assert_eq!(details.language, "English");
        assert_eq!(details.units_available, 0);
    }

    #[test]
    fn test_book_request_rejects_bad_fields() {
        let mut req = book_request();
        req.page_count = Some(-1);
        assert!(BookDetails::try_from(req).is_err());

        let mut req = book_request();
        req.isbn = Some("nope".into());
        assert!(BookDetails::try_from(req).is_err());

        let mut req = book_request();
        req.tags = vec!["x".repeat(31)];
        assert!(BookDetails::try_from(req).is_err());
    }

    #[test]
    fn test_unknown_category_fails_to_parse() {
        let res = serde_json::from_value::<BookRequest>(serde_json::json!({
            "title": "t", "author": "a", "description": "d", "category": "Poetry"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn test_review_request_validation() {
        let ok = ReviewRequest { comment: "Edifying".into(), rating: 5 };
        assert_eq!(ok.validate().unwrap().1.value(), 5);
        let bad = ReviewRequest { comment: "Edifying".into(), rating: 6 };
        assert!(bad.validate().is_err());
        let empty = ReviewRequest { comment: " ".into(), rating: 3 };
        assert!(empty.validate().is_err());
    }
}
