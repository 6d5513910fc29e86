//! Book catalog entity with its embedded reviews.
//!
//! `average_rating` and `total_reviews` are private and only ever written by
//! [`Book::recompute_aggregate`], which every review mutation calls last.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::moderation::Moderation;

pub const MAX_COMMENT_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Theology,
    Liturgy,
    Spirituality,
    History,
    Biography,
    #[serde(rename = "Prayer Book")]
    PrayerBook,
    Scripture,
    Patristics,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Self::Theology,
        Self::Liturgy,
        Self::Spirituality,
        Self::History,
        Self::Biography,
        Self::PrayerBook,
        Self::Scripture,
        Self::Patristics,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Theology => "Theology",
            Self::Liturgy => "Liturgy",
            Self::Spirituality => "Spirituality",
            Self::History => "History",
            Self::Biography => "Biography",
            Self::PrayerBook => "Prayer Book",
            Self::Scripture => "Scripture",
            Self::Patristics => "Patristics",
            Self::General => "General",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("Unknown category '{}'", s)))
    }
}

/// Star rating, 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = DomainError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            1..=5 => Ok(Self(v as u8)),
            _ => Err(DomainError::validation("Rating must be between 1 and 5")),
        }
    }
}

impl From<Rating> for i64 {
    fn from(r: Rating) -> Self {
        r.0 as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Author name as it was when the review was written.
    pub user_name: String,
    pub comment: String,
    pub rating: Rating,
    #[serde(default)]
    pub likes: Vec<Uuid>,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        user_id: Uuid,
        user_name: impl Into<String>,
        comment: impl Into<String>,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_name: user_name.into(),
            comment: comment.into(),
            rating,
            likes: Vec::new(),
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields a review author may change after posting.
#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub comment: Option<String>,
    pub rating: Option<Rating>,
}

/// Descriptive metadata, already validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub description: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub language: String,
    pub page_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub units_available: u32,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: BookDetails,
    pub submitted_by: Option<Uuid>,
    #[serde(flatten)]
    moderation: Moderation,
    reviews: Vec<Review>,
    average_rating: f64,
    total_reviews: u32,
    pub view_count: u64,
    pub download_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything persisted for a book except the derived aggregate.
#[derive(Debug, Clone)]
pub struct StoredBook {
    pub id: Uuid,
    pub details: BookDetails,
    pub submitted_by: Option<Uuid>,
    pub moderation: Moderation,
    pub reviews: Vec<Review>,
    pub view_count: u64,
    pub download_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredBook> for Book {
    fn from(s: StoredBook) -> Self {
        let mut book = Self {
            id: s.id,
            details: s.details,
            submitted_by: s.submitted_by,
            moderation: s.moderation,
            reviews: s.reviews,
            average_rating: 0.0,
            total_reviews: 0,
            view_count: s.view_count,
            download_count: s.download_count,
            created_at: s.created_at,
            updated_at: s.updated_at,
        };
        book.recompute_aggregate();
        book
    }
}

impl Book {
    /// A user submission waiting in the moderation queue.
    pub fn submit(details: BookDetails, submitter: Uuid, now: DateTime<Utc>) -> Self {
        Self::new(details, Some(submitter), Moderation::pending(), now)
    }

    /// Added by an admin: approved and verified from the start.
    pub fn publish(details: BookDetails, admin_id: Uuid, now: DateTime<Utc>) -> Self {
        Self::new(details, None, Moderation::preapproved(admin_id, now), now)
    }

    fn new(
        details: BookDetails,
        submitted_by: Option<Uuid>,
        moderation: Moderation,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            details,
            submitted_by,
            moderation,
            reviews: Vec::new(),
            average_rating: 0.0,
            total_reviews: 0,
            view_count: 0,
            download_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn moderation(&self) -> &Moderation {
        &self.moderation
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn review(&self, review_id: Uuid) -> Option<&Review> {
        self.reviews.iter().find(|r| r.id == review_id)
    }

    pub fn average_rating(&self) -> f64 {
        self.average_rating
    }

    pub fn total_reviews(&self) -> u32 {
        self.total_reviews
    }

    pub fn approve(&mut self, admin_id: Uuid, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.moderation.approve(admin_id, now)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.moderation.reject(reason)?;
        self.updated_at = now;
        Ok(())
    }

    /// One review per user per book.
    pub fn add_review(&mut self, review: Review) -> Result<&Review, DomainError> {
        if self.reviews.iter().any(|r| r.user_id == review.user_id) {
            return Err(DomainError::DuplicateReview);
        }
        self.updated_at = review.created_at;
        self.reviews.push(review);
        self.recompute_aggregate();
        Ok(&self.reviews[self.reviews.len() - 1])
    }

    pub fn update_review(
        &mut self,
        review_id: Uuid,
        patch: ReviewPatch,
        now: DateTime<Utc>,
    ) -> Result<&Review, DomainError> {
        let idx = self.review_index(review_id)?;
        let review = &mut self.reviews[idx];
        if let Some(comment) = patch.comment {
            review.comment = comment;
        }
        if let Some(rating) = patch.rating {
            review.rating = rating;
        }
        review.updated_at = now;
        self.updated_at = now;
        self.recompute_aggregate();
        Ok(&self.reviews[idx])
    }

    pub fn delete_review(&mut self, review_id: Uuid, now: DateTime<Utc>) -> Result<Review, DomainError> {
        let idx = self.review_index(review_id)?;
        let removed = self.reviews.remove(idx);
        self.updated_at = now;
        self.recompute_aggregate();
        Ok(removed)
    }

    fn review_index(&self, review_id: Uuid) -> Result<usize, DomainError> {
        self.reviews
            .iter()
            .position(|r| r.id == review_id)
            .ok_or(DomainError::ReviewNotFound(review_id))
    }

    fn recompute_aggregate(&mut self) {
        let (average, total) = aggregate(&self.reviews);
        self.average_rating = average;
        self.total_reviews = total;
    }
}

/// Mean rating rounded half-up to one decimal, plus the review count.
/// Computed in integer tenths so values like 4.45 round the same way every time.
fn aggregate(reviews: &[Review]) -> (f64, u32) {
    if reviews.is_empty() {
        return (0.0, 0);
    }
    let count = reviews.len() as u64;
    let sum: u64 = reviews.iter().map(|r| r.rating.value() as u64).sum();
    let tenths = (sum * 20 + count) / (count * 2);
    (tenths as f64 / 10.0, count as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> BookDetails {
        BookDetails {
            title: "The Ladder of Divine Ascent".into(),
            author: "John Climacus".into(),
            description: "Thirty steps".into(),
            category: Category::Spirituality,
            tags: vec!["ascetic".into()],
            language: "English".into(),
            page_count: 291,
            isbn: None,
            units_available: 2,
            image_url: String::new(),
        }
    }

    fn rating(v: i64) -> Rating {
        Rating::try_from(v).unwrap()
    }

    fn review(v: i64) -> Review {
        Review::new(Uuid::new_v4(), "reader", "good", rating(v), Utc::now())
    }

    fn with_ratings(ratings: &[i64]) -> Book {
        let mut book = Book::submit(details(), Uuid::new_v4(), Utc::now());
        for &v in ratings {
            book.add_review(review(v)).unwrap();
        }
        book
    }

    #[test]
    fn test_empty_aggregate() {
        let book = with_ratings(&[]);
        assert_eq!(book.average_rating(), 0.0);
        assert_eq!(book.total_reviews(), 0);
    }

    #[test]
    fn test_add_then_delete_review() {
        let mut book = with_ratings(&[5, 4, 3]);
        assert_eq!(book.average_rating(), 4.0);
        assert_eq!(book.total_reviews(), 3);

        let three = book.reviews().iter().find(|r| r.rating.value() == 3).unwrap().id;
        book.delete_review(three, Utc::now()).unwrap();
        assert_eq!(book.average_rating(), 4.5);
        assert_eq!(book.total_reviews(), 2);
    }

    #[test]
    fn test_rounding_half_up() {
        // 4.666.. -> 4.7
        assert_eq!(with_ratings(&[5, 5, 4]).average_rating(), 4.7);
        // 4.333.. -> 4.3
        assert_eq!(with_ratings(&[5, 4, 4]).average_rating(), 4.3);
        // 4.25 -> 4.3
        assert_eq!(with_ratings(&[5, 5, 4, 3]).average_rating(), 4.3);
        // 4.45 -> 4.5
        let mut ratings = vec![5; 9];
        ratings.extend(vec![4; 11]);
        assert_eq!(with_ratings(&ratings).average_rating(), 4.5);
        // 1.05 -> 1.1
        let mut ratings = vec![1; 19];
        ratings.push(2);
        assert_eq!(with_ratings(&ratings).average_rating(), 1.1);
    }

    #[test]
    fn test_duplicate_review_rejected() {
        let mut book = with_ratings(&[]);
        let author = Uuid::new_v4();
        book.add_review(Review::new(author, "a", "first", rating(4), Utc::now()))
            .unwrap();
        let err = book
            .add_review(Review::new(author, "a", "second", rating(1), Utc::now()))
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateReview);
        assert_eq!(book.total_reviews(), 1);
        assert_eq!(book.average_rating(), 4.0);
    }

    #[test]
    fn test_update_review_merges_patch() {
        let mut book = with_ratings(&[2, 4]);
        let id = book.reviews()[0].id;
        let patch = ReviewPatch {
            comment: None,
            rating: Some(rating(5)),
        };
        let updated = book.update_review(id, patch, Utc::now()).unwrap();
        assert_eq!(updated.comment, "good");
        assert_eq!(updated.rating.value(), 5);
        assert_eq!(book.average_rating(), 4.5);
        assert_eq!(book.total_reviews(), 2);
    }

    #[test]
    fn test_missing_review() {
        let mut book = with_ratings(&[3]);
        let ghost = Uuid::new_v4();
        assert_eq!(
            book.update_review(ghost, ReviewPatch::default(), Utc::now()).unwrap_err(),
            DomainError::ReviewNotFound(ghost)
        );
        assert_eq!(
            book.delete_review(ghost, Utc::now()).unwrap_err(),
            DomainError::ReviewNotFound(ghost)
        );
        assert_eq!(book.total_reviews(), 1);
    }

    #[test]
    fn test_restore_recomputes_aggregate() {
        let book = with_ratings(&[1, 2]);
        let restored = Book::from(StoredBook {
            id: book.id,
            details: book.details.clone(),
            submitted_by: book.submitted_by,
            moderation: book.moderation().clone(),
            reviews: book.reviews().to_vec(),
            view_count: 7,
            download_count: 1,
            created_at: book.created_at,
            updated_at: book.updated_at,
        });
        assert_eq!(restored.average_rating(), 1.5);
        assert_eq!(restored.total_reviews(), 2);
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::try_from(0).is_err());
        assert!(Rating::try_from(6).is_err());
        assert_eq!(Rating::try_from(5).unwrap().value(), 5);
    }

    #[test]
    fn test_serialized_shape() {
        let book = Book::publish(details(), Uuid::new_v4(), Utc::now());
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["status"], "approved");
        assert_eq!(json["isVerified"], true);
        assert_eq!(json["category"], "Spirituality");
        assert_eq!(json["averageRating"], 0.0);
        assert!(json.get("rejectionReason").is_none());
        assert!(json["submittedBy"].is_null());
    }

    #[test]
    fn test_category_roundtrip_names() {
        assert_eq!("Prayer Book".parse::<Category>().unwrap(), Category::PrayerBook);
        assert!("Poetry".parse::<Category>().is_err());
    }
}
