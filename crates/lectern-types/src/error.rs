use thiserror::Error;
use uuid::Uuid;

use crate::moderation::ModerationStatus;

/// Errors raised by entity-level operations. Carries no HTTP knowledge;
/// lectern-api decides how each variant is presented.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("User has already reviewed this book")]
    DuplicateReview,

    #[error("Review {0} not found")]
    ReviewNotFound(Uuid),

    #[error("Content is {from} and cannot be {to}")]
    InvalidTransition {
        from: ModerationStatus,
        to: ModerationStatus,
    },

    #[error("{0}")]
    Validation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
