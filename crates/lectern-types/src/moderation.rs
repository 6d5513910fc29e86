//! Approval workflow shared by books and songs.
//!
//! A [`Moderation`] record can only be built in a consistent state and only
//! moves through [`Moderation::approve`] / [`Moderation::reject`], so
//! `approved` always implies verified and `rejected` always carries a reason.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

pub const MAX_REJECTION_REASON: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::validation(format!("Unknown status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Moderation {
    status: ModerationStatus,
    is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    verified_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection_reason: Option<String>,
}

impl Moderation {
    /// Initial state of anything submitted by a regular user.
    pub fn pending() -> Self {
        Self {
            status: ModerationStatus::Pending,
            is_verified: false,
            verified_by: None,
            verified_at: None,
            rejection_reason: None,
        }
    }

    /// Admin-created content skips the queue.
    pub fn preapproved(admin_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            status: ModerationStatus::Approved,
            is_verified: true,
            verified_by: Some(admin_id),
            verified_at: Some(at),
            rejection_reason: None,
        }
    }

    /// Rebuild a record read back from storage, refusing combinations the
    /// workflow could never have produced.
    pub fn restore(
        status: ModerationStatus,
        verified_by: Option<Uuid>,
        verified_at: Option<DateTime<Utc>>,
        rejection_reason: Option<String>,
    ) -> Result<Self, DomainError> {
        let record = match status {
            ModerationStatus::Pending => Self::pending(),
            ModerationStatus::Approved => Self {
                status,
                is_verified: true,
                verified_by,
                verified_at,
                rejection_reason: None,
            },
            ModerationStatus::Rejected => {
                let reason = rejection_reason
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| DomainError::validation("Rejected content without a reason"))?;
                Self {
                    status,
                    is_verified: false,
                    verified_by: None,
                    verified_at: None,
                    rejection_reason: Some(reason),
                }
            }
        };
        Ok(record)
    }

    pub fn status(&self) -> ModerationStatus {
        self.status
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn verified_by(&self) -> Option<Uuid> {
        self.verified_by
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// `pending -> approved`: verifies and clears any stale rejection reason.
    pub fn approve(&mut self, admin_id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_pending(ModerationStatus::Approved)?;
        *self = Self::preapproved(admin_id, at);
        Ok(())
    }

    /// `pending -> rejected`. Verification stays false.
    pub fn reject(&mut self, reason: &str) -> Result<(), DomainError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("Rejection reason is required"));
        }
        if reason.chars().count() > MAX_REJECTION_REASON {
            return Err(DomainError::validation(format!(
                "Rejection reason cannot be more than {} characters",
                MAX_REJECTION_REASON
            )));
        }
        self.ensure_pending(ModerationStatus::Rejected)?;
        self.status = ModerationStatus::Rejected;
        self.rejection_reason = Some(reason.to_string());
        Ok(())
    }

    fn ensure_pending(&self, to: ModerationStatus) -> Result<(), DomainError> {
        if self.status != ModerationStatus::Pending {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_pending() {
        let admin = Uuid::new_v4();
        let now = Utc::now();
        let mut m = Moderation::pending();
        assert!(!m.is_verified());

        m.approve(admin, now).unwrap();
        assert_eq!(m.status(), ModerationStatus::Approved);
        assert!(m.is_verified());
        assert_eq!(m.verified_by(), Some(admin));
        assert_eq!(m.verified_at(), Some(now));
        assert_eq!(m.rejection_reason(), None);
    }

    #[test]
    fn test_reject_keeps_unverified() {
        let mut m = Moderation::pending();
        m.reject("  duplicate of an existing entry ").unwrap();
        assert_eq!(m.status(), ModerationStatus::Rejected);
        assert!(!m.is_verified());
        assert_eq!(m.rejection_reason(), Some("duplicate of an existing entry"));
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut m = Moderation::pending();
        assert!(matches!(m.reject("   "), Err(DomainError::Validation(_))));
        let long = "x".repeat(MAX_REJECTION_REASON + 1);
        assert!(matches!(m.reject(&long), Err(DomainError::Validation(_))));
        assert_eq!(m.status(), ModerationStatus::Pending);
    }

    #[test]
    fn test_no_transition_out_of_final_states() {
        let admin = Uuid::new_v4();
        let mut approved = Moderation::preapproved(admin, Utc::now());
        assert_eq!(
            approved.reject("late"),
            Err(DomainError::InvalidTransition {
                from: ModerationStatus::Approved,
                to: ModerationStatus::Rejected,
            })
        );

        let mut rejected = Moderation::pending();
        rejected.reject("spam").unwrap();
        assert!(matches!(
            rejected.approve(admin, Utc::now()),
            Err(DomainError::InvalidTransition { .. })
        ));
        assert_eq!(rejected.rejection_reason(), Some("spam"));
    }

    #[test]
    fn test_restore_rejects_inconsistent_rows() {
        assert!(Moderation::restore(ModerationStatus::Rejected, None, None, None).is_err());
        let m = Moderation::restore(ModerationStatus::Approved, None, None, Some("old".into())).unwrap();
        assert!(m.is_verified());
        assert_eq!(m.rejection_reason(), None);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("approved".parse::<ModerationStatus>().unwrap(), ModerationStatus::Approved);
        assert!("archived".parse::<ModerationStatus>().is_err());
    }
}
