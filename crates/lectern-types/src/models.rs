use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::moderation::Moderation;

// -- Users --

/// Public view of an account. There is deliberately no password field:
/// the hash stays in lectern-db's row type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_image: Option<String>,
    pub is_admin: bool,
    pub bio: String,
    pub location: String,
    pub preferences: Preferences,
    pub favorite_books: Vec<Uuid>,
    pub favorite_songs: Vec<Uuid>,
    pub contributions_count: u64,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    pub email: bool,
    pub push: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub notifications: NotificationPrefs,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            notifications: NotificationPrefs::default(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationPrefsPatch {
    pub email: Option<bool>,
    pub push: Option<bool>,
}

/// Partial preference update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub notifications: Option<NotificationPrefsPatch>,
    pub language: Option<String>,
}

impl Preferences {
    pub fn merge(&mut self, patch: PreferencesPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(n) = patch.notifications {
            if let Some(email) = n.email {
                self.notifications.email = email;
            }
            if let Some(push) = n.push {
                self.notifications.push = push;
            }
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
    }
}

/// Emails are compared and stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// -- Favorites --

/// Which favorites set an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteKind {
    Book,
    Song,
}

/// Result of a favorites toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteToggle {
    pub is_favorite: bool,
    pub favorites: Vec<Uuid>,
}

// -- Songs --

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongDetails {
    pub title: String,
    pub singer: String,
    pub lyrics: String,
    pub audio_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: SongDetails,
    pub submitted_by: Option<Uuid>,
    #[serde(flatten)]
    moderation: Moderation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Song {
    pub fn submit(details: SongDetails, submitter: Uuid, now: DateTime<Utc>) -> Self {
        Self::restore(Uuid::new_v4(), details, Some(submitter), Moderation::pending(), now, now)
    }

    pub fn publish(details: SongDetails, admin_id: Uuid, now: DateTime<Utc>) -> Self {
        Self::restore(
            Uuid::new_v4(),
            details,
            None,
            Moderation::preapproved(admin_id, now),
            now,
            now,
        )
    }

    pub fn restore(
        id: Uuid,
        details: SongDetails,
        submitted_by: Option<Uuid>,
        moderation: Moderation,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            details,
            submitted_by,
            moderation,
            created_at,
            updated_at,
        }
    }

    pub fn moderation(&self) -> &Moderation {
        &self.moderation
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
}

// -- Notifications --

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    /// `None` means a broadcast visible to every user.
    pub user_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            message: message.into(),
            user_id,
            is_read: false,
            created_at: now,
        }
    }
}

// -- Reports --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Book,
    Song,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
}

macro_rules! str_enum {
    ($ty:ty { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err(DomainError::validation(format!(
                        "Unknown {} '{}'",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

str_enum!(ReportKind { Book => "book", Song => "song" });
str_enum!(ReportStatus { Pending => "pending", Reviewed => "reviewed", Resolved => "resolved" });
str_enum!(Theme { Light => "light", Dark => "dark", System => "system" });

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub title: String,
    pub description: String,
    pub screenshot_url: String,
    pub reporter_id: Uuid,
    /// Reporter name at submission time; not updated on profile edits.
    pub reporter_name: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Reader@Example.ORG "), "reader@example.org");
    }

    #[test]
    fn test_preferences_merge_is_partial() {
        let mut prefs = Preferences::default();
        prefs.merge(PreferencesPatch {
            theme: Some(Theme::Dark),
            notifications: Some(NotificationPrefsPatch {
                email: Some(false),
                push: None,
            }),
            language: None,
        });
        assert_eq!(prefs.theme, Theme::Dark);
        assert!(!prefs.notifications.email);
        assert!(prefs.notifications.push);
        assert_eq!(prefs.language, "en");
    }

    #[test]
    fn test_report_enums_parse() {
        assert_eq!("reviewed".parse::<ReportStatus>().unwrap(), ReportStatus::Reviewed);
        assert_eq!("song".parse::<ReportKind>().unwrap(), ReportKind::Song);
        assert!("closed".parse::<ReportStatus>().is_err());
    }

    #[test]
    fn test_song_moderation() {
        let submitter = Uuid::new_v4();
        let details = SongDetails {
            title: "Axion Estin".into(),
            singer: "Choir".into(),
            lyrics: "It is truly meet".into(),
            audio_url: String::new(),
        };
        let mut song = Song::submit(details, submitter, Utc::now());
        assert!(!song.moderation().is_verified());
        song.approve(Uuid::new_v4(), Utc::now()).unwrap();
        assert!(song.moderation().is_verified());
        assert!(song.reject("late", Utc::now()).is_err());
    }
}
