use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use lectern_types::models::{FavoriteKind, FavoriteToggle, Preferences, PreferencesPatch, User};

use crate::models::{OptionalExt, UserRow, count_col, is_unique_violation, json_col, uuid_col};
use crate::{Database, DbError};

const USER_COLUMNS: &str = "id, name, email, password, profile_image, is_admin, bio, location, \
     preferences, contributions_count, last_login, is_active, email_verified, created_at, updated_at";

pub struct NewUser<'a> {
    pub name: &'a str,
    /// Already normalized by the caller.
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_admin: bool,
}

/// Profile fields a user may edit; `None` leaves the stored value alone.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub preferences: Option<PreferencesPatch>,
}

/// Membership table backing one favorites set.
struct FavoriteSet {
    table: &'static str,
    column: &'static str,
}

const FAVORITE_BOOKS: FavoriteSet = FavoriteSet {
    table: "favorite_books",
    column: "book_id",
};

const FAVORITE_SONGS: FavoriteSet = FavoriteSet {
    table: "favorite_songs",
    column: "song_id",
};

fn favorite_set(kind: FavoriteKind) -> &'static FavoriteSet {
    match kind {
        FavoriteKind::Book => &FAVORITE_BOOKS,
        FavoriteKind::Song => &FAVORITE_SONGS,
    }
}

impl Database {
    // -- Users --

    pub fn create_user(&self, new: NewUser<'_>, now: DateTime<Utc>) -> Result<User> {
        let id = Uuid::new_v4();
        let preferences = serde_json::to_string(&Preferences::default())?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, is_admin, preferences, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![id.to_string(), new.name, new.email, new.password_hash, new.is_admin, preferences, now],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    anyhow::Error::from(DbError::Conflict("User with this email already exists".into()))
                } else {
                    e.into()
                }
            })?;
            require_user(conn, id)
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| Ok(query_user_row(conn, "id", &id.to_string())?.map(|r| r.user)))
    }

    /// Includes the password hash; only for credential checks.
    pub fn get_user_row(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_row(conn, "id", &id.to_string()))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_row(conn, "email", email))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY created_at DESC",
                USER_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|row| with_favorites(conn, row).map(|r| r.user))
                .collect()
        })
    }

    pub fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> Result<User> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_login = ?1 WHERE id = ?2",
                params![now, id.to_string()],
            )?;
            require_user(conn, id)
        })
    }

    pub fn update_profile(&self, id: Uuid, update: ProfileUpdate, now: DateTime<Utc>) -> Result<User> {
        self.with_conn_mut(|conn| {
            let mut user = require_user(conn, id)?;
            if let Some(name) = update.name {
                user.name = name;
            }
            if let Some(bio) = update.bio {
                user.bio = bio;
            }
            if let Some(location) = update.location {
                user.location = location;
            }
            if let Some(patch) = update.preferences {
                user.preferences.merge(patch);
            }
            conn.execute(
                "UPDATE users SET name = ?1, bio = ?2, location = ?3, preferences = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    user.name,
                    user.bio,
                    user.location,
                    serde_json::to_string(&user.preferences)?,
                    now,
                    id.to_string(),
                ],
            )?;
            require_user(conn, id)
        })
    }

    pub fn set_password(&self, id: Uuid, password_hash: &str, now: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1, updated_at = ?2 WHERE id = ?3",
                params![password_hash, now, id.to_string()],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("User").into());
            }
            Ok(())
        })
    }

    pub fn set_active(&self, id: Uuid, is_active: bool, now: DateTime<Utc>) -> Result<User> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
                params![is_active, now, id.to_string()],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("User").into());
            }
            require_user(conn, id)
        })
    }

    pub fn set_admin(&self, id: Uuid, is_admin: bool, now: DateTime<Utc>) -> Result<User> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET is_admin = ?1, updated_at = ?2 WHERE id = ?3",
                params![is_admin, now, id.to_string()],
            )?;
            require_user(conn, id)
        })
    }

    pub fn increment_contributions(&self, id: Uuid) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET contributions_count = contributions_count + 1 WHERE id = ?1",
                [id.to_string()],
            )?;
            Ok(())
        })
    }

    // -- Favorites --

    /// Flip membership of `item_id` in the user's `kind` favorites.
    /// The composite primary key keeps each set free of duplicates.
    pub fn toggle_favorite(
        &self,
        user_id: Uuid,
        kind: FavoriteKind,
        item_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FavoriteToggle> {
        let set = favorite_set(kind);
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                &format!("DELETE FROM {} WHERE user_id = ?1 AND {} = ?2", set.table, set.column),
                params![user_id.to_string(), item_id.to_string()],
            )?;

            if removed == 0 {
                conn.execute(
                    &format!(
                        "INSERT OR IGNORE INTO {} (user_id, {}, created_at) VALUES (?1, ?2, ?3)",
                        set.table, set.column
                    ),
                    params![user_id.to_string(), item_id.to_string(), now],
                )?;
            }

            Ok(FavoriteToggle {
                is_favorite: removed == 0,
                favorites: query_favorites(conn, user_id, set)?,
            })
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        user: User {
            id: uuid_col(row, 0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            profile_image: row.get(4)?,
            is_admin: row.get(5)?,
            bio: row.get(6)?,
            location: row.get(7)?,
            preferences: json_col(row, 8)?,
            favorite_books: Vec::new(),
            favorite_songs: Vec::new(),
            contributions_count: count_col(row, 9)?,
            last_login: row.get(10)?,
            is_active: row.get(11)?,
            email_verified: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        },
        password_hash: row.get(3)?,
    })
}

fn with_favorites(conn: &Connection, mut row: UserRow) -> Result<UserRow> {
    row.user.favorite_books = query_favorites(conn, row.user.id, &FAVORITE_BOOKS)?;
    row.user.favorite_songs = query_favorites(conn, row.user.id, &FAVORITE_SONGS)?;
    Ok(row)
}

/// `column` is always a literal from this module, never caller input.
fn query_user_row(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column),
            [value],
            user_from_row,
        )
        .optional()?;

    row.map(|r| with_favorites(conn, r)).transpose()
}

fn require_user(conn: &Connection, id: Uuid) -> Result<User> {
    query_user_row(conn, "id", &id.to_string())?
        .map(|r| r.user)
        .ok_or_else(|| DbError::NotFound("User").into())
}

fn query_favorites(conn: &Connection, user_id: Uuid, set: &FavoriteSet) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} WHERE user_id = ?1 ORDER BY created_at, rowid",
        set.column, set.table
    ))?;
    let ids = stmt
        .query_map([user_id.to_string()], |row| uuid_col(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}
