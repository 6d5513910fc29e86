use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use lectern_types::models::Notification;

use crate::Database;
use crate::models::{OptionalExt, opt_uuid_col, uuid_col};

const NOTIFICATION_COLUMNS: &str = "id, title, message, user_id, is_read, created_at";

impl Database {
    pub fn insert_notification(&self, n: &Notification) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, title, message, user_id, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    n.id.to_string(),
                    n.title,
                    n.message,
                    n.user_id.map(|id| id.to_string()),
                    n.is_read,
                    n.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// The user's own notifications plus broadcasts, newest first.
    pub fn notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM notifications
                 WHERE user_id = ?1 OR user_id IS NULL
                 ORDER BY created_at DESC, rowid DESC",
                NOTIFICATION_COLUMNS
            ))?;
            let rows = stmt
                .query_map([user_id.to_string()], notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks a notification read if `user_id` may see it. `None` means the
    /// notification doesn't exist or belongs to someone else.
    pub fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1
                 WHERE id = ?1 AND (user_id = ?2 OR user_id IS NULL)",
                params![id.to_string(), user_id.to_string()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_notification(conn, id)
        })
    }
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: uuid_col(row, 0)?,
        title: row.get(1)?,
        message: row.get(2)?,
        user_id: opt_uuid_col(row, 3)?,
        is_read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_notification(conn: &Connection, id: Uuid) -> Result<Option<Notification>> {
    conn.query_row(
        &format!("SELECT {} FROM notifications WHERE id = ?1", NOTIFICATION_COLUMNS),
        [id.to_string()],
        notification_from_row,
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TempDb;
    use crate::users::NewUser;
    use chrono::Utc;

    fn user(db: &Database, email: &str) -> Uuid {
        db.create_user(
            NewUser {
                name: "Reader",
                email,
                password_hash: "hash",
                is_admin: false,
            },
            Utc::now(),
        )
        .unwrap()
        .id
    }

    #[test]
    fn test_visibility_and_read_flag() {
        let t = TempDb::new();
        let anna = user(&t.db, "anna@example.com");
        let boris = user(&t.db, "boris@example.com");

        let direct = Notification::new("Book Approved", "yours", Some(anna), Utc::now());
        let broadcast = Notification::new("Feast", "for all", None, Utc::now());
        t.db.insert_notification(&direct).unwrap();
        t.db.insert_notification(&broadcast).unwrap();

        assert_eq!(t.db.notifications_for(anna).unwrap().len(), 2);
        let for_boris = t.db.notifications_for(boris).unwrap();
        assert_eq!(for_boris.len(), 1);
        assert_eq!(for_boris[0].id, broadcast.id);

        assert!(t.db.mark_notification_read(direct.id, boris).unwrap().is_none());
        let read = t.db.mark_notification_read(direct.id, anna).unwrap().unwrap();
        assert!(read.is_read);
        assert!(t.db.mark_notification_read(broadcast.id, boris).unwrap().unwrap().is_read);
    }
}
