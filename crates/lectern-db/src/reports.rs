use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use lectern_types::models::{Report, ReportStatus};

use crate::models::{OptionalExt, enum_col, uuid_col};
use crate::{Database, DbError};

const REPORT_COLUMNS: &str = "id, kind, title, description, screenshot_url, reporter_id, reporter_name, \
     status, created_at, updated_at";

impl Database {
    pub fn insert_report(&self, r: &Report) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO reports ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    REPORT_COLUMNS
                ),
                params![
                    r.id.to_string(),
                    r.kind.as_str(),
                    r.title,
                    r.description,
                    r.screenshot_url,
                    r.reporter_id.to_string(),
                    r.reporter_name,
                    r.status.as_str(),
                    r.created_at,
                    r.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_reports(&self) -> Result<Vec<Report>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM reports ORDER BY created_at DESC, rowid DESC",
                REPORT_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], report_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Any status may be set from any other.
    pub fn set_report_status(&self, id: Uuid, status: ReportStatus, now: DateTime<Utc>) -> Result<Report> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE reports SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now, id.to_string()],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("Report").into());
            }
            query_report(conn, id)?.ok_or_else(|| DbError::NotFound("Report").into())
        })
    }
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: uuid_col(row, 0)?,
        kind: enum_col(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        screenshot_url: row.get(4)?,
        reporter_id: uuid_col(row, 5)?,
        reporter_name: row.get(6)?,
        status: enum_col(row, 7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn query_report(conn: &Connection, id: Uuid) -> Result<Option<Report>> {
    conn.query_row(
        &format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS),
        [id.to_string()],
        report_from_row,
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TempDb;
    use crate::users::NewUser;
    use lectern_types::models::ReportKind;

    #[test]
    fn test_status_moves_freely() {
        let t = TempDb::new();
        let reporter = t
            .db
            .create_user(
                NewUser {
                    name: "Reader",
                    email: "anna@example.com",
                    password_hash: "hash",
                    is_admin: false,
                },
                Utc::now(),
            )
            .unwrap();
        let now = Utc::now();
        let report = Report {
            id: Uuid::new_v4(),
            kind: ReportKind::Book,
            title: "Typo".into(),
            description: "Page 3".into(),
            screenshot_url: "https://img.example/1.png".into(),
            reporter_id: reporter.id,
            reporter_name: reporter.name.clone(),
            status: ReportStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        t.db.insert_report(&report).unwrap();

        let resolved = t.db.set_report_status(report.id, ReportStatus::Resolved, Utc::now()).unwrap();
        assert_eq!(resolved.status, ReportStatus::Resolved);
        let back = t.db.set_report_status(report.id, ReportStatus::Pending, Utc::now()).unwrap();
        assert_eq!(back.status, ReportStatus::Pending);
        assert_eq!(t.db.list_reports().unwrap().len(), 1);

        let missing = t.db.set_report_status(Uuid::new_v4(), ReportStatus::Reviewed, Utc::now());
        assert!(missing.is_err());
    }
}
