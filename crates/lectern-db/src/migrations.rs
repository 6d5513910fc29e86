use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                email               TEXT NOT NULL UNIQUE,
                password            TEXT NOT NULL,
                profile_image       TEXT,
                is_admin            INTEGER NOT NULL DEFAULT 0,
                bio                 TEXT NOT NULL DEFAULT '',
                location            TEXT NOT NULL DEFAULT '',
                preferences         TEXT NOT NULL DEFAULT '{}',
                contributions_count INTEGER NOT NULL DEFAULT 0,
                last_login          TEXT,
                is_active           INTEGER NOT NULL DEFAULT 1,
                email_verified      INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_users_created ON users(created_at);

            -- Reviews and tags are embedded JSON so a book and its rating
            -- aggregate are always written by the same statement.
            CREATE TABLE books (
                id               TEXT PRIMARY KEY,
                title            TEXT NOT NULL,
                author           TEXT NOT NULL,
                description      TEXT NOT NULL,
                category         TEXT NOT NULL DEFAULT 'General',
                tags             TEXT NOT NULL DEFAULT '[]',
                language         TEXT NOT NULL DEFAULT 'English',
                page_count       INTEGER NOT NULL DEFAULT 0,
                isbn             TEXT,
                units_available  INTEGER NOT NULL DEFAULT 0,
                image_url        TEXT NOT NULL DEFAULT '',
                submitted_by     TEXT REFERENCES users(id) ON DELETE SET NULL,
                status           TEXT NOT NULL DEFAULT 'pending',
                is_verified      INTEGER NOT NULL DEFAULT 0,
                verified_by      TEXT,
                verified_at      TEXT,
                rejection_reason TEXT,
                reviews          TEXT NOT NULL DEFAULT '[]',
                average_rating   REAL NOT NULL DEFAULT 0,
                total_reviews    INTEGER NOT NULL DEFAULT 0,
                view_count       INTEGER NOT NULL DEFAULT 0,
                download_count   INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL
            );

            CREATE INDEX idx_books_status ON books(status);
            CREATE INDEX idx_books_verified ON books(is_verified, created_at);
            CREATE INDEX idx_books_category ON books(category);
            CREATE INDEX idx_books_rating ON books(average_rating);
            CREATE INDEX idx_books_submitter ON books(submitted_by);

            CREATE TABLE songs (
                id               TEXT PRIMARY KEY,
                title            TEXT NOT NULL,
                singer           TEXT NOT NULL,
                lyrics           TEXT NOT NULL,
                audio_url        TEXT NOT NULL DEFAULT '',
                submitted_by     TEXT REFERENCES users(id) ON DELETE SET NULL,
                status           TEXT NOT NULL DEFAULT 'pending',
                is_verified      INTEGER NOT NULL DEFAULT 0,
                verified_by      TEXT,
                verified_at      TEXT,
                rejection_reason TEXT,
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL
            );

            CREATE INDEX idx_songs_verified ON songs(is_verified, created_at);
            CREATE INDEX idx_songs_status ON songs(status);

            CREATE TABLE favorite_books (
                user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                book_id    TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, book_id)
            );

            CREATE TABLE favorite_songs (
                user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                song_id    TEXT NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, song_id)
            );

            CREATE TABLE notifications (
                id         TEXT PRIMARY KEY,
                title      TEXT NOT NULL,
                message    TEXT NOT NULL,
                user_id    TEXT REFERENCES users(id) ON DELETE CASCADE,
                is_read    INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_user ON notifications(user_id, created_at);

            CREATE TABLE reports (
                id             TEXT PRIMARY KEY,
                kind           TEXT NOT NULL,
                title          TEXT NOT NULL,
                description    TEXT NOT NULL,
                screenshot_url TEXT NOT NULL,
                reporter_id    TEXT NOT NULL REFERENCES users(id),
                reporter_name  TEXT NOT NULL,
                status         TEXT NOT NULL DEFAULT 'pending',
                created_at     TEXT NOT NULL,
                updated_at     TEXT NOT NULL
            );

            CREATE INDEX idx_reports_created ON reports(created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
