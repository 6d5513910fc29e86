use anyhow::Result;
use rusqlite::{Connection, Row, params, params_from_iter, types::Value};
use uuid::Uuid;

use lectern_types::DomainError;
use lectern_types::book::{Book, BookDetails, Category, StoredBook};
use lectern_types::models::{Song, SongDetails};
use lectern_types::moderation::{Moderation, ModerationStatus};

use crate::models::{OptionalExt, count_col, enum_col, json_col, like_pattern, opt_uuid_col, uuid_col};
use crate::{Database, DbError};

const BOOK_COLUMNS: &str = "id, title, author, description, category, tags, language, page_count, isbn, \
     units_available, image_url, submitted_by, status, verified_by, verified_at, rejection_reason, \
     reviews, view_count, download_count, created_at, updated_at";

const SONG_COLUMNS: &str = "id, title, singer, lyrics, audio_url, submitted_by, status, verified_by, \
     verified_at, rejection_reason, created_at, updated_at";

/// Public listing filter. `search` matches any whitespace-separated term.
#[derive(Debug, Default, Clone)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Copy)]
pub enum Counter {
    Views,
    Downloads,
}

impl Database {
    // -- Books --

    pub fn insert_book(&self, book: &Book) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO books ({}, is_verified, average_rating, total_reviews)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                             ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
                    BOOK_COLUMNS
                ),
                params![
                    book.id.to_string(),
                    book.details.title,
                    book.details.author,
                    book.details.description,
                    book.details.category.as_str(),
                    serde_json::to_string(&book.details.tags)?,
                    book.details.language,
                    book.details.page_count,
                    book.details.isbn,
                    book.details.units_available,
                    book.details.image_url,
                    book.submitted_by.map(|id| id.to_string()),
                    book.moderation().status().as_str(),
                    book.moderation().verified_by().map(|id| id.to_string()),
                    book.moderation().verified_at(),
                    book.moderation().rejection_reason(),
                    serde_json::to_string(book.reviews())?,
                    book.view_count as i64,
                    book.download_count as i64,
                    book.created_at,
                    book.updated_at,
                    book.moderation().is_verified(),
                    book.average_rating(),
                    book.total_reviews(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_book(&self, id: Uuid) -> Result<Option<Book>> {
        self.with_conn(|conn| query_book(conn, id))
    }

    /// Verified books, newest first.
    pub fn list_books(&self, query: &CatalogQuery) -> Result<Vec<Book>> {
        let mut sql = format!("SELECT {} FROM books WHERE is_verified = 1", BOOK_COLUMNS);
        let mut args: Vec<Value> = Vec::new();

        if let Some(category) = query.category {
            args.push(Value::Text(category.as_str().to_string()));
            sql.push_str(&format!(" AND category = ?{}", args.len()));
        }
        push_search(&mut sql, &mut args, query.search.as_deref(), &["title", "author", "description"]);
        sql.push_str(" ORDER BY created_at DESC");

        self.with_conn(|conn| collect_books(conn, &sql, args))
    }

    pub fn pending_books(&self) -> Result<Vec<Book>> {
        self.with_conn(|conn| {
            collect_books(
                conn,
                &format!(
                    "SELECT {} FROM books WHERE status = 'pending' ORDER BY created_at DESC",
                    BOOK_COLUMNS
                ),
                Vec::new(),
            )
        })
    }

    /// Approved books among the user's favorites, in the order they were favorited.
    pub fn favorite_books(&self, user_id: Uuid) -> Result<Vec<Book>> {
        self.with_conn(|conn| {
            collect_books(
                conn,
                &format!(
                    "SELECT {} FROM books b JOIN favorite_books f ON f.book_id = b.id
                     WHERE f.user_id = ?1 AND b.status = 'approved'
                     ORDER BY f.created_at, f.rowid",
                    prefixed(BOOK_COLUMNS, "b")
                ),
                vec![Value::Text(user_id.to_string())],
            )
        })
    }

    /// Load, mutate and write back one book under the writer lock.
    /// `f` is where review and moderation rules run; if it fails nothing is written.
    pub fn update_book<F, T>(&self, id: Uuid, f: F) -> Result<(Book, T)>
    where
        F: FnOnce(&mut Book) -> std::result::Result<T, DomainError>,
    {
        self.with_conn_mut(|conn| {
            let mut book = query_book(conn, id)?.ok_or(DbError::NotFound("Book"))?;
            let out = f(&mut book)?;
            write_book(conn, &book)?;
            Ok((book, out))
        })
    }

    pub fn increment_book_counter(&self, id: Uuid, counter: Counter) -> Result<Book> {
        let column = match counter {
            Counter::Views => "view_count",
            Counter::Downloads => "download_count",
        };
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                &format!("UPDATE books SET {0} = {0} + 1 WHERE id = ?1", column),
                [id.to_string()],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("Book").into());
            }
            query_book(conn, id)?.ok_or_else(|| DbError::NotFound("Book").into())
        })
    }

    // -- Songs --

    pub fn insert_song(&self, song: &Song) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO songs ({}, is_verified)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    SONG_COLUMNS
                ),
                params![
                    song.id.to_string(),
                    song.details.title,
                    song.details.singer,
                    song.details.lyrics,
                    song.details.audio_url,
                    song.submitted_by.map(|id| id.to_string()),
                    song.moderation().status().as_str(),
                    song.moderation().verified_by().map(|id| id.to_string()),
                    song.moderation().verified_at(),
                    song.moderation().rejection_reason(),
                    song.created_at,
                    song.updated_at,
                    song.moderation().is_verified(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_song(&self, id: Uuid) -> Result<Option<Song>> {
        self.with_conn(|conn| query_song(conn, id))
    }

    pub fn list_songs(&self, search: Option<&str>) -> Result<Vec<Song>> {
        let mut sql = format!("SELECT {} FROM songs WHERE is_verified = 1", SONG_COLUMNS);
        let mut args: Vec<Value> = Vec::new();
        push_search(&mut sql, &mut args, search, &["title", "singer", "lyrics"]);
        sql.push_str(" ORDER BY created_at DESC");

        self.with_conn(|conn| collect_songs(conn, &sql, args))
    }

    pub fn pending_songs(&self) -> Result<Vec<Song>> {
        self.with_conn(|conn| {
            collect_songs(
                conn,
                &format!(
                    "SELECT {} FROM songs WHERE status = 'pending' ORDER BY created_at DESC",
                    SONG_COLUMNS
                ),
                Vec::new(),
            )
        })
    }

    pub fn favorite_songs(&self, user_id: Uuid) -> Result<Vec<Song>> {
        self.with_conn(|conn| {
            collect_songs(
                conn,
                &format!(
                    "SELECT {} FROM songs s JOIN favorite_songs f ON f.song_id = s.id
                     WHERE f.user_id = ?1 AND s.is_verified = 1
                     ORDER BY f.created_at, f.rowid",
                    prefixed(SONG_COLUMNS, "s")
                ),
                vec![Value::Text(user_id.to_string())],
            )
        })
    }

    pub fn update_song<F, T>(&self, id: Uuid, f: F) -> Result<(Song, T)>
    where
        F: FnOnce(&mut Song) -> std::result::Result<T, DomainError>,
    {
        self.with_conn_mut(|conn| {
            let mut song = query_song(conn, id)?.ok_or(DbError::NotFound("Song"))?;
            let out = f(&mut song)?;
            write_song(conn, &song)?;
            Ok((song, out))
        })
    }
}

/// Qualify every column in a column list with a table alias.
fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_search(sql: &mut String, args: &mut Vec<Value>, search: Option<&str>, columns: &[&str]) {
    let terms: Vec<&str> = search.map(|s| s.split_whitespace().collect()).unwrap_or_default();
    if terms.is_empty() {
        return;
    }

    let mut clauses = Vec::with_capacity(terms.len());
    for term in terms {
        args.push(Value::Text(like_pattern(term)));
        let n = args.len();
        let per_column: Vec<String> = columns
            .iter()
            .map(|c| format!("{} LIKE ?{} ESCAPE '\\'", c, n))
            .collect();
        clauses.push(format!("({})", per_column.join(" OR ")));
    }
    sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
}

fn moderation_from_row(row: &Row<'_>, status: usize) -> rusqlite::Result<Moderation> {
    let parsed: ModerationStatus = enum_col(row, status)?;
    Moderation::restore(
        parsed,
        opt_uuid_col(row, status + 1)?,
        row.get(status + 2)?,
        row.get(status + 3)?,
    )
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(status, rusqlite::types::Type::Text, Box::new(e)))
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let stored = StoredBook {
        id: uuid_col(row, 0)?,
        details: BookDetails {
            title: row.get(1)?,
            author: row.get(2)?,
            description: row.get(3)?,
            category: enum_col(row, 4)?,
            tags: json_col(row, 5)?,
            language: row.get(6)?,
            page_count: row.get(7)?,
            isbn: row.get(8)?,
            units_available: row.get(9)?,
            image_url: row.get(10)?,
        },
        submitted_by: opt_uuid_col(row, 11)?,
        moderation: moderation_from_row(row, 12)?,
        reviews: json_col(row, 16)?,
        view_count: count_col(row, 17)?,
        download_count: count_col(row, 18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    };
    Ok(Book::from(stored))
}

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song::restore(
        uuid_col(row, 0)?,
        SongDetails {
            title: row.get(1)?,
            singer: row.get(2)?,
            lyrics: row.get(3)?,
            audio_url: row.get(4)?,
        },
        opt_uuid_col(row, 5)?,
        moderation_from_row(row, 6)?,
        row.get(10)?,
        row.get(11)?,
    ))
}

fn query_book(conn: &Connection, id: Uuid) -> Result<Option<Book>> {
    conn.query_row(
        &format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS),
        [id.to_string()],
        book_from_row,
    )
    .optional()
}

fn query_song(conn: &Connection, id: Uuid) -> Result<Option<Song>> {
    conn.query_row(
        &format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS),
        [id.to_string()],
        song_from_row,
    )
    .optional()
}

fn collect_books(conn: &Connection, sql: &str, args: Vec<Value>) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(args), book_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn collect_songs(conn: &Connection, sql: &str, args: Vec<Value>) -> Result<Vec<Song>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(args), song_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Whole-document write: last writer wins for the editable fields, and the
/// review list is always stored next to the aggregate derived from it.
fn write_book(conn: &Connection, book: &Book) -> Result<()> {
    let m = book.moderation();
    conn.execute(
        "UPDATE books SET
            title = ?1, author = ?2, description = ?3, category = ?4, tags = ?5, language = ?6,
            page_count = ?7, isbn = ?8, units_available = ?9, image_url = ?10,
            status = ?11, is_verified = ?12, verified_by = ?13, verified_at = ?14,
            rejection_reason = ?15, reviews = ?16, average_rating = ?17, total_reviews = ?18,
            updated_at = ?19
         WHERE id = ?20",
        params![
            book.details.title,
            book.details.author,
            book.details.description,
            book.details.category.as_str(),
            serde_json::to_string(&book.details.tags)?,
            book.details.language,
            book.details.page_count,
            book.details.isbn,
            book.details.units_available,
            book.details.image_url,
            m.status().as_str(),
            m.is_verified(),
            m.verified_by().map(|id| id.to_string()),
            m.verified_at(),
            m.rejection_reason(),
            serde_json::to_string(book.reviews())?,
            book.average_rating(),
            book.total_reviews(),
            book.updated_at,
            book.id.to_string(),
        ],
    )?;
    Ok(())
}

fn write_song(conn: &Connection, song: &Song) -> Result<()> {
    let m = song.moderation();
    conn.execute(
        "UPDATE songs SET
            title = ?1, singer = ?2, lyrics = ?3, audio_url = ?4,
            status = ?5, is_verified = ?6, verified_by = ?7, verified_at = ?8,
            rejection_reason = ?9, updated_at = ?10
         WHERE id = ?11",
        params![
            song.details.title,
            song.details.singer,
            song.details.lyrics,
            song.details.audio_url,
            m.status().as_str(),
            m.is_verified(),
            m.verified_by().map(|id| id.to_string()),
            m.verified_at(),
            m.rejection_reason(),
            song.updated_at,
            song.id.to_string(),
        ],
    )?;
    Ok(())
}
