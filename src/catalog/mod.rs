//! Transactional picture catalog over SQLite.
//!
//! The store enforces the two uniqueness invariants the importer relies
//! on: at most one record per content fingerprint and at most one per
//! destination path. Both checks and the insert run inside one exclusive
//! transaction, so concurrent workers serialize through the catalog.

mod picture;

pub use picture::Picture;

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

/// Catalog failure taxonomy. The import pipeline matches on the first
/// three; everything else is a storage fault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("picture already exists")]
    PictureAlreadyExists,
    #[error("picture not found")]
    PictureNotFound,
    #[error("path already exists")]
    PathAlreadyExists,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Hex digest columns collate NOCASE so fingerprint uniqueness is
/// case-insensitive at the store level too.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pictures (
    sum_md5    TEXT COLLATE NOCASE NOT NULL,
    sum_sha256 TEXT COLLATE NOCASE NOT NULL,
    size       INTEGER NOT NULL,
    path       TEXT NOT NULL,
    taken_at   TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (sum_md5, sum_sha256, size)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_pictures_path ON pictures(path);
"#;

/// Tuning applied after WAL is enabled.
const PRAGMAS: &str = r#"
PRAGMA busy_timeout = 60000;
PRAGMA synchronous = NORMAL;
"#;

/// Durable key/value store of [`Picture`] records. Writers take exclusive
/// transactions through the outer mutex; readers observe committed state.
pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    /// Open or create the catalog at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// In-memory catalog with the same schema (tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a new picture. Fails with [`Error::PictureAlreadyExists`]
    /// when the fingerprint is already catalogued and
    /// [`Error::PathAlreadyExists`] when the path is taken; either check
    /// and the insert commit atomically.
    pub fn new_picture(&self, pic: &Picture) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Exclusive)?;

        if fingerprint_row(&tx, pic)?.is_some() {
            return Err(Error::PictureAlreadyExists);
        }
        if path_row(&tx, &pic.path)?.is_some() {
            return Err(Error::PathAlreadyExists);
        }

        tx.execute(
            "INSERT INTO pictures
                 (sum_md5, sum_sha256, size, path, taken_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                pic.sum_md5,
                pic.sum_sha256,
                pic.size as i64,
                pic.path,
                pic.taken_at,
                Utc::now(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Look up a picture by its catalog path.
    pub fn get_picture(&self, path: &str) -> Result<Picture> {
        let conn = self.conn.lock().unwrap();
        path_row(&conn, path)?.ok_or(Error::PictureNotFound)
    }

    /// Hard-delete the record at `path` and return it.
    pub fn delete_picture(&self, path: &str) -> Result<Picture> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Exclusive)?;

        let pic = path_row(&tx, path)?.ok_or(Error::PictureNotFound)?;
        tx.execute("DELETE FROM pictures WHERE path = ?1", params![path])?;
        tx.commit()?;
        Ok(pic)
    }

    /// Update the record owning `pic`'s fingerprint. A path change is
    /// refused when a *different* picture already owns the target path.
    pub fn update_picture(&self, pic: &Picture) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Exclusive)?;

        if fingerprint_row(&tx, pic)?.is_none() {
            return Err(Error::PictureNotFound);
        }
        if let Some(owner) = path_row(&tx, &pic.path)? {
            if !owner.is_same(pic) {
                return Err(Error::PathAlreadyExists);
            }
        }

        tx.execute(
            "UPDATE pictures SET path = ?1, taken_at = ?2, updated_at = ?3
             WHERE sum_md5 = ?4 AND sum_sha256 = ?5 AND size = ?6",
            params![
                pic.path,
                pic.taken_at,
                Utc::now(),
                pic.sum_md5,
                pic.sum_sha256,
                pic.size as i64,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Number of catalogued pictures.
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM pictures", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

fn fingerprint_row(conn: &Connection, pic: &Picture) -> Result<Option<Picture>> {
    conn.query_row(
        "SELECT sum_md5, sum_sha256, size, path, taken_at FROM pictures
         WHERE sum_md5 = ?1 AND sum_sha256 = ?2 AND size = ?3",
        params![pic.sum_md5, pic.sum_sha256, pic.size as i64],
        row_to_picture,
    )
    .optional()
    .map_err(Error::from)
}

fn path_row(conn: &Connection, path: &str) -> Result<Option<Picture>> {
    conn.query_row(
        "SELECT sum_md5, sum_sha256, size, path, taken_at FROM pictures
         WHERE path = ?1",
        params![path],
        row_to_picture,
    )
    .optional()
    .map_err(Error::from)
}

fn row_to_picture(row: &rusqlite::Row<'_>) -> rusqlite::Result<Picture> {
    Ok(Picture {
        sum_md5: row.get(0)?,
        sum_sha256: row.get(1)?,
        size: row.get::<_, i64>(2)? as u64,
        path: row.get(3)?,
        taken_at: row.get(4)?,
    })
}
