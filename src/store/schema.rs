//! Schema creation and pragma setup for the index store.

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i32 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS objects (
            key            TEXT NOT NULL PRIMARY KEY,
            size            INTEGER NOT NULL,
            etag            TEXT NOT NULL,
            is_multipart    INTEGER NOT NULL,
            sha256          TEXT,
            last_modified   TEXT NOT NULL,
            scanned_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_objects_size ON objects(size);
        CREATE INDEX IF NOT EXISTS idx_objects_etag ON objects(etag);
        CREATE INDEX IF NOT EXISTS idx_objects_sha256 ON objects(sha256);

        -- key references objects(key) by convention only; cascading on
        -- delete is handled explicitly in queries::delete_objects.
        CREATE TABLE IF NOT EXISTS media_metadata (
            key         TEXT NOT NULL PRIMARY KEY,
            artist      TEXT,
            album       TEXT,
            title       TEXT,
            duration_s  REAL,
            codec       TEXT,
            bitrate     INTEGER
        );

        CREATE TABLE IF NOT EXISTS bucket_config (
            bucket          TEXT NOT NULL PRIMARY KEY,
            endpoint_url    TEXT,
            updated_at      TEXT NOT NULL
        );
        "#,
    )?;

    let current: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if current < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(())
}
