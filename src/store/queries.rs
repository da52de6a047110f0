//! The three-pass duplicate queries and bookkeeping operations.
//!
//! Query shapes mirror the reference index: group by size, narrow to
//! ETag within a size class, then fall back to SHA-256 for multipart
//! members a size/ETag pass couldn't resolve.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::types::{DuplicateGroup, IndexStats, ObjectRecord};

pub fn upsert_objects(conn: &Connection, objects: &[ObjectRecord]) -> Result<u64> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            r#"
            INSERT INTO objects (key, size, etag, is_multipart, sha256, last_modified, scanned_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (key) DO UPDATE SET
                size = excluded.size,
                etag = excluded.etag,
                is_multipart = excluded.is_multipart,
                sha256 = excluded.sha256,
                last_modified = excluded.last_modified,
                scanned_at = excluded.scanned_at
            "#,
        )?;
        for obj in objects {
            stmt.execute(params![
                obj.key,
                obj.size as i64,
                obj.etag,
                obj.is_multipart,
                obj.sha256,
                obj.last_modified.to_rfc3339(),
                obj.scanned_at.to_rfc3339(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(objects.len() as u64)
}

/// Deletes objects by key, cascading the `media_metadata` row first —
/// the foreign key exists for documentation, not enforcement.
pub fn delete_objects(conn: &Connection, keys: &[String]) -> Result<u64> {
    if keys.is_empty() {
        return Ok(0);
    }
    let tx = conn.unchecked_transaction()?;
    {
        let mut delete_media = tx.prepare_cached("DELETE FROM media_metadata WHERE key = ?1")?;
        let mut delete_object = tx.prepare_cached("DELETE FROM objects WHERE key = ?1")?;
        for key in keys {
            delete_media.execute(params![key])?;
            delete_object.execute(params![key])?;
        }
    }
    tx.commit()?;
    Ok(keys.len() as u64)
}

pub fn keys_with_prefix(conn: &Connection, prefix: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT key FROM objects WHERE key LIKE ?1 ESCAPE '\\'")?;
    let like_pattern = format!("{}%", escape_like(prefix));
    let rows = stmt
        .query_map(params![like_pattern], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Key → ETag for every indexed object under `prefix` — the scanner's
/// working set for deciding new/updated/unchanged per listed entry.
pub fn etags_with_prefix(conn: &Connection, prefix: &str) -> Result<HashMap<String, String>> {
    let mut stmt = conn.prepare("SELECT key, etag FROM objects WHERE key LIKE ?1 ESCAPE '\\'")?;
    let like_pattern = format!("{}%", escape_like(prefix));
    let rows = stmt
        .query_map(params![like_pattern], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows.into_iter().collect())
}

fn escape_like(input: &str) -> String {
    input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub fn update_sha256(conn: &Connection, key: &str, sha256: &str) -> Result<()> {
    conn.execute(
        "UPDATE objects SET sha256 = ?1 WHERE key = ?2",
        params![sha256, key],
    )?;
    Ok(())
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ObjectRecord> {
    let last_modified: String = row.get(5)?;
    let scanned_at: String = row.get(6)?;
    Ok(ObjectRecord {
        key: row.get(0)?,
        size: row.get::<_, i64>(1)? as u64,
        etag: row.get(2)?,
        is_multipart: row.get(3)?,
        sha256: row.get(4)?,
        last_modified: parse_ts(&last_modified),
        scanned_at: parse_ts(&scanned_at),
    })
}

fn parse_ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

const RECORD_COLUMNS: &str = "key, size, etag, is_multipart, sha256, last_modified, scanned_at";

/// Pass 1: every object whose size is shared by at least one other object.
pub fn find_size_duplicates(conn: &Connection) -> Result<Vec<Vec<ObjectRecord>>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM objects \
         WHERE size IN (SELECT size FROM objects GROUP BY size HAVING count(*) > 1) \
         ORDER BY size, key"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(group_by(rows, |r| r.size.to_string()))
}

/// Pass 2: within a size class, group by ETag (excludes multipart ETags
/// from being trusted as content fingerprints at the caller level).
pub fn find_etag_duplicates(conn: &Connection) -> Result<Vec<DuplicateGroup>> {
    let sql = format!(
        r#"
        WITH size_dups AS (
            SELECT size FROM objects GROUP BY size HAVING count(*) > 1
        )
        SELECT o.{cols}
        FROM objects o
        JOIN size_dups s ON o.size = s.size
        WHERE o.etag IN (
            SELECT etag FROM objects o2
            JOIN size_dups s2 ON o2.size = s2.size
            GROUP BY etag HAVING count(*) > 1
        )
        ORDER BY o.etag, o.key
        "#,
        cols = RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(group_by(rows, |r| r.etag.clone())
        .into_iter()
        .map(|objects| DuplicateGroup {
            fingerprint: objects[0].etag.clone(),
            size: objects[0].size,
            objects,
        })
        .collect())
}

/// Size classes containing un-hashed multipart members — Pass 3 input.
pub fn find_multipart_candidates(conn: &Connection) -> Result<Vec<Vec<ObjectRecord>>> {
    let sql = format!(
        r#"
        WITH candidates AS (
            SELECT size FROM objects
            WHERE is_multipart = 1 AND sha256 IS NULL
            GROUP BY size
            HAVING size IN (
                SELECT size FROM objects GROUP BY size HAVING count(*) > 1
            )
        )
        SELECT o.{cols}
        FROM objects o
        JOIN candidates c ON o.size = c.size
        ORDER BY o.size, o.key
        "#,
        cols = RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(group_by(rows, |r| r.size.to_string()))
}

/// Pass 3: duplicates by SHA-256, for objects a hash pass has populated.
pub fn find_hash_duplicates(conn: &Connection) -> Result<Vec<DuplicateGroup>> {
    let sql = format!(
        r#"
        SELECT {cols} FROM objects
        WHERE sha256 IN (
            SELECT sha256 FROM objects WHERE sha256 IS NOT NULL GROUP BY sha256 HAVING count(*) > 1
        )
        ORDER BY sha256, key
        "#,
        cols = RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(group_by(rows, |r| r.sha256.clone().unwrap_or_default())
        .into_iter()
        .map(|objects| DuplicateGroup {
            fingerprint: objects[0].sha256.clone().unwrap_or_default(),
            size: objects[0].size,
            objects,
        })
        .collect())
}

/// All trusted-fingerprint duplicate groups: non-multipart ETag groups
/// plus SHA-256 groups, per the three-pass resolution order.
pub fn get_all_duplicates(conn: &Connection) -> Result<Vec<DuplicateGroup>> {
    let etag_groups = find_etag_duplicates(conn)?
        .into_iter()
        .filter(|g| !g.objects.iter().any(|o| o.is_multipart));
    let hash_groups = find_hash_duplicates(conn)?;
    Ok(etag_groups.chain(hash_groups).collect())
}

pub fn get_stats(conn: &Connection) -> Result<IndexStats> {
    let (total_objects, total_size): (i64, i64) = conn.query_row(
        "SELECT count(*), coalesce(sum(size), 0) FROM objects",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let groups = get_all_duplicates(conn)?;
    let duplicate_objects: u64 = groups.iter().map(|g| g.objects.len() as u64 - 1).sum();
    let wasted_bytes: u64 = groups.iter().map(DuplicateGroup::wasted_bytes).sum();

    Ok(IndexStats {
        total_objects: total_objects as u64,
        total_size: total_size as u64,
        duplicate_groups: groups.len() as u64,
        duplicate_objects,
        wasted_bytes,
    })
}

pub fn all_objects(conn: &Connection) -> Result<Vec<ObjectRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM objects ORDER BY key");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn all_media_metadata(conn: &Connection) -> Result<Vec<crate::types::MediaMetadata>> {
    let mut stmt = conn.prepare(
        "SELECT key, artist, album, title, duration_s, codec, bitrate FROM media_metadata",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(crate::types::MediaMetadata {
                key: row.get(0)?,
                artist: row.get(1)?,
                album: row.get(2)?,
                title: row.get(3)?,
                duration_s: row.get(4)?,
                codec: row.get(5)?,
                bitrate: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn upsert_bucket_config(conn: &Connection, bucket: &str, endpoint_url: Option<&str>) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO bucket_config (bucket, endpoint_url, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (bucket) DO UPDATE SET
            endpoint_url = excluded.endpoint_url,
            updated_at = excluded.updated_at
        "#,
        params![bucket, endpoint_url, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn get_bucket_endpoint(conn: &Connection, bucket: &str) -> Result<Option<String>> {
    let endpoint = conn
        .query_row(
            "SELECT endpoint_url FROM bucket_config WHERE bucket = ?1",
            params![bucket],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten();
    Ok(endpoint)
}

pub fn upsert_media_metadata(conn: &Connection, meta: &crate::types::MediaMetadata) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO media_metadata (key, artist, album, title, duration_s, codec, bitrate)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (key) DO UPDATE SET
            artist = excluded.artist,
            album = excluded.album,
            title = excluded.title,
            duration_s = excluded.duration_s,
            codec = excluded.codec,
            bitrate = excluded.bitrate
        "#,
        params![
            meta.key,
            meta.artist,
            meta.album,
            meta.title,
            meta.duration_s,
            meta.codec,
            meta.bitrate,
        ],
    )?;
    Ok(())
}

/// Groups rows by a derived key, discarding singleton groups — matches
/// the resolver's contract that every returned group has 2+ members.
fn group_by<F>(rows: Vec<ObjectRecord>, key_fn: F) -> Vec<Vec<ObjectRecord>>
where
    F: Fn(&ObjectRecord) -> String,
{
    let mut groups: HashMap<String, Vec<ObjectRecord>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for row in rows {
        let key = key_fn(&row);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(row);
    }
    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .filter(|g| g.len() > 1)
        .collect()
}
