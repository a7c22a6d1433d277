use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::timestamp::now_utc_rfc3339;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportStatus {
    pub source_type: String,
    pub source_ref: String,
    pub status: String,
    pub processed_count: u64,
    pub imported_count: u64,
    pub skipped_count: u64,
    pub error_count: u64,
    pub checkpoint: Option<String>,
    pub last_error: Option<String>,
    pub last_run_at: String,
}

/// Counters for one import or sync run.
#[derive(Debug, Clone, Default)]
pub struct ImportRun {
    pub processed_count: u64,
    pub imported_count: u64,
    pub skipped_count: u64,
    pub error_count: u64,
    pub checkpoint: Option<String>,
    pub last_error: Option<String>,
}

impl ImportRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, dry_run: bool) -> &'static str {
        if dry_run {
            "dry_run"
        } else if self.error_count > 0 {
            "partial"
        } else {
            "completed"
        }
    }
}

pub fn source_key(source_type: &str, user_id: i64, source_ref: &str) -> String {
    format!("{}:{}:{}", source_type, user_id, source_ref)
}

/// Upserts the run row for `source_key` and returns its `last_run_at`.
pub fn record_run(
    conn: &Connection,
    source_key: &str,
    user_id: i64,
    source_type: &str,
    source_ref: &str,
    status: &str,
    run: &ImportRun,
) -> rusqlite::Result<String> {
    let last_run_at = now_utc_rfc3339();
    conn.execute(
        r#"
INSERT INTO import_state (
    source_key, user_id, source_type, source_ref, last_run_at, last_status,
    processed_count, imported_count, skipped_count, error_count, checkpoint, last_error
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
ON CONFLICT(source_key) DO UPDATE SET
    source_type = excluded.source_type,
    source_ref = excluded.source_ref,
    last_run_at = excluded.last_run_at,
    last_status = excluded.last_status,
    processed_count = excluded.processed_count,
    imported_count = excluded.imported_count,
    skipped_count = excluded.skipped_count,
    error_count = excluded.error_count,
    checkpoint = excluded.checkpoint,
    last_error = excluded.last_error
"#,
        params![
            source_key,
            user_id,
            source_type,
            source_ref,
            last_run_at,
            status,
            run.processed_count as i64,
            run.imported_count as i64,
            run.skipped_count as i64,
            run.error_count as i64,
            run.checkpoint,
            run.last_error
        ],
    )?;
    Ok(last_run_at)
}

pub fn list_statuses(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<ImportStatus>> {
    let mut stmt = conn.prepare(
        r#"
SELECT source_type, source_ref, last_status, processed_count, imported_count,
       skipped_count, error_count, checkpoint, last_error, last_run_at
FROM import_state
WHERE user_id = ?1
ORDER BY last_run_at DESC, source_type ASC
"#,
    )?;
    let mut rows = stmt.query(params![user_id])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(ImportStatus {
            source_type: row.get(0)?,
            source_ref: row.get(1)?,
            status: row.get(2)?,
            processed_count: row.get::<_, i64>(3)? as u64,
            imported_count: row.get::<_, i64>(4)? as u64,
            skipped_count: row.get::<_, i64>(5)? as u64,
            error_count: row.get::<_, i64>(6)? as u64,
            checkpoint: row.get(7)?,
            last_error: row.get(8)?,
            last_run_at: row.get(9)?,
        });
    }
    Ok(out)
}

/// The record id stored with a fingerprint, if the record was imported before.
pub fn fingerprint_record(conn: &Connection, token: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT record_id FROM import_fingerprints WHERE fingerprint = ?1",
        params![token],
        |row| row.get(0),
    )
    .optional()
}

pub fn insert_fingerprint(
    conn: &Connection,
    token: &str,
    source_key: &str,
    record_id: &str,
    action: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        concat!(
            "INSERT INTO import_fingerprints ",
            "(fingerprint, source_key, record_id, action, created_at) ",
            "VALUES (?1, ?2, ?3, ?4, ?5)"
        ),
        params![token, source_key, record_id, action, now_utc_rfc3339()],
    )?;
    Ok(())
}

pub fn fingerprint(source_key: &str, identity: &str, action: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_key.as_bytes());
    hasher.update(b"|");
    hasher.update(identity.as_bytes());
    hasher.update(b"|");
    hasher.update(action.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
