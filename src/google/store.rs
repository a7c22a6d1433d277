use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use crate::domain::timestamp::now_utc_rfc3339;

pub const GMAIL_MESSAGE_KIND: &str = "gmail_message";
pub const CALENDAR_EVENT_KIND: &str = "calendar_event";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoogleCredential {
    pub user_id: i64,
    pub account_email: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub expires_at: Option<String>,
    pub updated_at: String,
}

impl GoogleCredential {
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }
}

fn credential_from_row(row: &Row<'_>) -> Result<GoogleCredential> {
    Ok(GoogleCredential {
        user_id: row.get(0)?,
        account_email: row.get(1)?,
        access_token: row.get(2)?,
        refresh_token: row.get(3)?,
        expires_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const CREDENTIAL_SELECT: &str = r#"
SELECT user_id, account_email, access_token, refresh_token, expires_at, updated_at
FROM google_credentials
"#;

pub fn store_credentials(
    conn: &Connection,
    user_id: i64,
    account_email: &str,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: Option<&str>,
) -> Result<GoogleCredential> {
    conn.execute(
        r#"
INSERT INTO google_credentials (
    user_id, account_email, access_token, refresh_token, expires_at, updated_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(user_id) DO UPDATE SET
    account_email = excluded.account_email,
    access_token = excluded.access_token,
    refresh_token = COALESCE(excluded.refresh_token, google_credentials.refresh_token),
    expires_at = excluded.expires_at,
    updated_at = excluded.updated_at
"#,
        params![
            user_id,
            account_email,
            access_token,
            refresh_token,
            expires_at,
            now_utc_rfc3339()
        ],
    )?;
    let sql = format!("{CREDENTIAL_SELECT} WHERE user_id = ?1");
    conn.query_row(&sql, params![user_id], credential_from_row)
}

pub fn get_credentials(conn: &Connection, user_id: i64) -> Result<Option<GoogleCredential>> {
    let sql = format!("{CREDENTIAL_SELECT} WHERE user_id = ?1");
    conn.query_row(&sql, params![user_id], credential_from_row)
        .optional()
}

pub fn list_credentials(conn: &Connection) -> Result<Vec<GoogleCredential>> {
    let sql = format!("{CREDENTIAL_SELECT} ORDER BY user_id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], credential_from_row)?;
    rows.collect()
}

pub fn update_access_token(
    conn: &Connection,
    user_id: i64,
    access_token: &str,
    expires_at: Option<&str>,
) -> Result<()> {
    conn.execute(
        r#"
UPDATE google_credentials
SET access_token = ?2, expires_at = ?3, updated_at = ?4
WHERE user_id = ?1
"#,
        params![user_id, access_token, expires_at, now_utc_rfc3339()],
    )?;
    Ok(())
}

pub fn cached_payload(
    conn: &Connection,
    user_id: i64,
    kind: &str,
    external_id: &str,
) -> Result<Option<String>> {
    conn.query_row(
        r#"
SELECT payload_json FROM google_payloads
WHERE user_id = ?1 AND kind = ?2 AND external_id = ?3
"#,
        params![user_id, kind, external_id],
        |row| row.get(0),
    )
    .optional()
}

/// Replaces any earlier copy; calendar events change after they are first fetched.
pub fn cache_payload(
    conn: &Connection,
    user_id: i64,
    kind: &str,
    external_id: &str,
    payload_json: &str,
) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO google_payloads (user_id, kind, external_id, payload_json, fetched_at)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(user_id, kind, external_id) DO UPDATE SET
    payload_json = excluded.payload_json,
    fetched_at = excluded.fetched_at
"#,
        params![user_id, kind, external_id, payload_json, now_utc_rfc3339()],
    )?;
    Ok(())
}
