use rusqlite::{params, Connection, OptionalExtension, Result, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionRecord {
    pub id: i64,
    pub user_id: i64,
    pub type_key: Option<String>,
    pub title: String,
    pub description: String,
    pub was_at: String,
    pub created_at: String,
}

pub struct InsertInteraction<'a> {
    pub user_id: i64,
    pub type_key: Option<&'a str>,
    pub title: &'a str,
    pub description: &'a str,
    pub was_at: &'a str,
    pub created_at: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionTypeRecord {
    pub id: i64,
    pub key: String,
    pub label: String,
}

const INTERACTION_SELECT: &str = r#"
SELECT i.id, i.user_id, t.key, i.title, i.description, i.was_at, i.created_at
FROM interactions i
LEFT JOIN interaction_types t ON t.id = i.type_id
"#;

fn interaction_from_row(row: &Row<'_>) -> Result<InteractionRecord> {
    Ok(InteractionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        type_key: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        was_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_interaction(conn: &Connection, args: &InsertInteraction<'_>) -> Result<i64> {
    conn.execute(
        r#"
INSERT INTO interactions (user_id, type_id, title, description, was_at, created_at)
VALUES (?1, (SELECT id FROM interaction_types WHERE key = ?2), ?3, ?4, ?5, ?6)
"#,
        params![
            args.user_id,
            args.type_key,
            args.title,
            args.description,
            args.was_at,
            args.created_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns true when the link did not exist before.
pub fn link_contact(conn: &Connection, interaction_id: i64, contact_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO interaction_contacts (interaction_id, contact_id) VALUES (?1, ?2)",
        params![interaction_id, contact_id],
    )?;
    Ok(changed > 0)
}

pub fn get_interaction(conn: &Connection, user_id: i64, id: i64) -> Result<Option<InteractionRecord>> {
    let sql = format!("{INTERACTION_SELECT} WHERE i.user_id = ?1 AND i.id = ?2");
    conn.query_row(&sql, params![user_id, id], interaction_from_row)
        .optional()
}

pub fn list_contact_interactions(conn: &Connection, contact_id: i64) -> Result<Vec<InteractionRecord>> {
    let sql = format!(
        "{INTERACTION_SELECT} JOIN interaction_contacts ic ON ic.interaction_id = i.id \
         WHERE ic.contact_id = ?1 ORDER BY i.was_at DESC, i.id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![contact_id], interaction_from_row)?;
    rows.collect()
}

/// Past interactions of the user that involve at least one contact with a frequency.
pub fn list_past_interactions_of_selected(
    conn: &Connection,
    user_id: i64,
    now: &str,
) -> Result<Vec<InteractionRecord>> {
    let sql = format!(
        "{INTERACTION_SELECT} WHERE i.user_id = ?1 AND i.was_at < ?2 AND EXISTS (\
             SELECT 1 FROM interaction_contacts ic JOIN contacts c ON c.id = ic.contact_id \
             WHERE ic.interaction_id = i.id AND c.frequency_in_days IS NOT NULL\
         ) ORDER BY i.was_at DESC, i.id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, now], interaction_from_row)?;
    rows.collect()
}

pub fn list_interaction_contacts(conn: &Connection, interaction_id: i64) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        r#"
SELECT c.id, c.name
FROM interaction_contacts ic
JOIN contacts c ON c.id = ic.contact_id
WHERE ic.interaction_id = ?1
ORDER BY c.name COLLATE NOCASE, c.id
"#,
    )?;
    let rows = stmt.query_map(params![interaction_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

pub fn list_interaction_types(conn: &Connection) -> Result<Vec<InteractionTypeRecord>> {
    let mut stmt = conn.prepare("SELECT id, key, label FROM interaction_types ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(InteractionTypeRecord {
            id: row.get(0)?,
            key: row.get(1)?,
            label: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn interaction_type_exists(conn: &Connection, key: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM interaction_types WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Interaction counts per contact with `was_at` in `[since, now]`.
pub fn interaction_counts_between(
    conn: &Connection,
    user_id: i64,
    since: &str,
    now: &str,
) -> Result<Vec<(i64, i64)>> {
    let mut stmt = conn.prepare(
        r#"
SELECT ic.contact_id, COUNT(*)
FROM interactions i
JOIN interaction_contacts ic ON ic.interaction_id = i.id
WHERE i.user_id = ?1 AND i.was_at >= ?2 AND i.was_at <= ?3
GROUP BY ic.contact_id
"#,
    )?;
    let rows = stmt.query_map(params![user_id, since, now], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

pub fn find_email_interaction(
    conn: &Connection,
    user_id: i64,
    gmail_message_id: &str,
) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT interaction_id FROM email_interactions WHERE user_id = ?1 AND gmail_message_id = ?2",
        params![user_id, gmail_message_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn insert_email_interaction(
    conn: &Connection,
    interaction_id: i64,
    user_id: i64,
    gmail_message_id: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO email_interactions (interaction_id, user_id, gmail_message_id) VALUES (?1, ?2, ?3)",
        params![interaction_id, user_id, gmail_message_id],
    )?;
    Ok(())
}

pub fn find_calendar_interaction(
    conn: &Connection,
    user_id: i64,
    google_calendar_id: &str,
) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT interaction_id FROM calendar_interactions WHERE user_id = ?1 AND google_calendar_id = ?2",
        params![user_id, google_calendar_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn insert_calendar_interaction(
    conn: &Connection,
    interaction_id: i64,
    user_id: i64,
    google_calendar_id: &str,
    url: Option<&str>,
) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO calendar_interactions (interaction_id, user_id, google_calendar_id, url)
VALUES (?1, ?2, ?3, ?4)
"#,
        params![interaction_id, user_id, google_calendar_id, url],
    )?;
    Ok(())
}

pub fn calendar_url(conn: &Connection, interaction_id: i64) -> Result<Option<String>> {
    let url: Option<Option<String>> = conn
        .query_row(
            "SELECT url FROM calendar_interactions WHERE interaction_id = ?1",
            params![interaction_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(url.flatten())
}
