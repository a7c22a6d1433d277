use rusqlite::{params, Connection, OptionalExtension, Result, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub frequency_in_days: Option<i64>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_interaction_at: Option<String>,
    pub last_past_interaction_at: Option<String>,
}

pub struct InsertContact<'a> {
    pub user_id: i64,
    pub name: &'a str,
    pub description: &'a str,
    pub frequency_in_days: Option<i64>,
    pub linkedin_url: Option<&'a str>,
    pub twitter_url: Option<&'a str>,
    pub created_at: &'a str,
}

// `?2` is "now". `last_interaction_at` includes scheduled interactions;
// the second column only counts those that already happened.
const CONTACT_SELECT: &str = r#"
SELECT c.id, c.user_id, c.name, c.description, c.frequency_in_days,
       c.linkedin_url, c.twitter_url, c.created_at, c.updated_at,
       (
           SELECT MAX(i.was_at)
           FROM interactions i
           JOIN interaction_contacts ic ON ic.interaction_id = i.id
           WHERE ic.contact_id = c.id
       ) AS last_interaction_at,
       (
           SELECT MAX(i.was_at)
           FROM interactions i
           JOIN interaction_contacts ic ON ic.interaction_id = i.id
           WHERE ic.contact_id = c.id AND i.was_at <= ?2
       ) AS last_past_interaction_at
FROM contacts c
"#;

fn contact_from_row(row: &Row<'_>) -> Result<ContactRecord> {
    Ok(ContactRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        frequency_in_days: row.get(4)?,
        linkedin_url: row.get(5)?,
        twitter_url: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        last_interaction_at: row.get(9)?,
        last_past_interaction_at: row.get(10)?,
    })
}

pub fn insert_contact(conn: &Connection, args: &InsertContact<'_>) -> Result<i64> {
    conn.execute(
        r#"
INSERT INTO contacts (
    user_id, name, description, frequency_in_days, linkedin_url, twitter_url,
    created_at, updated_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
"#,
        params![
            args.user_id,
            args.name,
            args.description,
            args.frequency_in_days,
            args.linkedin_url,
            args.twitter_url,
            args.created_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_contact(conn: &Connection, record: &ContactRecord) -> Result<()> {
    conn.execute(
        r#"
UPDATE contacts
SET name = ?3, description = ?4, frequency_in_days = ?5, linkedin_url = ?6,
    twitter_url = ?7, updated_at = ?8
WHERE id = ?1 AND user_id = ?2
"#,
        params![
            record.id,
            record.user_id,
            record.name,
            record.description,
            record.frequency_in_days,
            record.linkedin_url,
            record.twitter_url,
            record.updated_at
        ],
    )?;
    Ok(())
}

pub fn get_contact(
    conn: &Connection,
    user_id: i64,
    id: i64,
    now: &str,
) -> Result<Option<ContactRecord>> {
    let sql = format!("{CONTACT_SELECT} WHERE c.user_id = ?1 AND c.id = ?3");
    conn.query_row(&sql, params![user_id, now, id], contact_from_row)
        .optional()
}

pub fn list_contacts(conn: &Connection, user_id: i64, now: &str) -> Result<Vec<ContactRecord>> {
    let sql = format!("{CONTACT_SELECT} WHERE c.user_id = ?1 ORDER BY c.name COLLATE NOCASE, c.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, now], contact_from_row)?;
    rows.collect()
}

pub fn delete_contact(conn: &Connection, user_id: i64, id: i64) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM contacts WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(changed > 0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecord {
    pub id: i64,
    pub contact_id: i64,
    pub email: String,
    pub created_at: String,
}

fn email_from_row(row: &Row<'_>) -> Result<EmailRecord> {
    Ok(EmailRecord {
        id: row.get(0)?,
        contact_id: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Idempotent per contact; returns the id of the new or existing row.
pub fn insert_email(conn: &Connection, contact_id: i64, email: &str, created_at: &str) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO email_addresses (contact_id, email, created_at) VALUES (?1, ?2, ?3)",
        params![contact_id, email, created_at],
    )?;
    conn.query_row(
        "SELECT id FROM email_addresses WHERE contact_id = ?1 AND email = ?2",
        params![contact_id, email],
        |row| row.get(0),
    )
}

pub fn list_emails(conn: &Connection, contact_id: i64) -> Result<Vec<EmailRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, contact_id, email, created_at FROM email_addresses WHERE contact_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![contact_id], email_from_row)?;
    rows.collect()
}

pub fn list_user_emails(conn: &Connection, user_id: i64) -> Result<Vec<EmailRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT e.id, e.contact_id, e.email, e.created_at
FROM email_addresses e
JOIN contacts c ON c.id = e.contact_id
WHERE c.user_id = ?1
ORDER BY e.contact_id, e.id
"#,
    )?;
    let rows = stmt.query_map(params![user_id], email_from_row)?;
    rows.collect()
}

pub fn get_email(conn: &Connection, user_id: i64, email_id: i64) -> Result<Option<EmailRecord>> {
    conn.query_row(
        r#"
SELECT e.id, e.contact_id, e.email, e.created_at
FROM email_addresses e
JOIN contacts c ON c.id = e.contact_id
WHERE e.id = ?1 AND c.user_id = ?2
"#,
        params![email_id, user_id],
        email_from_row,
    )
    .optional()
}

pub fn find_contact_id_by_email(conn: &Connection, user_id: i64, email: &str) -> Result<Option<i64>> {
    conn.query_row(
        r#"
SELECT e.contact_id
FROM email_addresses e
JOIN contacts c ON c.id = e.contact_id
WHERE c.user_id = ?1 AND e.email = ?2
ORDER BY e.id
LIMIT 1
"#,
        params![user_id, email],
        |row| row.get(0),
    )
    .optional()
}

pub fn delete_email(conn: &Connection, email_id: i64) -> Result<()> {
    conn.execute("DELETE FROM email_addresses WHERE id = ?1", params![email_id])?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneRecord {
    pub id: i64,
    pub contact_id: i64,
    pub number: String,
    pub label: Option<String>,
}

fn phone_from_row(row: &Row<'_>) -> Result<PhoneRecord> {
    Ok(PhoneRecord {
        id: row.get(0)?,
        contact_id: row.get(1)?,
        number: row.get(2)?,
        label: row.get(3)?,
    })
}

pub fn insert_phone(
    conn: &Connection,
    contact_id: i64,
    number: &str,
    label: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO phone_numbers (contact_id, number, label) VALUES (?1, ?2, ?3)",
        params![contact_id, number, label],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_phones(conn: &Connection, contact_id: i64) -> Result<Vec<PhoneRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, contact_id, number, label FROM phone_numbers WHERE contact_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![contact_id], phone_from_row)?;
    rows.collect()
}

pub fn get_phone(conn: &Connection, user_id: i64, phone_id: i64) -> Result<Option<PhoneRecord>> {
    conn.query_row(
        r#"
SELECT p.id, p.contact_id, p.number, p.label
FROM phone_numbers p
JOIN contacts c ON c.id = p.contact_id
WHERE p.id = ?1 AND c.user_id = ?2
"#,
        params![phone_id, user_id],
        phone_from_row,
    )
    .optional()
}

pub fn delete_phone(conn: &Connection, phone_id: i64) -> Result<()> {
    conn.execute("DELETE FROM phone_numbers WHERE id = ?1", params![phone_id])?;
    Ok(())
}
