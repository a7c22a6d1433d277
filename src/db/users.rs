use rusqlite::{params, Connection, OptionalExtension, Result, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub created_at: String,
}

fn user_from_row(row: &Row<'_>) -> Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Inserts the user if missing; an existing row keeps its name unless a new one is given.
pub fn upsert_user(
    conn: &Connection,
    email: &str,
    name: Option<&str>,
    created_at: &str,
) -> Result<UserRecord> {
    conn.execute(
        r#"
INSERT INTO users (email, name, created_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(email) DO UPDATE SET name = COALESCE(excluded.name, users.name)
"#,
        params![email, name, created_at],
    )?;
    conn.query_row(
        "SELECT id, email, name, created_at FROM users WHERE email = ?1",
        params![email],
        user_from_row,
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRecord>> {
    conn.query_row(
        "SELECT id, email, name, created_at FROM users WHERE email = ?1",
        params![email],
        user_from_row,
    )
    .optional()
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<UserRecord>> {
    conn.query_row(
        "SELECT id, email, name, created_at FROM users WHERE id = ?1",
        params![id],
        user_from_row,
    )
    .optional()
}

pub fn list_users(conn: &Connection) -> Result<Vec<UserRecord>> {
    let mut stmt = conn.prepare("SELECT id, email, name, created_at FROM users ORDER BY id ASC")?;
    let rows = stmt.query_map([], user_from_row)?;
    rows.collect()
}
