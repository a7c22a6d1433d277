use std::collections::HashMap;

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info};

use crate::db;
use crate::domain::email::local_part;
use crate::domain::timestamp::now_utc_rfc3339;

mod similarity;

pub use similarity::similarity_ratio;

pub const MAX_SUGGESTIONS_PER_CONTACT: usize = 10;

#[derive(Debug, Clone)]
pub struct DuplicateCandidate {
    pub id: i64,
    pub name: String,
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DuplicateSummary {
    pub user_id: i64,
    pub contacts_scanned: u64,
    pub pairs_compared: u64,
    pub suggestions_stored: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DuplicateRecord {
    pub contact_id: i64,
    pub other_contact_id: i64,
    pub other_name: String,
    pub similarity: f64,
    pub computed_at: String,
}

/// Best of: full names, name parts before `@`, and email local parts.
/// Names are lowercased first; `similarity_ratio` itself is case-sensitive.
pub fn contact_similarity(left: &DuplicateCandidate, right: &DuplicateCandidate) -> f64 {
    let left_name = left.name.trim().to_lowercase();
    let right_name = right.name.trim().to_lowercase();
    let mut best = similarity_ratio(&left_name, &right_name)
        .max(similarity_ratio(local_part(&left_name), local_part(&right_name)));
    for left_email in &left.emails {
        for right_email in &right.emails {
            best = best.max(similarity_ratio(local_part(left_email), local_part(right_email)));
        }
    }
    best
}

pub fn load_candidates(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<DuplicateCandidate>> {
    let now = now_utc_rfc3339();
    let mut emails_by_contact: HashMap<i64, Vec<String>> = HashMap::new();
    for email in db::list_user_emails(conn, user_id)? {
        emails_by_contact
            .entry(email.contact_id)
            .or_default()
            .push(email.email);
    }
    Ok(db::list_contacts(conn, user_id, &now)?
        .into_iter()
        .map(|contact| DuplicateCandidate {
            emails: emails_by_contact.remove(&contact.id).unwrap_or_default(),
            id: contact.id,
            name: contact.name,
        })
        .collect())
}

/// Replaces the user's suggestions with the top matches per contact above `min_similarity`.
pub fn compute_duplicates(
    conn: &Connection,
    user_id: i64,
    min_similarity: f64,
) -> rusqlite::Result<DuplicateSummary> {
    let candidates = load_candidates(conn, user_id)?;
    let mut scores: Vec<Vec<(usize, f64)>> = vec![Vec::new(); candidates.len()];
    let mut pairs_compared = 0u64;
    for left in 0..candidates.len() {
        for right in (left + 1)..candidates.len() {
            pairs_compared += 1;
            let score = contact_similarity(&candidates[left], &candidates[right]);
            if score > 0.0 && score > min_similarity {
                scores[left].push((right, score));
                scores[right].push((left, score));
            }
        }
    }

    let computed_at = now_utc_rfc3339();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        r#"
DELETE FROM contact_duplicates
WHERE contact_id IN (SELECT id FROM contacts WHERE user_id = ?1)
   OR other_contact_id IN (SELECT id FROM contacts WHERE user_id = ?1)
"#,
        params![user_id],
    )?;

    let mut suggestions_stored = 0u64;
    for (index, mut matches) in scores.into_iter().enumerate() {
        matches.sort_by(|left, right| {
            right
                .1
                .total_cmp(&left.1)
                .then_with(|| candidates[left.0].name.cmp(&candidates[right.0].name))
        });
        matches.truncate(MAX_SUGGESTIONS_PER_CONTACT);
        let contact = &candidates[index];
        debug!(contact_id = contact.id, matches = matches.len(), "duplicate scan");
        for (other, score) in matches {
            tx.execute(
                r#"
INSERT INTO contact_duplicates (contact_id, other_contact_id, similarity, computed_at)
VALUES (?1, ?2, ?3, ?4)
"#,
                params![contact.id, candidates[other].id, score, computed_at],
            )?;
            suggestions_stored += 1;
        }
    }
    tx.commit()?;

    info!(
        user_id,
        contacts = candidates.len(),
        suggestions = suggestions_stored,
        "duplicate suggestions recomputed"
    );
    Ok(DuplicateSummary {
        user_id,
        contacts_scanned: candidates.len() as u64,
        pairs_compared,
        suggestions_stored,
    })
}

pub fn list_for_contact(conn: &Connection, contact_id: i64) -> rusqlite::Result<Vec<DuplicateRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT d.contact_id, d.other_contact_id, c.name, d.similarity, d.computed_at
FROM contact_duplicates d
JOIN contacts c ON c.id = d.other_contact_id
WHERE d.contact_id = ?1
ORDER BY d.similarity DESC, c.name COLLATE NOCASE
"#,
    )?;
    let rows = stmt.query_map(params![contact_id], |row| {
        Ok(DuplicateRecord {
            contact_id: row.get(0)?,
            other_contact_id: row.get(1)?,
            other_name: row.get(2)?,
            similarity: row.get(3)?,
            computed_at: row.get(4)?,
        })
    })?;
    rows.collect()
}
