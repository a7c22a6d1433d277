use rusqlite::Connection;
use serde::Serialize;
use time::Duration;
use tracing::info;

use crate::db::{self, InsertContact, InsertInteraction};
use crate::domain::timestamp::{format_timestamp, now_utc};

const FIRST_NAMES: [&str; 6] = ["Peter", "Barbara", "Klaus", "Karl", "Ferdinand", "Otto"];
const LAST_NAMES: [&str; 5] = ["Müller", "Meyer", "Merkel", "Duck", "Gamma"];

pub const SEED_TITLE: &str = "Interaction";
pub const SEED_DESCRIPTION: &str = "Talked";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    pub contacts: usize,
    pub interactions_per_contact: usize,
    pub seed: u64,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            contacts: 100,
            interactions_per_contact: 100,
            seed: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeedSummary {
    pub user_id: i64,
    pub contacts_created: u64,
    pub interactions_created: u64,
}

/// xorshift64*, enough for reproducible demo data.
struct SeedRng(u64);

impl SeedRng {
    fn new(seed: u64) -> Self {
        // zero is a fixed point of xorshift
        Self(seed.max(1))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    /// Uniform-ish value in `start..end`.
    fn range(&mut self, start: i64, end: i64) -> i64 {
        let span = (end - start).max(1) as u64;
        start + (self.next_u64() % span) as i64
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// Single last names plus every ordered pair of distinct ones, e.g. "Meyer-Duck".
pub fn last_names() -> Vec<String> {
    let mut names: Vec<String> = LAST_NAMES.iter().map(|name| name.to_string()).collect();
    for first in LAST_NAMES {
        for second in LAST_NAMES {
            if first != second {
                names.push(format!("{first}-{second}"));
            }
        }
    }
    names
}

pub fn seed_demo_data(
    conn: &Connection,
    user_id: i64,
    options: &SeedOptions,
) -> rusqlite::Result<SeedSummary> {
    let mut rng = SeedRng::new(options.seed);
    let last_names = last_names();
    let last_refs: Vec<&str> = last_names.iter().map(String::as_str).collect();
    let now = now_utc();
    let created_at = format_timestamp(now);

    let tx = conn.unchecked_transaction()?;
    let mut interactions_created = 0u64;
    for _ in 0..options.contacts {
        let name = format!("{} {}", rng.pick(&FIRST_NAMES), rng.pick(&last_refs));
        let contact_id = db::insert_contact(
            &tx,
            &InsertContact {
                user_id,
                name: &name,
                description: "",
                frequency_in_days: Some(rng.range(7, 30)),
                linkedin_url: None,
                twitter_url: None,
                created_at: &created_at,
            },
        )?;
        for _ in 0..options.interactions_per_contact {
            let was_at = format_timestamp(now - Duration::days(rng.range(1, 365)));
            let interaction_id = db::insert_interaction(
                &tx,
                &InsertInteraction {
                    user_id,
                    type_key: Some("note"),
                    title: SEED_TITLE,
                    description: SEED_DESCRIPTION,
                    was_at: &was_at,
                    created_at: &created_at,
                },
            )?;
            db::link_contact(&tx, interaction_id, contact_id)?;
            interactions_created += 1;
        }
    }
    tx.commit()?;

    info!(
        user_id,
        contacts = options.contacts,
        interactions = interactions_created,
        "seeded demo data"
    );
    Ok(SeedSummary {
        user_id,
        contacts_created: options.contacts as u64,
        interactions_created,
    })
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{last_names, seed_demo_data, SeedOptions, SeedRng};
    use crate::db;

    #[test]
    fn last_names_include_double_barrelled_pairs() {
        let names = last_names();
        assert_eq!(names.len(), 5 + 20);
        assert!(names.iter().any(|name| name == "Müller-Gamma"));
        assert!(!names.iter().any(|name| name == "Duck-Duck"));
    }

    #[test]
    fn rng_is_deterministic_and_stays_in_range() {
        let mut first = SeedRng::new(42);
        let mut second = SeedRng::new(42);
        for _ in 0..200 {
            let value = first.range(7, 30);
            assert_eq!(value, second.range(7, 30));
            assert!((7..30).contains(&value));
        }
    }

    #[test]
    fn seeds_contacts_with_past_interactions() {
        let path = std::env::temp_dir()
            .join(format!("networking-seed-{}.sqlite", Uuid::now_v7()))
            .display()
            .to_string();
        let conn = db::open_connection(&path).expect("db should open");
        let user = db::upsert_user(&conn, "seed@example.com", None, "2026-01-01T00:00:00Z")
            .expect("user should insert");

        let summary = seed_demo_data(
            &conn,
            user.id,
            &SeedOptions {
                contacts: 5,
                interactions_per_contact: 3,
                seed: 7,
            },
        )
        .expect("seed should succeed");
        assert_eq!(summary.contacts_created, 5);
        assert_eq!(summary.interactions_created, 15);

        let now = crate::domain::timestamp::now_utc_rfc3339();
        let contacts = db::list_contacts(&conn, user.id, &now).expect("contacts should list");
        assert_eq!(contacts.len(), 5);
        for contact in &contacts {
            let frequency = contact.frequency_in_days.expect("seeded contacts are selected");
            assert!((7..30).contains(&frequency));
            assert!(contact.last_interaction_at.is_some());
            let interactions =
                db::list_contact_interactions(&conn, contact.id).expect("interactions should list");
            assert_eq!(interactions.len(), 3);
            assert!(interactions.iter().all(|row| row.was_at < now));
        }

        drop(conn);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{path}{suffix}"));
        }
    }
}
