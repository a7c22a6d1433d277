use std::collections::HashMap;

use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db;
use crate::imports::ImportService;

use super::client::{EventList, GoogleApi, MessageList, MessageRef, TokenGrant};
use super::errors::SyncError;
use super::service::{sync_all, sync_user, GoogleSync, CALENDAR_DESCRIPTION};
use super::store::{cached_payload, get_credentials, store_credentials, GMAIL_MESSAGE_KIND};

#[derive(Default)]
struct FakeGoogleApi {
    message_pages: Vec<MessageList>,
    messages: HashMap<String, Value>,
    event_pages: Vec<EventList>,
    message_fetches: usize,
    pending_grant: Option<TokenGrant>,
}

impl GoogleApi for FakeGoogleApi {
    fn list_messages(&mut self, page_token: Option<&str>) -> Result<MessageList, SyncError> {
        let index = page_token.map_or(0, |token| token.parse().unwrap_or(0));
        Ok(self.message_pages.get(index).cloned().unwrap_or_default())
    }

    fn get_message(&mut self, id: &str) -> Result<Value, SyncError> {
        self.message_fetches += 1;
        self.messages.get(id).cloned().ok_or(SyncError::Api {
            status: 404,
            body: format!("no message {}", id),
        })
    }

    fn list_events(&mut self, page_token: Option<&str>) -> Result<EventList, SyncError> {
        let index = page_token.map_or(0, |token| token.parse().unwrap_or(0));
        Ok(self.event_pages.get(index).cloned().unwrap_or_default())
    }

    fn refresh(&mut self, _refresh_token: &str) -> Result<TokenGrant, SyncError> {
        Ok(TokenGrant {
            access_token: "fresh".to_string(),
            expires_in: Some(3600),
        })
    }

    fn take_refreshed_token(&mut self) -> Option<TokenGrant> {
        self.pending_grant.take()
    }
}

fn unique_db_path() -> String {
    std::env::temp_dir()
        .join(format!("networking-google-{}.sqlite", Uuid::now_v7()))
        .display()
        .to_string()
}

fn cleanup(path: &str) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{path}{suffix}"));
    }
}

fn setup(path: &str) -> (Connection, db::UserRecord) {
    let conn = db::open_connection(path).expect("db should open");
    let user = db::upsert_user(&conn, "me@example.com", Some("Me"), "2026-01-01T00:00:00Z")
        .expect("user should insert");
    store_credentials(&conn, user.id, "me@example.com", "stale", Some("refresh"), None)
        .expect("credentials should store");
    (conn, user)
}

fn gmail_message(id: &str, from: &str, to: &str, subject: Option<&str>) -> Value {
    let mut headers = vec![
        json!({"name": "From", "value": from}),
        json!({"name": "To", "value": to}),
    ];
    if let Some(subject) = subject {
        headers.push(json!({"name": "Subject", "value": subject}));
    }
    json!({
        "id": id,
        "snippet": "",
        "internalDate": "1767225600000",
        "payload": {"headers": headers}
    })
}

fn paged_messages(ids: &[&[&str]]) -> Vec<MessageList> {
    let pages = ids.len();
    ids.iter()
        .enumerate()
        .map(|(index, page)| MessageList {
            messages: page
                .iter()
                .map(|id| MessageRef { id: id.to_string() })
                .collect(),
            next_page_token: (index + 1 < pages).then(|| (index + 1).to_string()),
        })
        .collect()
}

fn gmail_fake() -> FakeGoogleApi {
    let mut api = FakeGoogleApi {
        message_pages: paged_messages(&[&["m1", "m2"], &["m3", "m4"]]),
        ..FakeGoogleApi::default()
    };
    api.messages.insert(
        "m1".to_string(),
        gmail_message("m1", "Me <me@example.com>", "Ada <ADA@example.com>, bob@example.com", Some("Hello")),
    );
    api.messages.insert(
        "m2".to_string(),
        gmail_message("m2", "ada@example.com", "me@example.com", Some("Re: Hello")),
    );
    api.messages.insert(
        "m3".to_string(),
        gmail_message("m3", "undisclosed", "ada@example.com", None),
    );
    api.messages.insert(
        "m4".to_string(),
        gmail_message("m4", "me@example.com", "ada@example.com", None),
    );
    api
}

#[test]
fn gmail_sync_materializes_outgoing_mail_once() {
    let path = unique_db_path();
    let (conn, user) = setup(&path);
    let credential = get_credentials(&conn, user.id)
        .expect("credentials should load")
        .expect("credentials should exist");

    let mut sync = GoogleSync::new(&conn, gmail_fake(), &user, credential.clone());
    let summary = sync.sync_gmail().expect("gmail sync should succeed");
    assert_eq!(summary.processed_count, 4);
    assert_eq!(summary.imported_count, 2);
    assert_eq!(summary.skipped_count, 1);
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.contacts_created, 2);
    assert_eq!(summary.status, "partial");
    assert_eq!(sync.api().message_fetches, 4);

    let ada = db::find_contact_id_by_email(&conn, user.id, "ada@example.com")
        .expect("lookup should succeed")
        .expect("ada should be auto-created");
    let contact = db::get_contact(&conn, user.id, ada, "2100-01-01T00:00:00Z")
        .expect("contact should load")
        .expect("contact should exist");
    assert_eq!(contact.name, "ada@example.com");
    assert_eq!(contact.frequency_in_days, None);
    assert_eq!(contact.last_interaction_at.as_deref(), Some("2026-01-01T00:00:00Z"));

    let interactions = db::list_contact_interactions(&conn, ada).expect("interactions should list");
    assert_eq!(interactions.len(), 2);
    let titles: Vec<&str> = interactions.iter().map(|row| row.title.as_str()).collect();
    assert!(titles.contains(&"Hello"));
    assert!(titles.contains(&"-"));
    assert!(interactions.iter().all(|row| row.type_key.as_deref() == Some("email")));
    assert!(interactions.iter().all(|row| row.description == "-"));

    // second run reads every message from the payload cache and writes nothing new
    let mut again = GoogleSync::new(&conn, gmail_fake(), &user, credential);
    let summary = again.sync_gmail().expect("second sync should succeed");
    assert_eq!(summary.imported_count, 0);
    assert_eq!(again.api().message_fetches, 0);
    assert_eq!(
        db::list_contact_interactions(&conn, ada)
            .expect("interactions should list")
            .len(),
        2
    );
    assert!(cached_payload(&conn, user.id, GMAIL_MESSAGE_KIND, "m1")
        .expect("cache should read")
        .is_some());

    let statuses = ImportService::new(&conn, 7)
        .list_statuses(user.id)
        .expect("status should load");
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].source_type, "gmail");
    assert_eq!(statuses[0].source_ref, "me@example.com");

    drop(conn);
    cleanup(&path);
}

fn calendar_fake() -> FakeGoogleApi {
    let event = |id: &str, status: &str, me: &str, guests: Value| {
        let mut attendees = vec![json!({"email": "me@example.com", "self": true, "responseStatus": me})];
        if let Value::Array(rest) = guests {
            attendees.extend(rest);
        }
        json!({
            "kind": "calendar#event",
            "id": id,
            "status": status,
            "summary": format!("Event {}", id),
            "htmlLink": format!("https://calendar.example.com/{}", id),
            "end": {"dateTime": "2026-02-01T10:00:00+01:00"},
            "attendees": attendees
        })
    };
    FakeGoogleApi {
        event_pages: vec![
            EventList {
                items: vec![
                    event(
                        "e1",
                        "confirmed",
                        "accepted",
                        json!([
                            {"email": "carol@example.com", "responseStatus": "accepted"},
                            {"email": "dave@example.com", "responseStatus": "declined"}
                        ]),
                    ),
                    event(
                        "e2",
                        "cancelled",
                        "accepted",
                        json!([{"email": "erin@example.com", "responseStatus": "accepted"}]),
                    ),
                ],
                next_page_token: Some("1".to_string()),
            },
            EventList {
                items: vec![event(
                    "e3",
                    "confirmed",
                    "declined",
                    json!([{"email": "frank@example.com", "responseStatus": "accepted"}]),
                )],
                next_page_token: None,
            },
        ],
        ..FakeGoogleApi::default()
    }
}

#[test]
fn calendar_sync_requires_confirmed_events_the_user_accepted() {
    let path = unique_db_path();
    let (conn, user) = setup(&path);
    let credential = get_credentials(&conn, user.id)
        .expect("credentials should load")
        .expect("credentials should exist");

    let mut sync = GoogleSync::new(&conn, calendar_fake(), &user, credential);
    let summary = sync.sync_calendar().expect("calendar sync should succeed");
    assert_eq!(summary.processed_count, 3);
    assert_eq!(summary.imported_count, 1);
    assert_eq!(summary.skipped_count, 2);
    assert_eq!(summary.contacts_created, 1);

    let carol = db::find_contact_id_by_email(&conn, user.id, "carol@example.com")
        .expect("lookup should succeed")
        .expect("carol should be created");
    let interactions = db::list_contact_interactions(&conn, carol).expect("interactions should list");
    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].title, "Event e1");
    assert_eq!(interactions[0].description, CALENDAR_DESCRIPTION);
    assert_eq!(interactions[0].was_at, "2026-02-01T09:00:00Z");
    assert_eq!(
        db::calendar_url(&conn, interactions[0].id).expect("url should read"),
        Some("https://calendar.example.com/e1".to_string())
    );
    for absent in ["dave@example.com", "erin@example.com", "frank@example.com"] {
        assert!(db::find_contact_id_by_email(&conn, user.id, absent)
            .expect("lookup should succeed")
            .is_none());
    }

    drop(conn);
    cleanup(&path);
}

#[test]
fn refreshed_tokens_are_persisted() {
    let path = unique_db_path();
    let (conn, user) = setup(&path);

    let summaries = sync_user(&conn, user.id, |_| {
        Ok(FakeGoogleApi {
            pending_grant: Some(TokenGrant {
                access_token: "fresh".to_string(),
                expires_in: Some(3600),
            }),
            ..FakeGoogleApi::default()
        })
    })
    .expect("sync should succeed");
    let kinds: Vec<&str> = summaries.iter().map(|summary| summary.kind.as_str()).collect();
    assert_eq!(kinds, vec!["calendar", "gmail"]);

    let credential = get_credentials(&conn, user.id)
        .expect("credentials should load")
        .expect("credentials should exist");
    assert_eq!(credential.access_token, "fresh");
    assert!(credential.expires_at.is_some());
    assert_eq!(credential.refresh_token.as_deref(), Some("refresh"));

    drop(conn);
    cleanup(&path);
}

#[test]
fn sync_all_skips_users_without_credentials_and_records_failures() {
    let path = unique_db_path();
    let (conn, user) = setup(&path);
    db::upsert_user(&conn, "other@example.com", None, "2026-01-01T00:00:00Z")
        .expect("second user should insert");

    let mut calls = 0;
    let summaries = sync_all(&conn, |_| {
        calls += 1;
        Ok(FakeGoogleApi::default())
    })
    .expect("sync should succeed");
    assert_eq!(calls, 1);
    assert_eq!(summaries.len(), 2);
    assert!(summaries.iter().all(|summary| summary.user_id == user.id));

    let missing = sync_user(&conn, user.id + 1, |_| Ok(FakeGoogleApi::default()))
        .expect_err("user without credentials should fail");
    assert!(matches!(missing, SyncError::MissingCredentials(_)));

    let mut failing = FakeGoogleApi {
        message_pages: paged_messages(&[&["gone"]]),
        ..FakeGoogleApi::default()
    };
    failing.messages.clear();
    let credential = get_credentials(&conn, user.id)
        .expect("credentials should load")
        .expect("credentials should exist");
    let err = GoogleSync::new(&conn, failing, &user, credential)
        .sync_gmail()
        .expect_err("missing message should fail the run");
    assert!(matches!(err, SyncError::Api { status: 404, .. }));
    let statuses = ImportService::new(&conn, 7)
        .list_statuses(user.id)
        .expect("status should load");
    let gmail = statuses
        .iter()
        .find(|status| status.source_type == "gmail")
        .expect("gmail run should be recorded");
    assert_eq!(gmail.status, "failed");

    drop(conn);
    cleanup(&path);
}
