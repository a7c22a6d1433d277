use rusqlite::Connection;
use serde::Serialize;
use time::Duration;
use tracing::{debug, info, warn};

use crate::db::{self, InsertContact, InsertInteraction, UserRecord};
use crate::domain::email::normalize_email;
use crate::domain::timestamp::{format_timestamp, now_utc, now_utc_rfc3339};
use crate::imports::{record_run, source_key, ImportRun};

use super::calendar::CalendarEvent;
use super::client::GoogleApi;
use super::errors::SyncError;
use super::gmail::{EmailDirection, GmailMessage};
use super::store::{
    cache_payload, cached_payload, get_credentials, list_credentials, update_access_token,
    GoogleCredential, CALENDAR_EVENT_KIND, GMAIL_MESSAGE_KIND,
};

pub const CALENDAR_DESCRIPTION: &str = "imported from Google Calendar";
const UNTITLED: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Gmail,
    Calendar,
}

impl SyncKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncKind::Gmail => "gmail",
            SyncKind::Calendar => "calendar",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncSummary {
    pub kind: String,
    pub user_id: i64,
    pub account_email: String,
    pub status: String,
    pub processed_count: u64,
    pub imported_count: u64,
    pub skipped_count: u64,
    pub error_count: u64,
    pub contacts_created: u64,
    pub last_error: Option<String>,
    pub last_run_at: String,
}

/// Sync jobs for one user's Google account.
pub struct GoogleSync<'a, A: GoogleApi> {
    conn: &'a Connection,
    api: A,
    credential: GoogleCredential,
    user_emails: Vec<String>,
}

struct SyncRun {
    counters: ImportRun,
    contacts_created: u64,
}

impl<'a, A: GoogleApi> GoogleSync<'a, A> {
    pub fn new(conn: &'a Connection, api: A, user: &UserRecord, credential: GoogleCredential) -> Self {
        let mut user_emails = Vec::new();
        for email in [credential.account_email.as_str(), user.email.as_str()] {
            let email = email.trim().to_ascii_lowercase();
            if !email.is_empty() && !user_emails.contains(&email) {
                user_emails.push(email);
            }
        }
        Self {
            conn,
            api,
            credential,
            user_emails,
        }
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Calendar first, then Gmail.
    pub fn sync_all(&mut self) -> Result<Vec<SyncSummary>, SyncError> {
        if !self.credential.has_refresh_token() {
            warn!(
                user_id = self.credential.user_id,
                account = %self.credential.account_email,
                "refresh token missing, account needs re-auth"
            );
        }
        Ok(vec![self.sync_calendar()?, self.sync_gmail()?])
    }

    pub fn sync_gmail(&mut self) -> Result<SyncSummary, SyncError> {
        let mut run = SyncRun::new();
        let result = self.run_gmail(&mut run);
        self.finish(SyncKind::Gmail, run, result)
    }

    pub fn sync_calendar(&mut self) -> Result<SyncSummary, SyncError> {
        let mut run = SyncRun::new();
        let result = self.run_calendar(&mut run);
        self.finish(SyncKind::Calendar, run, result)
    }

    fn run_gmail(&mut self, run: &mut SyncRun) -> Result<(), SyncError> {
        let mut page_token: Option<String> = None;
        loop {
            let page = self.api.list_messages(page_token.as_deref())?;
            self.persist_refreshed_token()?;
            debug!(messages = page.messages.len(), "gmail page");
            for message_ref in page.messages {
                run.counters.processed_count += 1;
                run.counters.checkpoint = Some(message_ref.id.clone());
                let payload = self.payload(GMAIL_MESSAGE_KIND, &message_ref.id, |api, id| {
                    api.get_message(id)
                })?;
                let message: GmailMessage = match serde_json::from_str(&payload) {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(message_id = %message_ref.id, error = %err, "skipping malformed gmail message");
                        run.record_error(format!("message {}: {}", message_ref.id, err));
                        continue;
                    }
                };
                match self.materialize_message(&message, run) {
                    Ok(true) => run.counters.imported_count += 1,
                    Ok(false) => run.counters.skipped_count += 1,
                    Err(SyncError::Parse(reason)) => {
                        warn!(message_id = %message.id, reason = %reason, "header parsing failed");
                        run.record_error(format!("message {}: {}", message.id, reason));
                    }
                    Err(err) => return Err(err),
                }
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(()),
            }
        }
    }

    /// Returns whether anything new was written.
    fn materialize_message(&self, message: &GmailMessage, run: &mut SyncRun) -> Result<bool, SyncError> {
        if message.direction(&self.user_emails)? != EmailDirection::Outgoing {
            return Ok(false);
        }
        let recipients = message.to_emails()?;
        let was_at = message.was_at()?;
        let user_id = self.credential.user_id;

        let tx = self.conn.unchecked_transaction()?;
        let mut changed = false;
        let interaction_id = match db::find_email_interaction(&tx, user_id, &message.id)? {
            Some(id) => id,
            None => {
                let id = db::insert_interaction(
                    &tx,
                    &InsertInteraction {
                        user_id,
                        type_key: Some("email"),
                        title: message.subject().unwrap_or(UNTITLED),
                        description: message.snippet().unwrap_or(UNTITLED),
                        was_at: &was_at,
                        created_at: &now_utc_rfc3339(),
                    },
                )?;
                db::insert_email_interaction(&tx, id, user_id, &message.id)?;
                changed = true;
                id
            }
        };
        for email in &recipients {
            let (contact_id, created) = get_or_create_contact(&tx, user_id, email)?;
            if created {
                run.contacts_created += 1;
            }
            changed |= db::link_contact(&tx, interaction_id, contact_id)?;
        }
        tx.commit()?;
        Ok(changed)
    }

    fn run_calendar(&mut self, run: &mut SyncRun) -> Result<(), SyncError> {
        let mut page_token: Option<String> = None;
        loop {
            let page = self.api.list_events(page_token.as_deref())?;
            self.persist_refreshed_token()?;
            debug!(events = page.items.len(), "calendar page");
            for item in page.items {
                run.counters.processed_count += 1;
                let event: CalendarEvent = match serde_json::from_value(item.clone()) {
                    Ok(event) => event,
                    Err(err) => {
                        run.record_error(format!("calendar event: {}", err));
                        continue;
                    }
                };
                run.counters.checkpoint = Some(event.id.clone());
                cache_payload(
                    self.conn,
                    self.credential.user_id,
                    CALENDAR_EVENT_KIND,
                    &event.id,
                    &item.to_string(),
                )?;
                match self.materialize_event(&event, run) {
                    Ok(true) => run.counters.imported_count += 1,
                    Ok(false) => run.counters.skipped_count += 1,
                    Err(SyncError::Parse(reason)) => {
                        warn!(event_id = %event.id, reason = %reason, "skipping calendar event");
                        run.record_error(format!("event {}: {}", event.id, reason));
                    }
                    Err(err) => return Err(err),
                }
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(()),
            }
        }
    }

    fn materialize_event(&self, event: &CalendarEvent, run: &mut SyncRun) -> Result<bool, SyncError> {
        // cancelled events carry almost no data
        if !event.is_confirmed() || !event.user_attended() {
            return Ok(false);
        }
        let guests: Vec<String> = event
            .accepted_guests()
            .into_iter()
            .filter(|email| !self.user_emails.contains(email))
            .collect();
        if guests.is_empty() {
            return Ok(false);
        }
        let was_at = event.ended_at()?;
        let user_id = self.credential.user_id;

        let tx = self.conn.unchecked_transaction()?;
        let mut changed = false;
        let interaction_id = match db::find_calendar_interaction(&tx, user_id, &event.id)? {
            Some(id) => id,
            None => {
                let id = db::insert_interaction(
                    &tx,
                    &InsertInteraction {
                        user_id,
                        type_key: Some("calendar"),
                        title: event.title(),
                        description: CALENDAR_DESCRIPTION,
                        was_at: &was_at,
                        created_at: &now_utc_rfc3339(),
                    },
                )?;
                db::insert_calendar_interaction(&tx, id, user_id, &event.id, event.html_link.as_deref())?;
                changed = true;
                id
            }
        };
        for email in &guests {
            let (contact_id, created) = get_or_create_contact(&tx, user_id, email)?;
            if created {
                run.contacts_created += 1;
            }
            changed |= db::link_contact(&tx, interaction_id, contact_id)?;
        }
        tx.commit()?;
        Ok(changed)
    }

    /// Cached payload for `external_id`, fetching and caching it on a miss.
    fn payload<F>(&mut self, kind: &str, external_id: &str, fetch: F) -> Result<String, SyncError>
    where
        F: FnOnce(&mut A, &str) -> Result<serde_json::Value, SyncError>,
    {
        let user_id = self.credential.user_id;
        if let Some(payload) = cached_payload(self.conn, user_id, kind, external_id)? {
            return Ok(payload);
        }
        let value = fetch(&mut self.api, external_id)?;
        self.persist_refreshed_token()?;
        let payload = value.to_string();
        cache_payload(self.conn, user_id, kind, external_id, &payload)?;
        Ok(payload)
    }

    fn persist_refreshed_token(&mut self) -> Result<(), SyncError> {
        let Some(grant) = self.api.take_refreshed_token() else {
            return Ok(());
        };
        let expires_at = grant
            .expires_in
            .map(|seconds| format_timestamp(now_utc() + Duration::seconds(seconds)));
        update_access_token(
            self.conn,
            self.credential.user_id,
            &grant.access_token,
            expires_at.as_deref(),
        )?;
        self.credential.access_token = grant.access_token;
        self.credential.expires_at = expires_at;
        info!(user_id = self.credential.user_id, "google access token refreshed and stored");
        Ok(())
    }

    fn finish(
        &self,
        kind: SyncKind,
        run: SyncRun,
        result: Result<(), SyncError>,
    ) -> Result<SyncSummary, SyncError> {
        let mut counters = run.counters;
        let status = match &result {
            Ok(()) => counters.status(false),
            Err(err) => {
                counters.last_error = Some(err.to_string());
                "failed"
            }
        };
        let account_email = self.credential.account_email.as_str();
        let key = source_key(kind.as_str(), self.credential.user_id, account_email);
        let last_run_at = record_run(
            self.conn,
            &key,
            self.credential.user_id,
            kind.as_str(),
            account_email,
            status,
            &counters,
        )?;
        if let Err(err) = result {
            warn!(kind = kind.as_str(), account = account_email, error = %err, "google sync failed");
            return Err(err);
        }
        info!(
            kind = kind.as_str(),
            account = account_email,
            imported = counters.imported_count,
            skipped = counters.skipped_count,
            errors = counters.error_count,
            "google sync finished"
        );
        Ok(SyncSummary {
            kind: kind.as_str().to_string(),
            user_id: self.credential.user_id,
            account_email: account_email.to_string(),
            status: status.to_string(),
            processed_count: counters.processed_count,
            imported_count: counters.imported_count,
            skipped_count: counters.skipped_count,
            error_count: counters.error_count,
            contacts_created: run.contacts_created,
            last_error: counters.last_error,
            last_run_at,
        })
    }
}

impl SyncRun {
    fn new() -> Self {
        Self {
            counters: ImportRun::new(),
            contacts_created: 0,
        }
    }

    fn record_error(&mut self, message: String) {
        self.counters.error_count += 1;
        self.counters.last_error = Some(message);
    }
}

/// Contact owning `email`, or a new hidden contact named by the address.
pub fn get_or_create_contact(
    conn: &Connection,
    user_id: i64,
    email: &str,
) -> Result<(i64, bool), SyncError> {
    let email = normalize_email(email)
        .ok_or_else(|| SyncError::Parse(format!("invalid address '{}'", email)))?;
    if let Some(contact_id) = db::find_contact_id_by_email(conn, user_id, &email)? {
        return Ok((contact_id, false));
    }
    let created_at = now_utc_rfc3339();
    let contact_id = db::insert_contact(
        conn,
        &InsertContact {
            user_id,
            name: &email,
            description: "",
            frequency_in_days: None,
            linkedin_url: None,
            twitter_url: None,
            created_at: &created_at,
        },
    )?;
    db::insert_email(conn, contact_id, &email, &created_at)?;
    Ok((contact_id, true))
}

/// Runs calendar then Gmail sync for `user_id` with the API built by `make_api`.
pub fn sync_user<A, F>(conn: &Connection, user_id: i64, make_api: F) -> Result<Vec<SyncSummary>, SyncError>
where
    A: GoogleApi,
    F: FnOnce(&GoogleCredential) -> Result<A, SyncError>,
{
    let user = db::get_user(conn, user_id)?
        .ok_or_else(|| SyncError::MissingCredentials(format!("unknown user {}", user_id)))?;
    let credential = get_credentials(conn, user_id)?.ok_or_else(|| {
        SyncError::MissingCredentials(format!("no google account linked for {}", user.email))
    })?;
    let api = make_api(&credential)?;
    GoogleSync::new(conn, api, &user, credential).sync_all()
}

/// Syncs every user with stored credentials; one failing account does not stop the rest.
pub fn sync_all<A, F>(conn: &Connection, mut make_api: F) -> Result<Vec<SyncSummary>, SyncError>
where
    A: GoogleApi,
    F: FnMut(&GoogleCredential) -> Result<A, SyncError>,
{
    let mut summaries = Vec::new();
    for credential in list_credentials(conn)? {
        let user_id = credential.user_id;
        match sync_user(conn, user_id, &mut make_api) {
            Ok(mut done) => summaries.append(&mut done),
            Err(SyncError::Db(err)) => return Err(SyncError::Db(err)),
            Err(err) => {
                warn!(user_id, account = %credential.account_email, error = %err, "skipping google account");
            }
        }
    }
    Ok(summaries)
}
