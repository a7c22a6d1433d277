use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use rusqlite::Connection;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::config::{Config, ConfigError, DashboardConfig};
use crate::db::{self, ContactRecord, InsertContact, InsertInteraction};
use crate::domain::avatar::avatar_url;
use crate::domain::email::normalize_email;
use crate::domain::status::{
    ContactStatus, FrequencyChange, ParseContactStatusError, ParseFrequencyChangeError,
};
use crate::domain::timesince::{timesince_coarse, timeuntil_coarse};
use crate::domain::timestamp::{format_timestamp, normalize_timestamp, now_utc, parse_timestamp};
use crate::duplicates::{self, DuplicateSummary};
use crate::google::{self, GoogleCredential, HttpGoogleApi, SyncError, SyncSummary};
use crate::imports::{
    CsvImportOptions, ImportError, ImportService, ImportStatus, ImportSummary, UPLOAD_SOURCE_REF,
};
use crate::seed::{self, SeedOptions, SeedSummary};

mod views;

#[cfg(test)]
pub use views::ContactRef;
pub use views::{
    ContactCounts, ContactDetail, ContactList, ContactPatch, ContactView, DashboardView,
    EmailView, FrequentContact, InteractionTypeView, InteractionView, NewContact, NewInteraction,
    PhoneView, UserView,
};

pub const TOUCHPOINT_TITLE: &str = "Interaction";
pub const TOUCHPOINT_DESCRIPTION: &str = "...";
const DEFAULT_INTERACTION_TYPE: &str = "note";
const AVATAR_SIZE: u32 = 128;

pub struct App {
    conn: Connection,
    config: Config,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SettingsView {
    pub owner: UserView,
    pub google: Option<GoogleCredential>,
    pub imports: Vec<ImportStatus>,
}

impl App {
    pub fn open(db_path: &str, config: Config) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let conn = db::open_connection(db_path)?;
        Ok(Self { conn, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ensure_user(&self, email: &str, name: Option<&str>) -> Result<UserView, AppError> {
        let email = normalize_email(email)
            .ok_or_else(|| AppError::InvalidArgument(format!("invalid email '{}'", email.trim())))?;
        let name = name.map(str::trim).filter(|name| !name.is_empty());
        let user = db::upsert_user(&self.conn, &email, name, &now_string())?;
        Ok(user.into())
    }

    pub fn find_user(&self, email: &str) -> Result<Option<UserView>, AppError> {
        let email = email.trim().to_ascii_lowercase();
        Ok(db::get_user_by_email(&self.conn, &email)?.map(UserView::from))
    }

    /// Like [`App::find_user`] but an unknown address is an error.
    pub fn require_user(&self, email: &str) -> Result<UserView, AppError> {
        self.find_user(email)?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", email.trim())))
    }

    pub fn list_users(&self) -> Result<Vec<UserView>, AppError> {
        Ok(db::list_users(&self.conn)?
            .into_iter()
            .map(UserView::from)
            .collect())
    }

    pub fn create_contact(&self, user_id: i64, input: NewContact) -> Result<ContactView, AppError> {
        let name = required_text(&input.name, "contact name")?;
        validate_frequency(input.frequency_in_days)?;
        let mut emails = Vec::with_capacity(input.emails.len());
        for raw in &input.emails {
            emails.push(parse_email(raw)?);
        }

        let created_at = now_string();
        let tx = self.conn.unchecked_transaction()?;
        let contact_id = db::insert_contact(
            &tx,
            &InsertContact {
                user_id,
                name: &name,
                description: input.description.as_deref().unwrap_or("").trim(),
                frequency_in_days: input.frequency_in_days,
                linkedin_url: non_empty(input.linkedin_url.as_deref()).as_deref(),
                twitter_url: non_empty(input.twitter_url.as_deref()).as_deref(),
                created_at: &created_at,
            },
        )?;
        for email in &emails {
            db::insert_email(&tx, contact_id, email, &created_at)?;
        }
        tx.commit()?;
        info!(user_id, contact_id, "contact created");
        self.get_contact(user_id, contact_id)
    }

    pub fn get_contact(&self, user_id: i64, contact_id: i64) -> Result<ContactView, AppError> {
        let now = now_utc();
        let record = self.contact_record(user_id, contact_id, now)?;
        Ok(ContactView::from_record(record, now))
    }

    pub fn update_contact(
        &self,
        user_id: i64,
        contact_id: i64,
        patch: ContactPatch,
    ) -> Result<ContactView, AppError> {
        if !patch.has_changes() {
            return Err(AppError::InvalidArgument(
                "update requires at least one field".to_string(),
            ));
        }
        let now = now_utc();
        let mut record = self.contact_record(user_id, contact_id, now)?;
        if let Some(name) = patch.name.as_deref() {
            record.name = required_text(name, "contact name")?;
        }
        if let Some(description) = patch.description {
            record.description = description.trim().to_string();
        }
        if let Some(frequency) = patch.frequency_in_days {
            validate_frequency(frequency)?;
            record.frequency_in_days = frequency;
        }
        if let Some(linkedin_url) = patch.linkedin_url {
            record.linkedin_url = non_empty(linkedin_url.as_deref());
        }
        if let Some(twitter_url) = patch.twitter_url {
            record.twitter_url = non_empty(twitter_url.as_deref());
        }
        record.updated_at = format_timestamp(now);
        db::update_contact(&self.conn, &record)?;
        Ok(ContactView::from_record(record, now))
    }

    pub fn delete_contact(&self, user_id: i64, contact_id: i64) -> Result<(), AppError> {
        if !db::delete_contact(&self.conn, user_id, contact_id)? {
            return Err(contact_not_found(contact_id));
        }
        info!(user_id, contact_id, "contact deleted");
        Ok(())
    }

    /// Without a status filter only contacts with a frequency are listed.
    pub fn list_contacts(
        &self,
        user_id: i64,
        status: Option<ContactStatus>,
    ) -> Result<ContactList, AppError> {
        let contacts = self.contact_views(user_id, now_utc())?;
        let counts = ContactCounts::tally(&contacts);
        let contacts = contacts
            .into_iter()
            .filter(|contact| match status {
                Some(status) => contact.status == status,
                None => contact.is_selected(),
            })
            .collect();
        Ok(ContactList {
            status,
            counts,
            contacts,
        })
    }

    pub fn list_contacts_by_status(
        &self,
        user_id: i64,
        status: Option<&str>,
    ) -> Result<ContactList, AppError> {
        let status = match status.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => Some(ContactStatus::from_str(raw)?),
            None => None,
        };
        self.list_contacts(user_id, status)
    }

    pub fn contact_detail(&self, user_id: i64, contact_id: i64) -> Result<ContactDetail, AppError> {
        let now = now_utc();
        let record = self.contact_record(user_id, contact_id, now)?;
        let contact = ContactView::from_record(record, now);
        let emails: Vec<EmailView> = db::list_emails(&self.conn, contact_id)?
            .into_iter()
            .map(EmailView::from)
            .collect();
        let phones = db::list_phones(&self.conn, contact_id)?
            .into_iter()
            .map(PhoneView::from)
            .collect();
        let mut interactions = Vec::new();
        for record in db::list_contact_interactions(&self.conn, contact_id)? {
            interactions.push(self.interaction_view(record)?);
        }
        let duplicates = duplicates::list_for_contact(&self.conn, contact_id)?;

        let last_interaction_since = contact
            .last_past_interaction_at
            .as_deref()
            .and_then(parse_timestamp)
            .map(|last| timesince_coarse(last, now));
        let due_in = contact
            .next_due_at
            .as_deref()
            .and_then(parse_timestamp)
            .filter(|due| *due > now)
            .map(|due| timeuntil_coarse(due, now));
        let avatar = avatar_url(
            contact.id,
            emails.first().map(|email| email.email.as_str()),
            AVATAR_SIZE,
        );
        Ok(ContactDetail {
            contact,
            avatar_url: avatar,
            last_interaction_since,
            due_in,
            emails,
            phones,
            interactions,
            duplicates,
        })
    }

    pub fn add_email(&self, user_id: i64, contact_id: i64, email: &str) -> Result<EmailView, AppError> {
        self.contact_record(user_id, contact_id, now_utc())?;
        let email = parse_email(email)?;
        let email_id = db::insert_email(&self.conn, contact_id, &email, &now_string())?;
        Ok(EmailView {
            id: email_id,
            contact_id,
            email,
        })
    }

    pub fn list_emails(&self, user_id: i64, contact_id: i64) -> Result<Vec<EmailView>, AppError> {
        self.contact_record(user_id, contact_id, now_utc())?;
        Ok(db::list_emails(&self.conn, contact_id)?
            .into_iter()
            .map(EmailView::from)
            .collect())
    }

    pub fn delete_email(&self, user_id: i64, email_id: i64) -> Result<EmailView, AppError> {
        let email = db::get_email(&self.conn, user_id, email_id)?
            .ok_or_else(|| AppError::NotFound(format!("email address {}", email_id)))?;
        db::delete_email(&self.conn, email_id)?;
        Ok(email.into())
    }

    pub fn add_phone(
        &self,
        user_id: i64,
        contact_id: i64,
        number: &str,
        label: Option<&str>,
    ) -> Result<PhoneView, AppError> {
        self.contact_record(user_id, contact_id, now_utc())?;
        let number = required_text(number, "phone number")?;
        let label = non_empty(label);
        let phone_id = db::insert_phone(&self.conn, contact_id, &number, label.as_deref())?;
        Ok(PhoneView {
            id: phone_id,
            contact_id,
            number,
            label,
        })
    }

    pub fn delete_phone(&self, user_id: i64, phone_id: i64) -> Result<PhoneView, AppError> {
        let phone = db::get_phone(&self.conn, user_id, phone_id)?
            .ok_or_else(|| AppError::NotFound(format!("phone number {}", phone_id)))?;
        db::delete_phone(&self.conn, phone_id)?;
        Ok(phone.into())
    }

    pub fn add_touchpoint(&self, user_id: i64, contact_id: i64) -> Result<InteractionView, AppError> {
        self.create_interaction(
            user_id,
            NewInteraction {
                title: TOUCHPOINT_TITLE.to_string(),
                description: Some(TOUCHPOINT_DESCRIPTION.to_string()),
                was_at: None,
                contact_ids: vec![contact_id],
                type_key: Some("touchpoint".to_string()),
            },
        )
        .map_err(|err| match err {
            // the only contact reference is the path id
            AppError::InvalidArgument(_) => contact_not_found(contact_id),
            other => other,
        })
    }

    pub fn change_frequency(
        &self,
        user_id: i64,
        contact_id: i64,
        method: &str,
    ) -> Result<ContactView, AppError> {
        let change = FrequencyChange::from_str(method)?;
        let now = now_utc();
        let mut record = self.contact_record(user_id, contact_id, now)?;
        record.frequency_in_days = change.apply(
            record.frequency_in_days,
            self.config.imports.default_frequency_days,
        );
        record.updated_at = format_timestamp(now);
        db::update_contact(&self.conn, &record)?;
        Ok(ContactView::from_record(record, now))
    }

    pub fn create_interaction(
        &self,
        user_id: i64,
        input: NewInteraction,
    ) -> Result<InteractionView, AppError> {
        let title = required_text(&input.title, "interaction title")?;
        if input.contact_ids.is_empty() {
            return Err(AppError::InvalidArgument(
                "interaction requires at least one contact".to_string(),
            ));
        }
        let now = now_utc();
        for contact_id in &input.contact_ids {
            if db::get_contact(&self.conn, user_id, *contact_id, &format_timestamp(now))?.is_none() {
                return Err(AppError::InvalidArgument(format!(
                    "contact {} does not belong to this user",
                    contact_id
                )));
            }
        }
        let type_key = input
            .type_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .unwrap_or(DEFAULT_INTERACTION_TYPE);
        if !db::interaction_type_exists(&self.conn, type_key)? {
            return Err(AppError::InvalidArgument(format!(
                "unknown interaction type '{}'",
                type_key
            )));
        }
        let was_at = match input.was_at.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => normalize_timestamp(Some(raw)).ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "was_at '{}' must be RFC3339 or YYYY-MM-DD",
                    raw
                ))
            })?,
            None => format_timestamp(now),
        };

        let tx = self.conn.unchecked_transaction()?;
        let interaction_id = db::insert_interaction(
            &tx,
            &InsertInteraction {
                user_id,
                type_key: Some(type_key),
                title: &title,
                description: input.description.as_deref().unwrap_or("").trim(),
                was_at: &was_at,
                created_at: &format_timestamp(now),
            },
        )?;
        for contact_id in &input.contact_ids {
            db::link_contact(&tx, interaction_id, *contact_id)?;
        }
        tx.commit()?;

        let record = db::get_interaction(&self.conn, user_id, interaction_id)?
            .ok_or_else(|| AppError::NotFound(format!("interaction {}", interaction_id)))?;
        self.interaction_view(record)
    }

    /// Past interactions involving at least one contact with a frequency, newest first.
    pub fn list_interactions(&self, user_id: i64) -> Result<Vec<InteractionView>, AppError> {
        let now = now_string();
        let mut out = Vec::new();
        for record in db::list_past_interactions_of_selected(&self.conn, user_id, &now)? {
            out.push(self.interaction_view(record)?);
        }
        Ok(out)
    }

    pub fn list_interaction_types(&self) -> Result<Vec<InteractionTypeView>, AppError> {
        Ok(db::list_interaction_types(&self.conn)?
            .into_iter()
            .map(|record| InteractionTypeView {
                key: record.key,
                label: record.label,
            })
            .collect())
    }

    pub fn dashboard(&self, user_id: i64) -> Result<DashboardView, AppError> {
        self.dashboard_with(user_id, &self.config.dashboard)
    }

    pub fn dashboard_with(
        &self,
        user_id: i64,
        limits: &DashboardConfig,
    ) -> Result<DashboardView, AppError> {
        let now = now_utc();
        let contacts = self.contact_views(user_id, now)?;
        let counts = ContactCounts::tally(&contacts);

        let mut due: Vec<ContactView> = contacts
            .iter()
            .filter(|contact| contact.urgency.is_some_and(|urgency| urgency > 0))
            .cloned()
            .collect();
        due.sort_by(|left, right| {
            right
                .urgency
                .cmp(&left.urgency)
                .then_with(|| by_name(left, right))
        });
        due.truncate(limits.due_limit);

        let since = format_timestamp(now - Duration::days(limits.frequent_window_days));
        let interaction_counts: HashMap<i64, i64> =
            db::interaction_counts_between(&self.conn, user_id, &since, &format_timestamp(now))?
                .into_iter()
                .collect();
        let mut frequent: Vec<FrequentContact> = contacts
            .iter()
            .filter_map(|contact| {
                interaction_counts
                    .get(&contact.id)
                    .map(|count| FrequentContact {
                        contact: contact.clone(),
                        interaction_count: *count,
                    })
            })
            .collect();
        frequent.sort_by(|left, right| {
            right
                .interaction_count
                .cmp(&left.interaction_count)
                .then_with(|| by_name(&left.contact, &right.contact))
        });
        frequent.truncate(limits.frequent_limit);

        let mut recent: Vec<ContactView> = contacts
            .into_iter()
            .filter(|contact| contact.last_past_interaction_at.is_some())
            .collect();
        recent.sort_by(|left, right| {
            right
                .last_past_interaction_at
                .cmp(&left.last_past_interaction_at)
                .then_with(|| by_name(left, right))
        });
        recent.truncate(limits.recent_limit);

        Ok(DashboardView {
            counts,
            due,
            frequent,
            recent,
        })
    }

    pub fn import_csv_file(
        &self,
        user_id: i64,
        file: &str,
        options: &CsvImportOptions,
    ) -> Result<ImportSummary, AppError> {
        Ok(self.import_service().import_csv_file(user_id, file, options)?)
    }

    pub fn import_csv_upload(
        &self,
        user_id: i64,
        content: &str,
        options: &CsvImportOptions,
    ) -> Result<ImportSummary, AppError> {
        Ok(self
            .import_service()
            .import_csv(user_id, UPLOAD_SOURCE_REF, content, options)?)
    }

    pub fn import_trello_file(
        &self,
        user_id: i64,
        file: &str,
        dry_run: bool,
    ) -> Result<ImportSummary, AppError> {
        Ok(self.import_service().import_trello_file(user_id, file, dry_run)?)
    }

    pub fn import_trello_upload(
        &self,
        user_id: i64,
        content: &str,
        dry_run: bool,
    ) -> Result<ImportSummary, AppError> {
        Ok(self
            .import_service()
            .import_trello(user_id, UPLOAD_SOURCE_REF, content, dry_run)?)
    }

    pub fn import_statuses(&self, user_id: i64) -> Result<Vec<ImportStatus>, AppError> {
        Ok(self.import_service().list_statuses(user_id)?)
    }

    pub fn compute_duplicates(
        &self,
        user_id: i64,
        min_similarity: f64,
    ) -> Result<DuplicateSummary, AppError> {
        if !(0.0..1.0).contains(&min_similarity) {
            return Err(AppError::InvalidArgument(
                "min similarity must be in [0, 1)".to_string(),
            ));
        }
        Ok(duplicates::compute_duplicates(&self.conn, user_id, min_similarity)?)
    }

    pub fn link_google(
        &self,
        user_id: i64,
        account_email: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<&str>,
    ) -> Result<GoogleCredential, AppError> {
        let account_email = parse_email(account_email)?;
        let access_token = required_text(access_token, "access token")?;
        let expires_at = match expires_at {
            Some(raw) => Some(normalize_timestamp(Some(raw)).ok_or_else(|| {
                AppError::InvalidArgument(format!("expires_at '{}' must be RFC3339", raw))
            })?),
            None => None,
        };
        let credential = google::store_credentials(
            &self.conn,
            user_id,
            &account_email,
            &access_token,
            non_empty(refresh_token).as_deref(),
            expires_at.as_deref(),
        )?;
        info!(user_id, account = %credential.account_email, "google account linked");
        Ok(credential)
    }

    pub fn google_credentials(&self, user_id: i64) -> Result<Option<GoogleCredential>, AppError> {
        Ok(google::get_credentials(&self.conn, user_id)?)
    }

    /// Syncs one user, or every linked account when `user_id` is `None`.
    pub fn sync_google(&self, user_id: Option<i64>) -> Result<Vec<SyncSummary>, AppError> {
        let google_config = &self.config.google;
        let make_api = |credential: &GoogleCredential| HttpGoogleApi::new(google_config, credential);
        let summaries = match user_id {
            Some(user_id) => google::sync_user(&self.conn, user_id, make_api)?,
            None => google::sync_all(&self.conn, make_api)?,
        };
        Ok(summaries)
    }

    pub fn settings(&self, user_id: i64) -> Result<SettingsView, AppError> {
        let owner = db::get_user(&self.conn, user_id)?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;
        Ok(SettingsView {
            owner: owner.into(),
            google: self.google_credentials(user_id)?,
            imports: self.import_statuses(user_id)?,
        })
    }

    pub fn seed(&self, user_id: i64, options: &SeedOptions) -> Result<SeedSummary, AppError> {
        Ok(seed::seed_demo_data(&self.conn, user_id, options)?)
    }

    fn import_service(&self) -> ImportService<'_> {
        ImportService::new(&self.conn, self.config.imports.default_frequency_days)
    }

    fn contact_record(
        &self,
        user_id: i64,
        contact_id: i64,
        now: OffsetDateTime,
    ) -> Result<ContactRecord, AppError> {
        db::get_contact(&self.conn, user_id, contact_id, &format_timestamp(now))?
            .ok_or_else(|| contact_not_found(contact_id))
    }

    fn contact_views(&self, user_id: i64, now: OffsetDateTime) -> Result<Vec<ContactView>, AppError> {
        Ok(db::list_contacts(&self.conn, user_id, &format_timestamp(now))?
            .into_iter()
            .map(|record| ContactView::from_record(record, now))
            .collect())
    }

    fn interaction_view(&self, record: db::InteractionRecord) -> Result<InteractionView, AppError> {
        let url = db::calendar_url(&self.conn, record.id)?;
        let contacts = db::list_interaction_contacts(&self.conn, record.id)?;
        Ok(InteractionView::new(record, url, contacts))
    }
}

fn by_name(left: &ContactView, right: &ContactView) -> std::cmp::Ordering {
    left.name
        .to_lowercase()
        .cmp(&right.name.to_lowercase())
        .then_with(|| left.id.cmp(&right.id))
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn now_string() -> String {
    format_timestamp(now_utc())
}

fn contact_not_found(contact_id: i64) -> AppError {
    AppError::NotFound(format!("contact {}", contact_id))
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn required_text(raw: &str, what: &str) -> Result<String, AppError> {
    non_empty(Some(raw)).ok_or_else(|| AppError::InvalidArgument(format!("{} cannot be empty", what)))
}

fn parse_email(raw: &str) -> Result<String, AppError> {
    normalize_email(raw)
        .ok_or_else(|| AppError::InvalidArgument(format!("invalid email '{}'", raw.trim())))
}

fn validate_frequency(frequency: Option<i64>) -> Result<(), AppError> {
    match frequency {
        Some(days) if days <= 0 => Err(AppError::InvalidArgument(
            "frequency_in_days must be greater than zero".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Import(ImportError),
    Sync(SyncError),
    Config(ConfigError),
    InvalidArgument(String),
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Db(err) => write!(f, "database error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Sync(err) => write!(f, "sync error: {}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::NotFound(what) => write!(f, "{} not found", what),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Db(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Sync(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::InvalidArgument(_) => None,
            AppError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        AppError::Import(value)
    }
}

impl From<SyncError> for AppError {
    fn from(value: SyncError) -> Self {
        AppError::Sync(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<ParseContactStatusError> for AppError {
    fn from(value: ParseContactStatusError) -> Self {
        AppError::InvalidArgument(value.to_string())
    }
}

impl From<ParseFrequencyChangeError> for AppError {
    fn from(value: ParseFrequencyChangeError) -> Self {
        AppError::InvalidArgument(value.to_string())
    }
}
