use std::collections::HashMap;

use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::{self, InsertContact, InsertInteraction};
use crate::domain::email::normalize_email;
use crate::domain::timestamp::{format_timestamp, now_utc_rfc3339, parse_timestamp};

use super::errors::ImportError;
use super::source::{
    normalize_non_empty, normalize_path, parse_trello_board, read_csv_rows, CsvContactRow,
    SourceKind, TrelloAction, TrelloCard, TRELLO_COMMENT_ACTION,
};
use super::store::{
    fingerprint, fingerprint_record, insert_fingerprint, list_statuses, record_run, source_key,
    ImportRun, ImportStatus,
};

pub const UPLOAD_SOURCE_REF: &str = "upload";
pub const TRELLO_COMMENT_TITLE: &str = "Trello comment";

pub struct ImportService<'a> {
    conn: &'a Connection,
    default_frequency_days: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub source_type: String,
    pub source_ref: String,
    pub status: String,
    pub processed_count: u64,
    pub imported_count: u64,
    pub skipped_count: u64,
    pub error_count: u64,
    pub checkpoint: Option<String>,
    pub last_error: Option<String>,
    pub dry_run: bool,
    pub last_run_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvImportOptions {
    pub name_column: String,
    pub email_column: String,
    pub dry_run: bool,
}

impl Default for CsvImportOptions {
    fn default() -> Self {
        Self {
            name_column: "name".to_string(),
            email_column: "email".to_string(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Imported,
    Skipped,
}

struct RunTarget<'s> {
    user_id: i64,
    kind: SourceKind,
    source_ref: &'s str,
    source_key: String,
    dry_run: bool,
}

impl<'a> ImportService<'a> {
    pub fn new(conn: &'a Connection, default_frequency_days: i64) -> Self {
        Self {
            conn,
            default_frequency_days,
        }
    }

    pub fn import_csv_file(
        &self,
        user_id: i64,
        file: &str,
        options: &CsvImportOptions,
    ) -> Result<ImportSummary, ImportError> {
        let source_ref = normalize_path(file)?;
        let content = std::fs::read_to_string(&source_ref)?;
        self.import_csv(user_id, &source_ref, &content, options)
    }

    pub fn import_csv(
        &self,
        user_id: i64,
        source_ref: &str,
        content: &str,
        options: &CsvImportOptions,
    ) -> Result<ImportSummary, ImportError> {
        let target = RunTarget {
            user_id,
            kind: SourceKind::Csv,
            source_ref,
            source_key: source_key(SourceKind::Csv.as_str(), user_id, source_ref),
            dry_run: options.dry_run,
        };
        let mut run = ImportRun::new();
        let rows = match read_csv_rows(content, &options.name_column, &options.email_column) {
            Ok(rows) => rows,
            Err(err) => {
                run.last_error = Some(err.to_string());
                return self.finish_run(&target, run, "failed", Err(err));
            }
        };

        for row in rows {
            run.processed_count += 1;
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    run.error_count += 1;
                    run.last_error = Some(err.to_string());
                    continue;
                }
            };
            run.checkpoint = Some(row.line.to_string());
            let line = row.line;
            match self.import_csv_row(&target, row) {
                Ok(Outcome::Imported) => run.imported_count += 1,
                Ok(Outcome::Skipped) => run.skipped_count += 1,
                Err(ImportError::InvalidRecord(message)) => {
                    run.error_count += 1;
                    run.last_error = Some(format!("line {}: {}", line, message));
                }
                Err(err) => {
                    run.last_error = Some(format!("line {}: {}", line, err));
                    return self.finish_run(&target, run, "failed", Err(err));
                }
            }
        }

        let status = run.status(options.dry_run);
        self.finish_run(&target, run, status, Ok(()))
    }

    pub fn import_trello_file(
        &self,
        user_id: i64,
        file: &str,
        dry_run: bool,
    ) -> Result<ImportSummary, ImportError> {
        let source_ref = normalize_path(file)?;
        let content = std::fs::read_to_string(&source_ref)?;
        self.import_trello(user_id, &source_ref, &content, dry_run)
    }

    pub fn import_trello(
        &self,
        user_id: i64,
        source_ref: &str,
        content: &str,
        dry_run: bool,
    ) -> Result<ImportSummary, ImportError> {
        let target = RunTarget {
            user_id,
            kind: SourceKind::Trello,
            source_ref,
            source_key: source_key(SourceKind::Trello.as_str(), user_id, source_ref),
            dry_run,
        };
        let mut run = ImportRun::new();
        let board = match parse_trello_board(content) {
            Ok(board) => board,
            Err(err) => {
                run.last_error = Some(err.to_string());
                return self.finish_run(&target, run, "failed", Err(err));
            }
        };
        if let Some(name) = board.name.as_deref() {
            info!(board = name, cards = board.cards.len(), "importing trello board");
        }

        // card id -> contact id; `None` marks cards that a dry run would create
        let mut card_contacts: HashMap<String, Option<i64>> = HashMap::new();
        for (index, card) in board.cards.iter().enumerate() {
            run.processed_count += 1;
            run.checkpoint = Some(format!("card {}", index + 1));
            match self.import_trello_card(&target, card) {
                Ok((outcome, contact_id)) => {
                    if let Some(contact_id) = contact_id {
                        card_contacts.insert(card.id.clone(), contact_id);
                    }
                    match outcome {
                        Outcome::Imported => run.imported_count += 1,
                        Outcome::Skipped => run.skipped_count += 1,
                    }
                }
                Err(ImportError::InvalidRecord(message)) => {
                    run.error_count += 1;
                    run.last_error = Some(format!("card {}: {}", index + 1, message));
                }
                Err(err) => {
                    run.last_error = Some(format!("card {}: {}", index + 1, err));
                    return self.finish_run(&target, run, "failed", Err(err));
                }
            }
        }

        let comments = board
            .actions
            .iter()
            .filter(|action| action.action_type == TRELLO_COMMENT_ACTION);
        for (index, action) in comments.enumerate() {
            run.processed_count += 1;
            run.checkpoint = Some(format!("comment {}", index + 1));
            match self.import_trello_comment(&target, action, &card_contacts) {
                Ok(Outcome::Imported) => run.imported_count += 1,
                Ok(Outcome::Skipped) => run.skipped_count += 1,
                Err(ImportError::InvalidRecord(message)) => {
                    run.error_count += 1;
                    run.last_error = Some(format!("comment {}: {}", index + 1, message));
                }
                Err(err) => {
                    run.last_error = Some(format!("comment {}: {}", index + 1, err));
                    return self.finish_run(&target, run, "failed", Err(err));
                }
            }
        }

        let status = run.status(dry_run);
        self.finish_run(&target, run, status, Ok(()))
    }

    pub fn list_statuses(&self, user_id: i64) -> Result<Vec<ImportStatus>, ImportError> {
        Ok(list_statuses(self.conn, user_id)?)
    }

    fn import_csv_row(&self, target: &RunTarget<'_>, row: CsvContactRow) -> Result<Outcome, ImportError> {
        let email = match row.email.as_deref() {
            Some(raw) => Some(
                normalize_email(raw)
                    .ok_or_else(|| ImportError::InvalidRecord(format!("invalid email '{}'", raw)))?,
            ),
            None => None,
        };
        let name = match (row.name, email.as_deref()) {
            (Some(name), _) => name,
            (None, Some(email)) => email.to_string(),
            (None, None) => {
                return Err(ImportError::InvalidRecord(
                    "row requires a name or an email".to_string(),
                ));
            }
        };

        let action = "contact_create";
        let identity = format!("{}|{}", name.to_lowercase(), email.as_deref().unwrap_or(""));
        let token = fingerprint(&target.source_key, &identity, action);
        if fingerprint_record(self.conn, &token)?.is_some() {
            return Ok(Outcome::Skipped);
        }
        if let Some(email) = email.as_deref() {
            if db::find_contact_id_by_email(self.conn, target.user_id, email)?.is_some() {
                return Ok(Outcome::Skipped);
            }
        }
        if target.dry_run {
            return Ok(Outcome::Imported);
        }

        let created_at = now_utc_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let contact_id = db::insert_contact(
            &tx,
            &InsertContact {
                user_id: target.user_id,
                name: &name,
                description: "",
                frequency_in_days: Some(self.default_frequency_days),
                linkedin_url: None,
                twitter_url: None,
                created_at: &created_at,
            },
        )?;
        if let Some(email) = email.as_deref() {
            db::insert_email(&tx, contact_id, email, &created_at)?;
        }
        insert_fingerprint(&tx, &token, &target.source_key, &contact_id.to_string(), action)?;
        tx.commit()?;
        Ok(Outcome::Imported)
    }

    fn import_trello_card(
        &self,
        target: &RunTarget<'_>,
        card: &TrelloCard,
    ) -> Result<(Outcome, Option<Option<i64>>), ImportError> {
        if card.closed {
            return Ok((Outcome::Skipped, None));
        }
        let Some(name) = normalize_non_empty(Some(card.name.as_str())) else {
            return Err(ImportError::InvalidRecord(format!(
                "card '{}' has no name",
                card.id
            )));
        };

        let action = "card_contact";
        let token = fingerprint(&target.source_key, &card.id, action);
        if let Some(record_id) = fingerprint_record(self.conn, &token)? {
            // a contact deleted since the last run stays deleted, and its comments are skipped
            let existing = match record_id.parse::<i64>() {
                Ok(contact_id) => {
                    db::get_contact(self.conn, target.user_id, contact_id, &now_utc_rfc3339())?
                        .map(|contact| contact.id)
                }
                Err(_) => None,
            };
            return Ok((Outcome::Skipped, existing.map(Some)));
        }
        if target.dry_run {
            return Ok((Outcome::Imported, Some(None)));
        }

        let created_at = now_utc_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let contact_id = db::insert_contact(
            &tx,
            &InsertContact {
                user_id: target.user_id,
                name: &name,
                description: card.desc.trim(),
                frequency_in_days: Some(self.default_frequency_days),
                linkedin_url: None,
                twitter_url: None,
                created_at: &created_at,
            },
        )?;
        insert_fingerprint(&tx, &token, &target.source_key, &contact_id.to_string(), action)?;
        tx.commit()?;
        Ok((Outcome::Imported, Some(Some(contact_id))))
    }

    fn import_trello_comment(
        &self,
        target: &RunTarget<'_>,
        action: &TrelloAction,
        card_contacts: &HashMap<String, Option<i64>>,
    ) -> Result<Outcome, ImportError> {
        let Some(card_id) = action.data.card.as_ref().map(|card| card.id.as_str()) else {
            return Err(ImportError::InvalidRecord(
                "comment is not attached to a card".to_string(),
            ));
        };
        let Some(contact_id) = card_contacts.get(card_id).copied() else {
            // comment on a closed or unknown card
            return Ok(Outcome::Skipped);
        };
        let Some(text) = normalize_non_empty(action.data.text.as_deref()) else {
            return Err(ImportError::InvalidRecord("comment has no text".to_string()));
        };
        let was_at = action
            .date
            .as_deref()
            .and_then(parse_timestamp)
            .map(format_timestamp)
            .ok_or_else(|| ImportError::InvalidRecord("comment has no valid date".to_string()))?;

        let fingerprint_action = "comment_interaction";
        let identity = if action.id.is_empty() {
            format!("{}|{}|{}", card_id, was_at, text)
        } else {
            action.id.clone()
        };
        let token = fingerprint(&target.source_key, &identity, fingerprint_action);
        if fingerprint_record(self.conn, &token)?.is_some() {
            return Ok(Outcome::Skipped);
        }
        let Some(contact_id) = contact_id.filter(|_| !target.dry_run) else {
            return Ok(Outcome::Imported);
        };

        let tx = self.conn.unchecked_transaction()?;
        let interaction_id = db::insert_interaction(
            &tx,
            &InsertInteraction {
                user_id: target.user_id,
                type_key: Some("import"),
                title: TRELLO_COMMENT_TITLE,
                description: &text,
                was_at: &was_at,
                created_at: &now_utc_rfc3339(),
            },
        )?;
        db::link_contact(&tx, interaction_id, contact_id)?;
        insert_fingerprint(
            &tx,
            &token,
            &target.source_key,
            &interaction_id.to_string(),
            fingerprint_action,
        )?;
        tx.commit()?;
        Ok(Outcome::Imported)
    }

    fn finish_run(
        &self,
        target: &RunTarget<'_>,
        run: ImportRun,
        status: &str,
        result: Result<(), ImportError>,
    ) -> Result<ImportSummary, ImportError> {
        let last_run_at = record_run(
            self.conn,
            &target.source_key,
            target.user_id,
            target.kind.as_str(),
            target.source_ref,
            status,
            &run,
        )?;
        if let Err(err) = result {
            warn!(source = %target.source_key, error = %err, "import failed");
            return Err(err);
        }
        info!(
            source = %target.source_key,
            status,
            imported = run.imported_count,
            skipped = run.skipped_count,
            errors = run.error_count,
            "import finished"
        );
        Ok(ImportSummary {
            source_type: target.kind.as_str().to_string(),
            source_ref: target.source_ref.to_string(),
            status: status.to_string(),
            processed_count: run.processed_count,
            imported_count: run.imported_count,
            skipped_count: run.skipped_count,
            error_count: run.error_count,
            checkpoint: run.checkpoint,
            last_error: run.last_error,
            dry_run: target.dry_run,
            last_run_at,
        })
    }
}
