use std::path::Path;

use serde::Deserialize;

use super::errors::ImportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Trello,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Trello => "trello",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvContactRow {
    pub line: u64,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrelloBoard {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cards: Vec<TrelloCard>,
    #[serde(default)]
    pub actions: Vec<TrelloAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrelloCard {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrelloAction {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub data: TrelloActionData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrelloActionData {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub card: Option<TrelloCardRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrelloCardRef {
    pub id: String,
}

pub const TRELLO_COMMENT_ACTION: &str = "commentCard";

pub fn normalize_path(raw: &str) -> Result<String, ImportError> {
    let path = Path::new(raw);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let normalized = if absolute.exists() {
        absolute.canonicalize().unwrap_or(absolute)
    } else {
        absolute
    };
    Ok(normalized.to_string_lossy().to_string())
}

pub fn normalize_non_empty(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Rows that fail to parse come back as `Err` so the caller can count them and move on.
pub fn read_csv_rows(
    content: &str,
    name_column: &str,
    email_column: &str,
) -> Result<Vec<Result<CsvContactRow, ImportError>>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();
    let find = |column: &str| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(column.trim()))
            .ok_or_else(|| ImportError::MissingColumn(column.to_string()))
    };
    let name_index = find(name_column)?;
    let email_index = find(email_column)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        // header is line 1
        let line = index as u64 + 2;
        let row = record.map_err(ImportError::from).map(|record| CsvContactRow {
            line,
            name: normalize_non_empty(record.get(name_index)),
            email: normalize_non_empty(record.get(email_index)),
        });
        rows.push(row);
    }
    Ok(rows)
}

pub fn parse_trello_board(content: &str) -> Result<TrelloBoard, ImportError> {
    Ok(serde_json::from_str(content)?)
}
