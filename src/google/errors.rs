use std::error::Error;
use std::fmt;

use crate::domain::email::HeaderParseError;

#[derive(Debug)]
pub enum SyncError {
    Http(reqwest::Error),
    Db(rusqlite::Error),
    Json(serde_json::Error),
    Api { status: u16, body: String },
    MissingCredentials(String),
    Auth(String),
    Parse(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Http(err) => write!(f, "google request failed: {}", err),
            SyncError::Db(err) => write!(f, "database error: {}", err),
            SyncError::Json(err) => write!(f, "google payload is not valid JSON: {}", err),
            SyncError::Api { status, body } => {
                write!(f, "google API returned HTTP {}: {}", status, body)
            }
            SyncError::MissingCredentials(message) => {
                write!(f, "missing google credentials: {}", message)
            }
            SyncError::Auth(message) => write!(f, "google authorization failed: {}", message),
            SyncError::Parse(message) => write!(f, "unexpected google payload: {}", message),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SyncError::Http(err) => Some(err),
            SyncError::Db(err) => Some(err),
            SyncError::Json(err) => Some(err),
            SyncError::Api { .. }
            | SyncError::MissingCredentials(_)
            | SyncError::Auth(_)
            | SyncError::Parse(_) => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(value: reqwest::Error) -> Self {
        SyncError::Http(value)
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(value: rusqlite::Error) -> Self {
        SyncError::Db(value)
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(value: serde_json::Error) -> Self {
        SyncError::Json(value)
    }
}

impl From<HeaderParseError> for SyncError {
    fn from(value: HeaderParseError) -> Self {
        SyncError::Parse(value.to_string())
    }
}
