use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
    InvalidRecord(String),
    MissingColumn(String),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "I/O error: {}", err),
            ImportError::Db(err) => write!(f, "database error: {}", err),
            ImportError::Json(err) => write!(f, "JSON parse error: {}", err),
            ImportError::Csv(err) => write!(f, "CSV parse error: {}", err),
            ImportError::InvalidRecord(message) => write!(f, "invalid source record: {}", message),
            ImportError::MissingColumn(column) => {
                write!(f, "CSV header has no '{}' column", column)
            }
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Db(err) => Some(err),
            ImportError::Json(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidRecord(_) => None,
            ImportError::MissingColumn(_) => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(value: std::io::Error) -> Self {
        ImportError::Io(value)
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(value: rusqlite::Error) -> Self {
        ImportError::Db(value)
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(value: serde_json::Error) -> Self {
        ImportError::Json(value)
    }
}

impl From<csv::Error> for ImportError {
    fn from(value: csv::Error) -> Self {
        ImportError::Csv(value)
    }
}
