mod errors;
mod service;
mod source;
mod store;

pub use errors::ImportError;
pub use service::{CsvImportOptions, ImportService, ImportSummary, UPLOAD_SOURCE_REF};
pub use store::{record_run, source_key, ImportRun, ImportStatus};
