mod calendar;
mod client;
mod errors;
mod gmail;
mod service;
mod store;
#[cfg(test)]
mod tests;

pub use client::HttpGoogleApi;
pub use errors::SyncError;
pub use service::{sync_all, sync_user, SyncSummary};
pub use store::{get_credentials, store_credentials, GoogleCredential};
