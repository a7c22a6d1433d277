use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::GoogleConfig;

use super::errors::SyncError;
use super::store::GoogleCredential;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// The subset of Gmail v1 and Calendar v3 the sync jobs read.
pub trait GoogleApi {
    fn list_messages(&mut self, page_token: Option<&str>) -> Result<MessageList, SyncError>;
    /// Message in `format=metadata`, as raw JSON so it can be cached verbatim.
    fn get_message(&mut self, id: &str) -> Result<Value, SyncError>;
    fn list_events(&mut self, page_token: Option<&str>) -> Result<EventList, SyncError>;
    fn refresh(&mut self, refresh_token: &str) -> Result<TokenGrant, SyncError>;
    /// A grant obtained since the last call, so the caller can persist it.
    fn take_refreshed_token(&mut self) -> Option<TokenGrant>;
}

pub struct HttpGoogleApi {
    http: Client,
    config: GoogleConfig,
    access_token: String,
    refresh_token: Option<String>,
    refreshed: Option<TokenGrant>,
}

impl HttpGoogleApi {
    pub fn new(config: &GoogleConfig, credential: &GoogleCredential) -> Result<Self, SyncError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            config: config.clone(),
            access_token: credential.access_token.clone(),
            refresh_token: credential.refresh_token.clone(),
            refreshed: None,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Sends the request built by `build`; a 401 refreshes the token once and retries.
    fn get_json<T, F>(&mut self, build: F) -> Result<T, SyncError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = build(&self.http).bearer_auth(&self.access_token).send()?;
        let response = if response.status() == StatusCode::UNAUTHORIZED {
            let Some(refresh_token) = self.refresh_token.clone() else {
                return Err(SyncError::Auth(
                    "access token rejected and no refresh token is stored".to_string(),
                ));
            };
            let grant = self.refresh(&refresh_token)?;
            self.access_token = grant.access_token.clone();
            self.refreshed = Some(grant);
            build(&self.http).bearer_auth(&self.access_token).send()?
        } else {
            response
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            error!(status = status.as_u16(), "google API error");
            return Err(SyncError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json()?)
    }
}

impl GoogleApi for HttpGoogleApi {
    fn list_messages(&mut self, page_token: Option<&str>) -> Result<MessageList, SyncError> {
        let url = self.url("gmail/v1/users/me/messages");
        let page_size = self.config.page_size.to_string();
        let page_token = page_token.map(str::to_string);
        debug!(page_token = ?page_token, "listing gmail messages");
        self.get_json(|http| {
            let request = http.get(&url).query(&[("maxResults", page_size.as_str())]);
            match page_token.as_deref() {
                Some(token) => request.query(&[("pageToken", token)]),
                None => request,
            }
        })
    }

    fn get_message(&mut self, id: &str) -> Result<Value, SyncError> {
        let url = self.url(&format!("gmail/v1/users/me/messages/{}", id));
        self.get_json(|http| http.get(&url).query(&[("format", "metadata")]))
    }

    fn list_events(&mut self, page_token: Option<&str>) -> Result<EventList, SyncError> {
        let url = self.url("calendar/v3/calendars/primary/events");
        let page_size = self.config.calendar_page_size.to_string();
        let page_token = page_token.map(str::to_string);
        debug!(page_token = ?page_token, "listing calendar events");
        self.get_json(|http| {
            let request = http.get(&url).query(&[("maxResults", page_size.as_str())]);
            match page_token.as_deref() {
                Some(token) => request.query(&[("pageToken", token)]),
                None => request,
            }
        })
    }

    fn refresh(&mut self, refresh_token: &str) -> Result<TokenGrant, SyncError> {
        let (Some(client_id), Some(client_secret)) = (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
        ) else {
            return Err(SyncError::MissingCredentials(
                "google.client_id and google.client_secret are required to refresh tokens"
                    .to_string(),
            ));
        };
        let response = self
            .http
            .post(&self.config.token_uri)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::Auth(format!(
                "token refresh returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(response.json()?)
    }

    fn take_refreshed_token(&mut self) -> Option<TokenGrant> {
        self.refreshed.take()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
