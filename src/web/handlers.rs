use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::{
    ContactDetail, ContactList, ContactPatch, ContactView, DashboardView, EmailView,
    InteractionTypeView, InteractionView, NewContact, NewInteraction, PhoneView, SettingsView,
};
use crate::imports::{CsvImportOptions, ImportSummary};

use super::extract::{ApiJson, ApiPath, ApiQuery, ApiText};
use super::{ApiError, WebState};

type ApiResult<T> = Result<Json<T>, ApiError>;
type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct ContactQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailInput {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PhoneInput {
    pub number: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CsvImportQuery {
    pub name_column: Option<String>,
    pub email_column: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DryRunQuery {
    #[serde(default)]
    pub dry_run: bool,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn dashboard(State(state): State<WebState>) -> ApiResult<DashboardView> {
    state.with_app(|app, user| app.dashboard(user)).map(Json)
}

pub async fn list_contacts(
    State(state): State<WebState>,
    ApiQuery(query): ApiQuery<ContactQuery>,
) -> ApiResult<ContactList> {
    state
        .with_app(|app, user| app.list_contacts_by_status(user, query.status.as_deref()))
        .map(Json)
}

pub async fn create_contact(
    State(state): State<WebState>,
    ApiJson(input): ApiJson<NewContact>,
) -> Created<ContactView> {
    let contact = state.with_app(|app, user| app.create_contact(user, input))?;
    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn contact_detail(
    State(state): State<WebState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ContactDetail> {
    state.with_app(|app, user| app.contact_detail(user, id)).map(Json)
}

pub async fn update_contact(
    State(state): State<WebState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<ContactPatch>,
) -> ApiResult<ContactView> {
    state
        .with_app(|app, user| app.update_contact(user, id, patch))
        .map(Json)
}

pub async fn delete_contact(
    State(state): State<WebState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.with_app(|app, user| app.delete_contact(user, id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_touchpoint(
    State(state): State<WebState>,
    ApiPath(id): ApiPath<i64>,
) -> Created<InteractionView> {
    let interaction = state.with_app(|app, user| app.add_touchpoint(user, id))?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

pub async fn change_frequency(
    State(state): State<WebState>,
    ApiPath((id, method)): ApiPath<(i64, String)>,
) -> ApiResult<ContactView> {
    state
        .with_app(|app, user| app.change_frequency(user, id, &method))
        .map(Json)
}

pub async fn list_emails(
    State(state): State<WebState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Vec<EmailView>> {
    state.with_app(|app, user| app.list_emails(user, id)).map(Json)
}

pub async fn add_email(
    State(state): State<WebState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<EmailInput>,
) -> Created<EmailView> {
    let email = state.with_app(|app, user| app.add_email(user, id, &input.email))?;
    Ok((StatusCode::CREATED, Json(email)))
}

pub async fn delete_email(
    State(state): State<WebState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<EmailView> {
    state.with_app(|app, user| app.delete_email(user, id)).map(Json)
}

pub async fn add_phone(
    State(state): State<WebState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<PhoneInput>,
) -> Created<PhoneView> {
    let phone = state.with_app(|app, user| {
        app.add_phone(user, id, &input.number, input.label.as_deref())
    })?;
    Ok((StatusCode::CREATED, Json(phone)))
}

pub async fn delete_phone(
    State(state): State<WebState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<PhoneView> {
    state.with_app(|app, user| app.delete_phone(user, id)).map(Json)
}

pub async fn list_interactions(State(state): State<WebState>) -> ApiResult<Vec<InteractionView>> {
    state.with_app(|app, user| app.list_interactions(user)).map(Json)
}

pub async fn create_interaction(
    State(state): State<WebState>,
    ApiJson(input): ApiJson<NewInteraction>,
) -> Created<InteractionView> {
    let interaction = state.with_app(|app, user| app.create_interaction(user, input))?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

pub async fn interaction_types(State(state): State<WebState>) -> ApiResult<Vec<InteractionTypeView>> {
    state.with_app(|app, _| app.list_interaction_types()).map(Json)
}

pub async fn import_csv(
    State(state): State<WebState>,
    ApiQuery(query): ApiQuery<CsvImportQuery>,
    ApiText(body): ApiText,
) -> ApiResult<ImportSummary> {
    let defaults = CsvImportOptions::default();
    let options = CsvImportOptions {
        name_column: query.name_column.unwrap_or(defaults.name_column),
        email_column: query.email_column.unwrap_or(defaults.email_column),
        dry_run: query.dry_run,
    };
    state
        .with_app(|app, user| app.import_csv_upload(user, &body, &options))
        .map(Json)
}

pub async fn import_trello(
    State(state): State<WebState>,
    ApiQuery(query): ApiQuery<DryRunQuery>,
    ApiText(body): ApiText,
) -> ApiResult<ImportSummary> {
    state
        .with_app(|app, user| app.import_trello_upload(user, &body, query.dry_run))
        .map(Json)
}

pub async fn settings(State(state): State<WebState>) -> ApiResult<SettingsView> {
    state.with_app(|app, user| app.settings(user)).map(Json)
}
