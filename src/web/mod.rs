use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::{App, AppError};

mod error;
mod extract;
mod handlers;

pub use error::ApiError;

/// Shared by every handler; all requests act as `owner_id`.
#[derive(Clone)]
pub struct WebState {
    app: Arc<Mutex<App>>,
    owner_id: i64,
}

impl WebState {
    pub fn new(app: App, owner_id: i64) -> Self {
        Self {
            app: Arc::new(Mutex::new(app)),
            owner_id,
        }
    }

    /// Runs `op` against the locked app as the owner.
    fn with_app<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&App, i64) -> Result<T, AppError>,
    {
        let app = self.app.lock().map_err(|_| ApiError::poisoned())?;
        Ok(op(&app, self.owner_id)?)
    }
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::dashboard))
        .route(
            "/contacts",
            get(handlers::list_contacts).post(handlers::create_contact),
        )
        .route(
            "/contacts/:id",
            get(handlers::contact_detail)
                .patch(handlers::update_contact)
                .delete(handlers::delete_contact),
        )
        .route("/contacts/:id/add-touchpoint", post(handlers::add_touchpoint))
        .route(
            "/contacts/:id/change-frequency/:method",
            post(handlers::change_frequency),
        )
        .route(
            "/contacts/:id/emails",
            get(handlers::list_emails).post(handlers::add_email),
        )
        .route("/emails/:id", delete(handlers::delete_email))
        .route("/contacts/:id/phones", post(handlers::add_phone))
        .route("/phones/:id", delete(handlers::delete_phone))
        .route(
            "/interactions",
            get(handlers::list_interactions).post(handlers::create_interaction),
        )
        .route("/interaction-types", get(handlers::interaction_types))
        .route("/import/csv", post(handlers::import_csv))
        .route("/import/trello", post(handlers::import_trello))
        .route("/settings", get(handlers::settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: WebState, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}
