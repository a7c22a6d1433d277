use axum::extract::rejection::{
    JsonRejection, PathRejection, QueryRejection, StringRejection,
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::app::AppError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn poisoned() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "application state lock poisoned".to_string(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        let status = match &value {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Import(crate::imports::ImportError::InvalidRecord(_))
            | AppError::Import(crate::imports::ImportError::MissingColumn(_))
            | AppError::Import(crate::imports::ImportError::Csv(_))
            | AppError::Import(crate::imports::ImportError::Json(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %value, "request failed");
        }
        Self {
            status,
            message: value.to_string(),
        }
    }
}

macro_rules! from_rejection {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(value: $rejection) -> Self {
                    Self {
                        status: value.status(),
                        message: value.body_text(),
                    }
                }
            }
        )+
    };
}

from_rejection!(JsonRejection, QueryRejection, PathRejection, StringRejection);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
