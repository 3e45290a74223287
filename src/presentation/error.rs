// HTTP error mapping
use crate::application::error::ServiceError;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("{message}")]
    Internal { message: String, source: anyhow::Error },
}

impl ApiError {
    pub fn internal(message: &str, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.to_string(),
            source: source.into(),
        }
    }

    /// Replace the generic message of a server-side failure
    pub fn context(self, message: &str) -> Self {
        match self {
            Self::Internal { source, .. } => Self::internal(message, source),
            other => other,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Rejected { status, .. } => *status,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => Self::NotFound(message),
            ServiceError::Invalid(message) => Self::BadRequest(message),
            ServiceError::Store(source) => Self::internal("Internal server error", source),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Rejected {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal { message, source } = &self {
            tracing::error!("{}: {:#}", message, source);
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Unwrap a JSON body, reporting any rejection as `Invalid <entity> data`
pub fn parse_body<T>(payload: Result<Json<T>, JsonRejection>, entity: &str) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!("Rejected {} body: {}", entity, rejection.body_text());
            Err(ApiError::BadRequest(format!("Invalid {} data", entity)))
        }
    }
}
