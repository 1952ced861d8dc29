use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use yander_api_types::ErrorResponse;

use crate::{
    application::content::ContentError, config::LoadError, domain::submission::ValidationError,
    infra::error::InfraError,
};

/// Diagnostic chain attached to error responses for the response logger.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// An error response with a public `{ "error": .. }` body and a private report.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: String,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message: public_message.into(),
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message: public_message.into(),
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.public_message));
        let mut response = (self.status, body).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<ValidationError> for HttpError {
    fn from(error: ValidationError) -> Self {
        HttpError::from_error(
            "infra::http::validation_error_to_http_error",
            StatusCode::BAD_REQUEST,
            error.to_string(),
            &error,
        )
    }
}

impl From<ContentError> for HttpError {
    fn from(error: ContentError) -> Self {
        const SOURCE: &str = "infra::http::content_error_to_http_error";
        match &error {
            ContentError::NotFound { .. } => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Not found", &error)
            }
            ContentError::Unavailable => HttpError::from_error(
                SOURCE,
                StatusCode::SERVICE_UNAVAILABLE,
                "Content is temporarily unavailable",
                &error,
            ),
            ContentError::Transport(_) | ContentError::Decode(_) | ContentError::Schema(_) => {
                HttpError::from_error(
                    SOURCE,
                    StatusCode::BAD_GATEWAY,
                    "Content could not be loaded",
                    &error,
                )
            }
        }
    }
}

/// Fatal errors surfaced by the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
