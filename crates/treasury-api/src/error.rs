//! Error types for treasury-api

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use treasury_core::CoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Tab '{tab}' is not available")]
    Forbidden { tab: String },

    #[error("HTTP client error: {message}")]
    Client { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Internal server error")]
    InternalError,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::Core(CoreError::RecordNotFound { .. } | CoreError::UnknownColumn { .. }) => StatusCode::NOT_FOUND,
            ApiError::Core(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Client { .. } | ApiError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest { message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!(target: "treasury::http", "{}", self);
        } else {
            log::debug!(target: "treasury::http", "{}: {}", status, self);
        }
        let body = format!(
            "<div class='bg-red-50 border border-red-200 rounded-lg p-4 text-red-700'>{}</div>",
            treasury_utils::escape_html(&self.to_string())
        );
        (status, Html(body)).into_response()
    }
}
