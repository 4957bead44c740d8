use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::{
    persist::{PersistError, files::SelectionError},
    validate::{TrailRejection, ValidationError},
};

/// Request-boundary failures and the status each maps to.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed")]
    AuthFailure,
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("schema violation: {0}")]
    Schema(#[from] ValidationError),
    #[error("bad plot parameters: {0}")]
    BadParams(#[from] SelectionError),
    #[error("not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Storage(#[from] PersistError),
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl From<TrailRejection> for ApiError {
    fn from(value: TrailRejection) -> Self {
        match value {
            TrailRejection::Malformed(err) => Self::Malformed(err.to_string()),
            TrailRejection::Schema(err) => Self::Schema(err),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Unexpected(value.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthFailure => StatusCode::FORBIDDEN,
            Self::Malformed(_) | Self::Schema(_) | Self::BadParams(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Storage(err) => {
                error!(%err, "storage failure");
                "internal server error".to_string()
            }
            Self::Unexpected(msg) => {
                error!(%msg, "unexpected failure");
                "internal server error".to_string()
            }
            Self::Malformed(_) | Self::Schema(_) | Self::BadParams(_) => {
                warn!(error = %self, "rejected request");
                self.to_string()
            }
            Self::AuthFailure | Self::NotFound => self.to_string(),
        };
        (status, body).into_response()
    }
}
