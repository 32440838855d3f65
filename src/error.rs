use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::models::ErrorBody;

pub type Result<T> = std::result::Result<T, GiftAdvisorError>;

#[derive(Debug, Error)]
pub enum GiftAdvisorError {
    #[error("Query is required")]
    MissingQuery,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Invalid response format: expected 3 recommendations, found {found}")]
    InvalidFormat { found: usize },

    #[error("Invalid section format in recommendation {index}: {reason}")]
    InvalidSectionFormat { index: usize, reason: String },

    #[error("Invalid final response format in recommendation {index}: {reason}")]
    InvalidFinalFormat { index: usize, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GiftAdvisorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingQuery => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body sent back to the browser. Client errors carry only `error`;
    /// everything else keeps the message in `details` for the error panel.
    pub fn to_body(&self) -> ErrorBody {
        match self {
            Self::MissingQuery => ErrorBody {
                error: self.to_string(),
                details: None,
            },
            Self::Configuration(_) => ErrorBody {
                error: "API key configuration error".to_string(),
                details: Some(self.to_string()),
            },
            _ => ErrorBody {
                error: "Failed to get recommendations".to_string(),
                details: Some(self.to_string()),
            },
        }
    }
}

impl IntoResponse for GiftAdvisorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Recommendation request failed");
        } else {
            tracing::warn!(error = %self, "Rejected recommendation request");
        }
        (status, Json(self.to_body())).into_response()
    }
}
