use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::brackets::BracketError;

pub type JsonResponse<T> = Result<Json<T>, BracketError>;

impl BracketError {
    pub fn status(&self) -> StatusCode {
        match self {
            BracketError::Validation(_) => StatusCode::BAD_REQUEST,
            BracketError::NotFound(_) => StatusCode::NOT_FOUND,
            BracketError::InvariantViolation(_) => StatusCode::CONFLICT,
            BracketError::Database(_)
            | BracketError::Pool(_)
            | BracketError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BracketError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            // details stay in the logs
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
