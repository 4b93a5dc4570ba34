//! Mapping of questionnaire errors onto HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use services::QuestionnaireError;

/// Error returned by every API handler.
#[derive(Debug)]
pub enum ApiError {
    /// The client sent a session id that does not parse; treated like an unknown session.
    MalformedSessionId(String),
    /// The request body could not be read as the expected JSON.
    InvalidBody { status: StatusCode, message: String },
    Questionnaire(QuestionnaireError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QuestionnaireError> for ApiError {
    fn from(err: QuestionnaireError) -> Self {
        Self::Questionnaire(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MalformedSessionId(_)
            | Self::Questionnaire(QuestionnaireError::SessionNotFound(_)) => {
                (StatusCode::NOT_FOUND, "session_not_found")
            }
            Self::InvalidBody { status, .. } => (*status, "invalid_body"),
            Self::Questionnaire(QuestionnaireError::NoMoreQuestions { .. }) => {
                (StatusCode::CONFLICT, "no_more_questions")
            }
            Self::Questionnaire(QuestionnaireError::InvalidAnswer(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_answer")
            }
            Self::Questionnaire(err) if err.is_retryable() => {
                (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
            }
            Self::Questionnaire(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::MalformedSessionId(raw) => format!("session {raw:?} not found"),
            Self::InvalidBody { message, .. } => message.clone(),
            Self::Questionnaire(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self.message(), "request failed");
        } else {
            tracing::debug!(error = %self.message(), code, "request rejected");
        }
        let body = ErrorBody {
            error: code,
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}
