//! HTTP route handlers for the questionnaire API.

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::Value;
use services::{IssuedQuestion, SessionProgress};
use slinky_core::model::{Answer, SessionId};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the full application router: `/api` routes plus CORS and request tracing.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/start", get(start))
        .route("/response", post(response))
        .route("/restore", get(restore))
        .route("/answers", get(answers))
        .route("/progress", get(progress))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId", default)]
    session_id: String,
}

impl SessionQuery {
    fn parse(&self) -> Result<SessionId, ApiError> {
        parse_session_id(&self.session_id)
    }
}

fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::MalformedSessionId(raw.to_owned()))
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(rename = "sessionId")]
    session_id: String,
    name: String,
    #[serde(default)]
    value: Value,
}

/// Answers are stored as text; structured values are kept as their JSON encoding.
fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// GET /api/start - create a session and return its first question.
async fn start(State(state): State<AppState>) -> Result<Json<IssuedQuestion>, ApiError> {
    let issued = state.controller.start().await?;
    Ok(Json(issued))
}

/// POST /api/response - record an answer and return the next question.
async fn response(
    State(state): State<AppState>,
    body: Result<Json<ResponseBody>, JsonRejection>,
) -> Result<Json<IssuedQuestion>, ApiError> {
    let Json(body) = body?;
    let id = parse_session_id(&body.session_id)?;
    let issued = state
        .controller
        .submit(id, &body.name, &value_as_text(&body.value))
        .await?;
    Ok(Json(issued))
}

/// GET /api/restore?sessionId= - return the most recently issued question.
async fn restore(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<IssuedQuestion>, ApiError> {
    let issued = state.controller.resume(query.parse()?).await?;
    Ok(Json(issued))
}

/// GET /api/answers?sessionId= - every answer recorded for the session, oldest first.
async fn answers(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<Answer>>, ApiError> {
    let answers = state.controller.list_answers(query.parse()?).await?;
    Ok(Json(answers))
}

/// GET /api/progress?sessionId= - how far the session has got.
async fn progress(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionProgress>, ApiError> {
    let progress = state.controller.progress(query.parse()?).await?;
    Ok(Json(progress))
}
