use std::{convert::Infallible, path::Path, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chat_relay_lib::{ChatRequest, RelayError, RelayService, LOG_TARGET};
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub struct ApiError(RelayError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RelayError::InvalidRequest => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        ApiError(err)
    }
}

/// `/api/*` endpoints plus the static UI from `static_dir`.
pub fn app(service: Arc<RelayService>, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .layer(cors)
        .with_state(service);

    Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// A body that is not JSON, or not an object with a string `message`, is
/// treated the same as an empty message.
fn chat_request(payload: Result<Json<ChatRequest>, JsonRejection>) -> ChatRequest {
    match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(target: LOG_TARGET, "unreadable chat body: {rejection}");
            ChatRequest::default()
        }
    }
}

async fn chat(
    State(service): State<Arc<RelayService>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = chat_request(payload);
    let message = request.validated()?;

    match service.reply(message).await {
        Ok(reply) => Ok(Json(json!({ "reply": reply }))),
        Err(err) => {
            tracing::error!(target: LOG_TARGET, "chat failed: {err}");
            Err(err.into())
        }
    }
}

async fn chat_stream(
    State(service): State<Arc<RelayService>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let request = chat_request(payload);
    let message = request.validated()?.to_string();

    let events = service
        .reply_stream(message)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.data())));

    Ok(Sse::new(events))
}
