use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tracing::info;

use sitegen::CancelToken;

use crate::{error::ApiError, orchestrator, state::AppState};

const APP_ID_HEADER: &str = "x-app-id";

// ---------------------------------------------------------------------------
// Request body
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ChatBody {
    message: IncomingMessage,
}

#[derive(Deserialize)]
struct IncomingMessage {
    #[serde(default)]
    #[allow(dead_code)]
    role: Option<String>,
    content: MessageContent,
}

/// Message content arrives either as a plain string or as an array of
/// `{text}` parts; parts are flattened by concatenation.
#[derive(Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

#[derive(Deserialize)]
struct MessagePart {
    #[serde(default)]
    text: String,
}

impl MessageContent {
    fn flatten(self) -> String {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Parts(parts) => parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

fn require_app_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(APP_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ApiError::bad_request("Missing App Id header"))
}

// ---------------------------------------------------------------------------
// POST /chat — start a generation stream
// ---------------------------------------------------------------------------

pub async fn post_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatBody>,
) -> Result<Response, ApiError> {
    let app_id = require_app_id(&headers)?;
    let app = state
        .apps
        .get(&app_id)
        .await
        .ok_or_else(|| ApiError::not_found("App not found"))?;

    let prompt = body.message.content.flatten();
    info!(app_id = %app_id, "chat request received");

    let cancel = CancelToken::new();
    let (token, sender) = state.streams.claim(&app_id, &prompt, cancel.clone()).await;
    // Subscribe before the producer starts so no frame is missed.
    let rx = sender.subscribe();

    tokio::spawn(orchestrator::run_generation(
        state.clone(),
        app,
        prompt,
        cancel,
        token,
        sender,
    ));

    // Hand-built SSE framing: each protocol message is one `data:` frame.
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        msg.ok()
            .and_then(|m| serde_json::to_string(&m).ok())
            .map(|json| Ok::<_, Infallible>(Bytes::from(format!("data: {json}\n\n"))))
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(stream))
        .map_err(anyhow::Error::from)?;
    Ok(response)
}

// ---------------------------------------------------------------------------
// GET /chat — inspect the active stream
// ---------------------------------------------------------------------------

pub async fn get_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let app_id = require_app_id(&headers)?;

    let stream = state
        .streams
        .prompt(&app_id)
        .await
        .map(|prompt| serde_json::json!({ "prompt": prompt }));
    Ok(Json(serde_json::json!({ "stream": stream })))
}
