use serde::Deserialize;
use tracing::debug;

use crate::backend::Generator;
use crate::error::GeneratorError;
use crate::event::{FinishReason, GenerationEvent};
use crate::options::GenerateOptions;
use crate::request::{ChatRole, GenerationRequest};
use crate::stream::EventStream;

// ─── DirectGenerator ──────────────────────────────────────────────────────

/// Model-direct generation backend.
///
/// Makes a single completion call per turn and parses the reply text into
/// path-annotated fenced file blocks, which are emitted as `file_create`
/// events. No multi-turn agency: one request, one reply, one `complete`.
pub struct DirectGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: Vec<CompletionBlock>,
}

#[derive(Deserialize)]
struct CompletionBlock {
    #[serde(default)]
    text: String,
}

impl DirectGenerator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

impl Generator for DirectGenerator {
    fn generate(&self, request: &GenerationRequest, opts: GenerateOptions) -> EventStream {
        let (tx, stream) = EventStream::channel();

        let client = self.client.clone();
        let url = self.endpoint();
        let api_key = self.api_key.clone();
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 64000,
            "system": opts
                .system_prompt
                .clone()
                .unwrap_or_else(|| request.render_system_prompt()),
            "messages": build_messages(request),
        });
        let cancel = opts.cancel.clone();

        tokio::spawn(async move {
            let mut req = client.post(&url).json(&body);
            if let Some(key) = &api_key {
                req = req.header("x-api-key", key);
            }

            let resp = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("direct generation cancelled before completion");
                    return;
                }
                resp = req.send() => resp,
            };

            let reply = match async { resp?.error_for_status()?.json::<CompletionResponse>().await }
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(Err(GeneratorError::Http(e))).await;
                    return;
                }
            };

            let text: String = reply.content.into_iter().map(|b| b.text).collect();
            for event in parse_reply(&text) {
                if tx.send(Ok(event)).await.is_err() {
                    return;
                }
            }
        });

        stream
    }
}

/// Build the completion messages array: recent conversation rows first
/// (the API only accepts user/assistant roles, so system rows are
/// dropped), then the rendered prompt as the final user message.
fn build_messages(request: &GenerationRequest) -> Vec<serde_json::Value> {
    let mut messages: Vec<serde_json::Value> = request
        .history
        .iter()
        .filter_map(|msg| {
            let role = match msg.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
                ChatRole::System => return None,
            };
            Some(serde_json::json!({ "role": role, "content": msg.content }))
        })
        .collect();
    messages.push(serde_json::json!({ "role": "user", "content": request.render_prompt() }));
    messages
}

// ─── Reply parsing ────────────────────────────────────────────────────────

/// Split a model reply into generation events: prose becomes one
/// `explanation`, each ` ```lang path=... ` fenced block becomes one
/// `file_create`, and the sequence is closed with `complete`.
fn parse_reply(text: &str) -> Vec<GenerationEvent> {
    let mut events = Vec::new();
    let mut prose = String::new();

    let mut rest = text;
    while let Some(open) = rest.find("```") {
        prose.push_str(&rest[..open]);
        let after_fence = &rest[open + 3..];

        let (info, body_and_rest) = match after_fence.split_once('\n') {
            Some(parts) => parts,
            None => {
                // Dangling fence at EOF — treat as prose.
                prose.push_str(&rest[open..]);
                rest = "";
                break;
            }
        };

        let (body, remainder) = match body_and_rest.find("\n```") {
            Some(close) => (
                &body_and_rest[..close],
                body_and_rest[close + 4..].trim_start_matches('\n'),
            ),
            None => (body_and_rest, ""),
        };

        match block_path(info) {
            Some(path) => events.push(GenerationEvent::FileCreate {
                path,
                content: body.to_owned(),
            }),
            // A fenced block without a path annotation is illustrative
            // code, not a file — keep it in the prose.
            None => {
                prose.push_str("```");
                prose.push_str(info);
                prose.push('\n');
                prose.push_str(body);
                prose.push_str("\n```");
            }
        }

        rest = remainder;
    }
    prose.push_str(rest);

    let prose = prose.trim().to_owned();
    if !prose.is_empty() {
        events.insert(0, GenerationEvent::Explanation { text: prose });
    }

    events.push(GenerationEvent::Complete {
        text: "Website generation complete!".to_owned(),
        finish_reason: FinishReason::Stop,
    });
    events
}

/// Extract the `path=` annotation from a fence info string like
/// `tsx path=app/page.tsx`.
fn block_path(info: &str) -> Option<String> {
    info.split_whitespace()
        .find_map(|tok| tok.strip_prefix("path="))
        .map(str::to_owned)
}

// ─── Tests ────────────────────────────────────────────────────────────────
