use futures::StreamExt;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use sitegen::{
    CancelToken, ChatRole, FinishReason, GenerateOptions, GenerationEvent, HistoryMessage,
};

use crate::adapter::StreamAdapter;
use crate::apps::AppInfo;
use crate::bridge::FileBridge;
use crate::protocol::{ProtocolMessage, Role};
use crate::registry::ClaimToken;
use crate::state::AppState;
use crate::store::StoredMessage;

/// Default shared budget for continue and repair turns.
pub const DEFAULT_MAX_REPAIR_ATTEMPTS: u32 = 10;

/// Synthetic prompt when a turn stops mid-work with tool calls pending.
const CONTINUE_PROMPT: &str = "continue";

/// Synthetic prompt when the preview health check fails after a turn.
const REPAIR_PROMPT: &str = "The page returned an error. Please fix it.";

/// How many persisted rows a new turn carries as conversation context.
const HISTORY_WINDOW: usize = 10;

/// Load the most recent persisted rows for an app, oldest first, so a
/// follow-up prompt reaches the backend with its conversation context.
/// A store failure degrades to an empty history rather than blocking
/// the turn.
async fn recent_history(state: &AppState, app_id: &str) -> Vec<HistoryMessage> {
    let rows = match state.store.load_all(app_id).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(app_id = %app_id, error = %e, "failed to load conversation history");
            return Vec::new();
        }
    };
    let start = rows.len().saturating_sub(HISTORY_WINDOW);
    rows[start..]
        .iter()
        .map(|row| HistoryMessage {
            role: match row.role {
                Role::User => ChatRole::User,
                Role::Assistant => ChatRole::Assistant,
                Role::System => ChatRole::System,
            },
            content: row.content.clone(),
        })
        .collect()
}

// ─── Generation loop ──────────────────────────────────────────────────────

/// Drive one chat request to completion: provision the sandbox, run
/// generation turns through the adapter, broadcast protocol frames, and
/// re-enter with synthetic prompts while the shared attempt budget lasts.
///
/// The caller claims the registry slot and subscribes to `sender` before
/// spawning this; dropping `sender` at the end closes every subscriber's
/// stream. A cancelled token (set when a newer message displaces this
/// turn) stops the loop at the next event boundary.
pub async fn run_generation(
    state: AppState,
    app: AppInfo,
    prompt: String,
    cancel: CancelToken,
    token: ClaimToken,
    sender: broadcast::Sender<ProtocolMessage>,
) {
    info!(app_id = %app.id, "generation started");

    // Snapshot the context window before the new message lands, so the
    // prompt itself is not duplicated into its own history.
    let history = recent_history(&state, &app.id).await;

    // User message first so history reflects arrival order. Persistence is
    // at-least-once; a store failure never blocks the stream.
    if let Err(e) = state
        .store
        .append(&app.id, StoredMessage::new(Role::User, &prompt))
        .await
    {
        warn!(app_id = %app.id, error = %e, "failed to persist user message");
    }

    let dev = match state
        .sandbox
        .request_dev_server(&app.repo_id, &app.base_id)
        .await
    {
        Ok(dev) => dev,
        Err(e) => {
            error!(app_id = %app.id, error = %e, "dev server provisioning failed");
            let _ = sender.send(ProtocolMessage::assistant(
                "msg_0",
                format!("❌ Error: {e}"),
            ));
            state.streams.release(&app.id, token).await;
            return;
        }
    };

    let bridge = FileBridge::new(state.sandbox.tool_client(&dev));
    let mut adapter = StreamAdapter::new(bridge);
    let mut request = state.classifier.classify(&prompt);
    request.history = history;

    let mut attempts = 0u32;
    let mut current = request.clone();
    let mut skip_plan = false;

    'turns: loop {
        let opts = GenerateOptions {
            system_prompt: Some(request.render_system_prompt()),
            skip_plan,
            cancel: cancel.clone(),
            ..Default::default()
        };
        let mut stream = state.generator.generate(&current, opts);

        let mut turn_text: Vec<String> = Vec::new();
        let mut terminal: Option<FinishReason> = None;
        let mut failed = false;

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(app_id = %app.id, "turn displaced, stopping");
                    break 'turns;
                }
                item = stream.next() => item,
            };
            let Some(item) = item else { break };

            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    error!(app_id = %app.id, error = %e, "generation backend error");
                    failed = true;
                    GenerationEvent::Error { text: e.to_string() }
                }
            };
            if matches!(event, GenerationEvent::Error { .. }) {
                failed = true;
            }
            if let GenerationEvent::Complete { finish_reason, .. } = &event {
                terminal = Some(*finish_reason);
            }

            for message in adapter.adapt(event).await {
                if !message.content.is_empty() {
                    turn_text.push(message.content.clone());
                }
                let _ = sender.send(message);
            }

            if failed || terminal.is_some() {
                break;
            }
        }

        // One assistant row per completed turn, before the next turn
        // begins.
        if !turn_text.is_empty() {
            let row = StoredMessage::new(Role::Assistant, turn_text.join("\n\n"));
            if let Err(e) = state.store.append(&app.id, row).await {
                warn!(app_id = %app.id, error = %e, "failed to persist assistant turn");
            }
        }

        if failed {
            break 'turns;
        }

        match terminal {
            None => {
                warn!(app_id = %app.id, "generation ended without a terminal event");
                let _ = sender.send(ProtocolMessage::assistant(
                    "msg_abnormal",
                    "❌ Error: generation ended unexpectedly",
                ));
                break 'turns;
            }
            Some(FinishReason::ToolCalls) if attempts < state.max_repair_attempts => {
                attempts += 1;
                info!(app_id = %app.id, attempts, "turn stopped on tool calls, continuing");
                current = request.continuation(CONTINUE_PROMPT);
                skip_plan = true;
            }
            Some(FinishReason::ToolCalls) => {
                warn!(app_id = %app.id, attempts, "attempt budget exhausted mid-work");
                break 'turns;
            }
            Some(FinishReason::Stop) => {
                if state.sandbox.check_preview(&dev.ephemeral_url).await {
                    info!(app_id = %app.id, attempts, "generation complete, preview healthy");
                    break 'turns;
                }
                if attempts < state.max_repair_attempts {
                    attempts += 1;
                    info!(app_id = %app.id, attempts, "preview unhealthy, entering repair turn");
                    current = request.continuation(REPAIR_PROMPT);
                    skip_plan = true;
                } else {
                    warn!(app_id = %app.id, attempts, "repair budget exhausted, giving up");
                    break 'turns;
                }
            }
        }
    }

    state.streams.release(&app.id, token).await;
    info!(app_id = %app.id, "generation finished");
    // `sender` drops here, ending every subscriber's stream.
}

// ─── Tests ────────────────────────────────────────────────────────────────
