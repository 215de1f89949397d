use serde_json::{json, Value};
use tracing::{debug, warn};

use sitegen::GenerationEvent;

use crate::bridge::{normalize_path, FileBridge, FileEdit, FileOperation};
use crate::protocol::{ProtocolMessage, Role, ToolInvocation};

// ─── StreamAdapter ────────────────────────────────────────────────────────

/// Stateful map from generation events to protocol messages.
///
/// Create/edit events additionally apply the file mutation through the
/// [`FileBridge`] and report the outcome in-band: every `call` invocation
/// is followed by exactly one correlated `result`, success or failure.
/// The adapter never propagates file-operation failures as errors.
pub struct StreamAdapter {
    next_id: u64,
    bridge: FileBridge,
}

impl StreamAdapter {
    pub fn new(bridge: FileBridge) -> Self {
        Self { next_id: 0, bridge }
    }

    /// Expand one generation event into zero or more protocol messages,
    /// in emission order (a `call` always precedes its `result`).
    pub async fn adapt(&mut self, event: GenerationEvent) -> Vec<ProtocolMessage> {
        let n = self.next_id;
        self.next_id += 1;
        let message_id = format!("msg_{n}");

        match event {
            GenerationEvent::Plan { text, items } => {
                let invocation = ToolInvocation {
                    state: crate::protocol::InvocationState::Result,
                    tool_call_id: format!("tool_{n}"),
                    tool_name: "update_todo_list".into(),
                    args: json!({
                        "items": items
                            .iter()
                            .map(|item| json!({ "description": item, "completed": false }))
                            .collect::<Vec<_>>(),
                    }),
                    result: Some(json!({})),
                };
                vec![ProtocolMessage {
                    id: message_id,
                    role: Role::Assistant,
                    content: text,
                    tool_invocations: vec![invocation],
                }]
            }

            GenerationEvent::FileCreate { path, content } => {
                self.apply_mutation(n, message_id, path, content, FileOperation::Create)
                    .await
            }
            GenerationEvent::FileEdit { path, content } => {
                self.apply_mutation(n, message_id, path, content, FileOperation::Update)
                    .await
            }

            GenerationEvent::Explanation { text } => {
                vec![ProtocolMessage::assistant(message_id, text)]
            }
            GenerationEvent::Complete { text, .. } => {
                vec![ProtocolMessage::assistant(message_id, text)]
            }

            GenerationEvent::Error { text } => {
                vec![ProtocolMessage::assistant(
                    message_id,
                    format!("❌ Error: {text}"),
                )]
            }

            // Unknown tags degrade to a plain assistant message rather
            // than being dropped.
            GenerationEvent::Other { content } => {
                vec![ProtocolMessage::assistant(message_id, content)]
            }
        }
    }

    async fn apply_mutation(
        &self,
        n: u64,
        message_id: String,
        raw_path: String,
        raw_content: String,
        operation: FileOperation,
    ) -> Vec<ProtocolMessage> {
        let path = normalize_path(&raw_path);
        let content = extract_content_from_diff(&raw_content);

        let tool_name = match operation {
            FileOperation::Create => "write_file",
            _ => "edit_file",
        };
        let invocation = ToolInvocation::call(
            format!("tool_{n}"),
            tool_name,
            json!({ "path": path, "content": content }),
        );

        let mut messages = vec![ProtocolMessage {
            id: message_id.clone(),
            role: Role::Assistant,
            content: String::new(),
            tool_invocations: vec![invocation.clone()],
        }];

        let edit = FileEdit {
            path: path.clone(),
            content,
            operation,
        };
        match self.bridge.execute_file_operation(&edit).await {
            Ok(result) => {
                debug!(path = %path, "file operation succeeded");
                let verb = match operation {
                    FileOperation::Create => "created",
                    FileOperation::Update => "updated",
                    FileOperation::Delete => "deleted",
                };
                let mut payload = json!({
                    "success": true,
                    "message": format!("File {path} {verb} successfully"),
                });
                if let (Some(obj), Value::Object(extra)) = (payload.as_object_mut(), result) {
                    obj.extend(extra);
                }
                messages.push(ProtocolMessage {
                    id: format!("{message_id}_result"),
                    role: Role::Assistant,
                    content: String::new(),
                    tool_invocations: vec![invocation.into_result(payload)],
                });
            }
            Err(err) => {
                warn!(path = %path, error = %err, "file operation failed");
                messages.push(ProtocolMessage {
                    id: format!("{message_id}_error"),
                    role: Role::Assistant,
                    content: format!("Error: {err}"),
                    tool_invocations: vec![invocation.into_result(json!({
                        "is_error": true,
                        "error": err.to_string(),
                    }))],
                });
            }
        }

        messages
    }
}

// ─── Diff extraction ──────────────────────────────────────────────────────

/// Extract literal file content from a payload that may be a unified diff.
///
/// If any line starts with `+` or `-`, the payload is treated as a diff
/// and only the `+` lines (marker stripped) are kept; otherwise the
/// payload is literal full-file content and returned unchanged. The
/// sniffing is heuristic and can misfire on literal content whose lines
/// happen to start with those markers.
pub fn extract_content_from_diff(payload: &str) -> String {
    let looks_like_diff = payload
        .lines()
        .any(|line| line.starts_with('+') || line.starts_with('-'));
    if !looks_like_diff {
        return payload.to_owned();
    }

    payload
        .lines()
        .filter_map(|line| line.strip_prefix('+'))
        .collect::<Vec<_>>()
        .join("\n")
}

// ─── Tests ────────────────────────────────────────────────────────────────
