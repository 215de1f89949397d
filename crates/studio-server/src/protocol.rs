use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── ProtocolMessage ──────────────────────────────────────────────────────

/// One chat-protocol message as streamed to the client.
///
/// Ids are monotonic per stream (`msg_0`, `msg_1`, …) so a reconnecting
/// client can order frames. Tool activity travels in `tool_invocations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_invocations: Vec<ToolInvocation>,
}

impl ProtocolMessage {
    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            tool_invocations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Assistant,
    User,
    System,
}

// ─── ToolInvocation ───────────────────────────────────────────────────────

/// A tool invocation attached to a protocol message.
///
/// Two-state machine: a `call` is recorded when a file mutation is
/// dispatched, and exactly one `result` (correlated by `tool_call_id`)
/// follows in the same turn once the bridge call returns — on failure the
/// result carries an error payload, it is never omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    pub state: InvocationState,
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ToolInvocation {
    pub fn call(id: impl Into<String>, tool: impl Into<String>, args: Value) -> Self {
        Self {
            state: InvocationState::Call,
            tool_call_id: id.into(),
            tool_name: tool.into(),
            args,
            result: None,
        }
    }

    /// Transition this invocation to the `result` state.
    pub fn into_result(mut self, result: Value) -> Self {
        self.state = InvocationState::Result;
        self.result = Some(result);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    Call,
    Result,
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_to_result_keeps_correlation_id() {
        let call = ToolInvocation::call("tool_1", "write_file", json!({"path": "a"}));
        let result = call.clone().into_result(json!({"success": true}));
        assert_eq!(result.tool_call_id, call.tool_call_id);
        assert_eq!(result.state, InvocationState::Result);
        assert_eq!(result.result, Some(json!({"success": true})));
    }

    #[test]
    fn message_without_invocations_serializes_compactly() {
        let msg = ProtocolMessage::assistant("msg_0", "hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("tool_invocations"));
        assert!(json.contains(r#""role":"assistant""#));
    }

    #[test]
    fn roundtrips_through_json() {
        let msg = ProtocolMessage {
            id: "msg_3".into(),
            role: Role::Assistant,
            content: String::new(),
            tool_invocations: vec![ToolInvocation::call("tool_3", "edit_file", json!({}))],
        };
        let back: ProtocolMessage =
            serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(back, msg);
    }
}
