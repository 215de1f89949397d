use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ─── GenerationEvent ──────────────────────────────────────────────────────

/// One structured unit produced by a generation backend.
///
/// Discriminated by the JSON `"type"` field on the wire. Backends are
/// untrusted: a `file_create`/`file_edit` event may carry any path string
/// and any content — path validation is the consumer's job.
///
/// Unknown tags deserialize to [`GenerationEvent::Other`] carrying the raw
/// content, so a newer backend never breaks an older consumer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    Plan {
        #[serde(default)]
        text: String,
        items: Vec<String>,
    },
    FileCreate {
        path: String,
        content: String,
    },
    FileEdit {
        path: String,
        content: String,
    },
    Explanation {
        text: String,
    },
    Error {
        text: String,
    },
    /// Terminal event of a successful sequence. `finish_reason` tells the
    /// orchestrator whether the backend stopped mid-work with tool calls
    /// still pending (and should be told to continue) or finished cleanly.
    Complete {
        #[serde(default)]
        text: String,
        #[serde(default)]
        finish_reason: FinishReason,
    },
    /// Catch-all for tags this crate does not recognise.
    Other {
        content: String,
    },
}

impl GenerationEvent {
    /// `complete` and `error` terminate a well-formed event sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationEvent::Complete { .. } | GenerationEvent::Error { .. }
        )
    }

    /// Build an event from a parsed JSON value, degrading unknown tags to
    /// [`GenerationEvent::Other`] instead of failing.
    pub fn from_value(v: Value) -> Self {
        let tag = v.get("type").and_then(Value::as_str).unwrap_or("");
        match tag {
            "plan" => GenerationEvent::Plan {
                text: str_field(&v, &["text", "content"]),
                items: v
                    .get("items")
                    .and_then(Value::as_array)
                    .map(|a| {
                        a.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_owned)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            "file_create" | "create" => GenerationEvent::FileCreate {
                path: str_field(&v, &["path", "file"]),
                content: str_field(&v, &["content", "diff"]),
            },
            "file_edit" | "edit" => GenerationEvent::FileEdit {
                path: str_field(&v, &["path", "file"]),
                content: str_field(&v, &["content", "diff"]),
            },
            "explanation" => GenerationEvent::Explanation {
                text: str_field(&v, &["text", "content"]),
            },
            "error" => GenerationEvent::Error {
                text: str_field(&v, &["text", "content", "message"]),
            },
            "complete" => GenerationEvent::Complete {
                text: str_field(&v, &["text", "content"]),
                finish_reason: v
                    .get("finish_reason")
                    .and_then(Value::as_str)
                    .map(FinishReason::parse)
                    .unwrap_or_default(),
            },
            _ => {
                let content = match v.get("content").and_then(Value::as_str) {
                    Some(s) => s.to_owned(),
                    None => v.to_string(),
                };
                GenerationEvent::Other { content }
            }
        }
    }
}

fn str_field(v: &Value, names: &[&str]) -> String {
    names
        .iter()
        .find_map(|n| v.get(*n).and_then(Value::as_str))
        .unwrap_or_default()
        .to_owned()
}

impl<'de> Deserialize<'de> for GenerationEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(deserializer)?;
        Ok(GenerationEvent::from_value(v))
    }
}

// ─── FinishReason ─────────────────────────────────────────────────────────

/// Why a `complete` event ended its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    ToolCalls,
}

impl FinishReason {
    fn parse(s: &str) -> Self {
        match s {
            "tool_calls" | "tool-calls" => FinishReason::ToolCalls,
            _ => FinishReason::Stop,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
