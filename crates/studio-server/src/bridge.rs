use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

// ─── Tool surface ─────────────────────────────────────────────────────────

/// The remote tool surface exposed by a sandbox session.
///
/// Tools are addressed by logical name; any of them may be absent from a
/// given sandbox, and absence must surface as [`ToolError::NotFound`],
/// never a crash.
#[async_trait]
pub trait ToolClient: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<String>, ToolError>;
    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, ToolError>;
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool '{0}' not found in toolset")]
    NotFound(String),

    #[error("tool transport error: {0}")]
    Transport(String),

    #[error("tool call failed: {0}")]
    Rpc(String),
}

// ─── FileEdit ─────────────────────────────────────────────────────────────

/// A file mutation intent, as derived from a generation event.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEdit {
    pub path: String,
    pub content: String,
    pub operation: FileOperation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Create,
    Update,
    Delete,
}

// ─── Path normalization ───────────────────────────────────────────────────

/// Normalize a generated file path for the sandbox project tree.
///
/// Exactly one rule applies: a leading `/template/` segment is stripped;
/// otherwise a single leading `/` is stripped. Nothing else is touched —
/// in particular parent-traversal components pass through, so callers
/// must treat generated paths as untrusted.
pub fn normalize_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/template/") {
        rest.to_owned()
    } else if let Some(rest) = path.strip_prefix('/') {
        rest.to_owned()
    } else {
        path.to_owned()
    }
}

// ─── FileBridge ───────────────────────────────────────────────────────────

/// Applies file mutations against a remote project tree through the best
/// available tool: `write_file` for create/update, `delete_file` for
/// delete. Tool discovery happens once per bridge and is cached for its
/// lifetime.
pub struct FileBridge {
    client: Arc<dyn ToolClient>,
    toolset: OnceCell<Vec<String>>,
}

impl FileBridge {
    pub fn new(client: Arc<dyn ToolClient>) -> Self {
        Self {
            client,
            toolset: OnceCell::new(),
        }
    }

    async fn toolset(&self) -> Result<&[String], ToolError> {
        let tools = self
            .toolset
            .get_or_try_init(|| self.client.list_tools())
            .await?;
        Ok(tools)
    }

    /// Resolve a tool by logical name against the cached toolset.
    async fn resolve(&self, name: &str) -> Result<(), ToolError> {
        let tools = self.toolset().await?;
        if tools.iter().any(|t| t == name) {
            Ok(())
        } else {
            Err(ToolError::NotFound(name.to_owned()))
        }
    }

    /// Apply one file mutation. The path must already be normalized.
    pub async fn execute_file_operation(&self, edit: &FileEdit) -> Result<Value, ToolError> {
        match edit.operation {
            FileOperation::Create | FileOperation::Update => {
                self.resolve("write_file").await?;
                debug!(path = %edit.path, "writing file");
                self.client
                    .call_tool(
                        "write_file",
                        json!({ "path": edit.path, "content": edit.content }),
                    )
                    .await
            }
            FileOperation::Delete => {
                self.resolve("delete_file").await?;
                debug!(path = %edit.path, "deleting file");
                self.client
                    .call_tool("delete_file", json!({ "path": edit.path }))
                    .await
            }
        }
    }

    pub async fn read_file(&self, path: &str) -> Result<String, ToolError> {
        self.resolve("read_file").await?;
        let result = self.client.call_tool("read_file", json!({ "path": path })).await?;
        Ok(result
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned())
    }

    pub async fn list_directory(&self, path: &str) -> Result<Vec<String>, ToolError> {
        self.resolve("list_directory").await?;
        let result = self
            .client
            .call_tool("list_directory", json!({ "path": path }))
            .await?;
        Ok(result
            .get("files")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn exec(&self, command: &str) -> Result<String, ToolError> {
        self.resolve("exec").await?;
        let result = self
            .client
            .call_tool("exec", json!({ "command": command }))
            .await?;
        Ok(result
            .get("output")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeTools {
        tools: Vec<String>,
        list_calls: AtomicUsize,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl FakeTools {
        fn with(tools: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                tools: tools.iter().map(|t| (*t).to_owned()).collect(),
                list_calls: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ToolClient for FakeTools {
        async fn list_tools(&self) -> Result<Vec<String>, ToolError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tools.clone())
        }

        async fn call_tool(&self, name: &str, args: Value) -> Result<Value, ToolError> {
            self.calls.lock().unwrap().push((name.to_owned(), args));
            Ok(json!({ "ok": true }))
        }
    }

    fn edit(op: FileOperation) -> FileEdit {
        FileEdit {
            path: "app/page.tsx".into(),
            content: "x".into(),
            operation: op,
        }
    }

    #[test]
    fn normalize_strips_template_prefix() {
        assert_eq!(normalize_path("/template/app/page.tsx"), "app/page.tsx");
    }

    #[test]
    fn normalize_strips_single_leading_slash() {
        assert_eq!(normalize_path("/app/page.tsx"), "app/page.tsx");
    }

    #[test]
    fn normalize_is_identity_on_relative_paths() {
        assert_eq!(normalize_path("app/page.tsx"), "app/page.tsx");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_path("/template/app/page.tsx");
        assert_eq!(normalize_path(&once), once);
    }

    #[test]
    fn normalize_passes_traversal_through_unchanged() {
        // Documented open risk: no traversal defense at this layer.
        assert_eq!(normalize_path("/../etc/passwd"), "../etc/passwd");
    }

    #[tokio::test]
    async fn create_and_update_use_write_file() {
        let tools = FakeTools::with(&["write_file", "delete_file"]);
        let bridge = FileBridge::new(tools.clone());

        bridge.execute_file_operation(&edit(FileOperation::Create)).await.unwrap();
        bridge.execute_file_operation(&edit(FileOperation::Update)).await.unwrap();

        let calls = tools.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(name, _)| name == "write_file"));
    }

    #[tokio::test]
    async fn delete_uses_delete_file() {
        let tools = FakeTools::with(&["write_file", "delete_file"]);
        let bridge = FileBridge::new(tools.clone());

        bridge.execute_file_operation(&edit(FileOperation::Delete)).await.unwrap();

        let calls = tools.calls.lock().unwrap();
        assert_eq!(calls[0].0, "delete_file");
        assert_eq!(calls[0].1, json!({ "path": "app/page.tsx" }));
    }

    #[tokio::test]
    async fn missing_tool_is_not_found_not_crash() {
        let tools = FakeTools::with(&["read_file"]);
        let bridge = FileBridge::new(tools);

        let err = bridge
            .execute_file_operation(&edit(FileOperation::Create))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "write_file"));
    }

    #[tokio::test]
    async fn toolset_is_discovered_once() {
        let tools = FakeTools::with(&["write_file", "read_file", "exec"]);
        let bridge = FileBridge::new(tools.clone());

        bridge.execute_file_operation(&edit(FileOperation::Create)).await.unwrap();
        bridge.read_file("a").await.unwrap();
        bridge.exec("ls").await.unwrap();

        assert_eq!(tools.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_file_extracts_content_field() {
        struct Reader;
        #[async_trait]
        impl ToolClient for Reader {
            async fn list_tools(&self) -> Result<Vec<String>, ToolError> {
                Ok(vec!["read_file".into()])
            }
            async fn call_tool(&self, _: &str, _: Value) -> Result<Value, ToolError> {
                Ok(json!({ "content": "hello" }))
            }
        }

        let bridge = FileBridge::new(Arc::new(Reader));
        assert_eq!(bridge.read_file("a").await.unwrap(), "hello");
    }
}
