use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::protocol::Role;

// ─── StoredMessage ────────────────────────────────────────────────────────

/// One persisted chat message row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

// ─── MessageStore ─────────────────────────────────────────────────────────

/// Append-only, at-least-once persistence boundary for chat history.
/// The real database lives behind this trait; the core only ever appends
/// full rows and reads them back in insertion order.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, app_id: &str, message: StoredMessage) -> anyhow::Result<()>;
    async fn load_all(&self, app_id: &str) -> anyhow::Result<Vec<StoredMessage>>;
}

/// In-memory store, used in tests and as the default when no database is
/// wired up.
#[derive(Default)]
pub struct MemoryMessageStore {
    rows: Mutex<HashMap<String, Vec<StoredMessage>>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(&self, app_id: &str, message: StoredMessage) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().await;
        rows.entry(app_id.to_owned()).or_default().push(message);
        Ok(())
    }

    async fn load_all(&self, app_id: &str) -> anyhow::Result<Vec<StoredMessage>> {
        let rows = self.rows.lock().await;
        Ok(rows.get(app_id).cloned().unwrap_or_default())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appended_rows_come_back_in_order() {
        let store = MemoryMessageStore::new();
        store
            .append("app-1", StoredMessage::new(Role::User, "first"))
            .await
            .unwrap();
        store
            .append("app-1", StoredMessage::new(Role::Assistant, "second"))
            .await
            .unwrap();

        let rows = store.load_all("app-1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].content, "first");
        assert_eq!(rows[1].content, "second");
    }

    #[tokio::test]
    async fn apps_are_isolated() {
        let store = MemoryMessageStore::new();
        store
            .append("app-1", StoredMessage::new(Role::User, "hello"))
            .await
            .unwrap();

        assert!(store.load_all("app-2").await.unwrap().is_empty());
    }
}
