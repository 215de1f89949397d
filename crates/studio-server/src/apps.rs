use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

// ─── AppInfo ──────────────────────────────────────────────────────────────

/// A registered application: the chat surface is keyed by `id`, the
/// sandbox by `repo_id`/`base_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppInfo {
    pub id: String,
    pub name: String,
    pub repo_id: String,
    pub base_id: String,
}

// ─── AppDirectory ─────────────────────────────────────────────────────────

/// In-memory registry of known applications. Chat requests for an id not
/// present here are rejected before any generation work starts.
#[derive(Default)]
pub struct AppDirectory {
    apps: Mutex<HashMap<String, AppInfo>>,
}

impl AppDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, name: &str, repo_id: &str, base_id: &str) -> AppInfo {
        let info = AppInfo {
            id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            repo_id: repo_id.to_owned(),
            base_id: base_id.to_owned(),
        };
        self.apps
            .lock()
            .await
            .insert(info.id.clone(), info.clone());
        info
    }

    pub async fn get(&self, app_id: &str) -> Option<AppInfo> {
        self.apps.lock().await.get(app_id).cloned()
    }

    pub async fn list(&self) -> Vec<AppInfo> {
        let mut apps: Vec<_> = self.apps.lock().await.values().cloned().collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        apps
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
