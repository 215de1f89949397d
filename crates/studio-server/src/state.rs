use std::sync::Arc;

use sitegen::{Generator, PromptClassifier};

use crate::apps::AppDirectory;
use crate::registry::StreamRegistry;
use crate::sandbox::SandboxProvider;
use crate::store::MessageStore;

/// Shared server state, injected into every handler. Collaborators live
/// behind trait objects so tests can substitute scripted doubles.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn Generator>,
    pub classifier: Arc<dyn PromptClassifier>,
    pub sandbox: Arc<dyn SandboxProvider>,
    pub store: Arc<dyn MessageStore>,
    pub apps: Arc<AppDirectory>,
    pub streams: Arc<StreamRegistry>,
    /// Shared budget for continue and repair turns within one request.
    pub max_repair_attempts: u32,
}
