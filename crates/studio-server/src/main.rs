use std::sync::Arc;

use clap::{Parser, ValueEnum};

use sitegen::{AgentGenerator, DirectGenerator, Generator, PatternClassifier};
use studio_server::apps::AppDirectory;
use studio_server::orchestrator::DEFAULT_MAX_REPAIR_ATTEMPTS;
use studio_server::registry::StreamRegistry;
use studio_server::sandbox::HttpSandbox;
use studio_server::state::AppState;
use studio_server::store::MemoryMessageStore;

#[derive(Parser)]
#[command(
    name = "studio-server",
    about = "Bond Media Studio — chat orchestration between a generation backend and a sandboxed live preview",
    version
)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "STUDIO_PORT", default_value = "3000")]
    port: u16,

    /// Base URL of the sandbox provisioning API
    #[arg(long, env = "STUDIO_SANDBOX_URL")]
    sandbox_url: String,

    /// API key for the sandbox provisioning API
    #[arg(long, env = "STUDIO_SANDBOX_API_KEY")]
    sandbox_api_key: Option<String>,

    /// Which generation backend to use
    #[arg(long, env = "STUDIO_BACKEND", value_enum, default_value = "agent")]
    backend: Backend,

    /// Base URL of the generation backend
    #[arg(long, env = "STUDIO_BACKEND_URL")]
    backend_url: String,

    /// API key for the direct backend
    #[arg(long, env = "STUDIO_BACKEND_API_KEY")]
    backend_api_key: Option<String>,

    /// Model name passed to the backend
    #[arg(long, env = "STUDIO_MODEL", default_value = "claude-sonnet-4-20250514")]
    model: String,

    /// Shared budget for continue and repair turns per request
    #[arg(long, env = "STUDIO_MAX_REPAIR_ATTEMPTS", default_value_t = DEFAULT_MAX_REPAIR_ATTEMPTS)]
    max_repair_attempts: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Stream JSONL events from an agent service
    Agent,
    /// One model call parsed into file blocks
    Direct,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let generator: Arc<dyn Generator> = match cli.backend {
        Backend::Agent => Arc::new(AgentGenerator::new(cli.backend_url).with_model(cli.model)),
        Backend::Direct => {
            let mut direct = DirectGenerator::new(cli.backend_url, cli.model);
            if let Some(key) = cli.backend_api_key {
                direct = direct.with_api_key(key);
            }
            Arc::new(direct)
        }
    };

    let state = AppState {
        generator,
        classifier: Arc::new(PatternClassifier::default()),
        sandbox: Arc::new(HttpSandbox::new(cli.sandbox_url, cli.sandbox_api_key)),
        store: Arc::new(MemoryMessageStore::new()),
        apps: Arc::new(AppDirectory::new()),
        streams: Arc::new(StreamRegistry::new()),
        max_repair_attempts: cli.max_repair_attempts,
    };

    studio_server::serve(state, cli.port).await
}
