//! `studio-server` — chat orchestration server for Bond Media Studio.
//!
//! Sits between a chat client, a generation backend (see the `sitegen`
//! crate), and a remote sandbox running the live preview. One `POST /chat`
//! request drives the whole pipeline: classify the prompt, provision a
//! dev server, stream generation events through the adapter (applying
//! file mutations on the sandbox as they arrive), and repair the preview
//! until it is healthy or the attempt budget runs out.

pub mod adapter;
pub mod apps;
pub mod bridge;
pub mod error;
pub mod orchestrator;
pub mod protocol;
pub mod registry;
pub mod routes;
pub mod sandbox;
pub mod state;
pub mod store;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Chat (SSE)
        .route("/chat", post(routes::chat::post_chat))
        .route("/chat", get(routes::chat::get_chat))
        // Apps
        .route("/apps", post(routes::apps::create_app))
        .route("/apps", get(routes::apps::list_apps))
        .route("/apps/{id}/messages", get(routes::apps::get_messages))
        .layer(cors)
        .with_state(state)
}

/// Start the studio server on the given port.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("studio server listening on http://localhost:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}
