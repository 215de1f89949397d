use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::apps::AppInfo;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::StoredMessage;

#[derive(Deserialize)]
pub struct CreateApp {
    name: String,
    repo_id: String,
    base_id: String,
}

pub async fn create_app(
    State(state): State<AppState>,
    Json(body): Json<CreateApp>,
) -> Result<Json<AppInfo>, ApiError> {
    let info = state
        .apps
        .register(&body.name, &body.repo_id, &body.base_id)
        .await;
    info!(app_id = %info.id, name = %info.name, "app registered");
    Ok(Json(info))
}

pub async fn list_apps(State(state): State<AppState>) -> Json<Vec<AppInfo>> {
    Json(state.apps.list().await)
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
) -> Result<Json<Vec<StoredMessage>>, ApiError> {
    if state.apps.get(&app_id).await.is_none() {
        return Err(ApiError::not_found("App not found"));
    }
    let rows = state.store.load_all(&app_id).await?;
    Ok(Json(rows))
}
