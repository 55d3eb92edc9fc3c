use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::actions::dispatcher::Dispatcher;
use crate::actions::protocol::{ActionRequest, ActionResponse};
use crate::actions::{ActionContext, ActionRegistry};

#[derive(Clone)]
pub struct ActionServerState {
    pub registry: Arc<ActionRegistry>,
    pub context: Arc<ActionContext>,
}

pub fn router(state: ActionServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/actions", get(list_actions))
        .route("/webhook", post(webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn list_actions(State(state): State<ActionServerState>) -> Json<serde_json::Value> {
    let names: Vec<_> = state.registry.names().into_iter().map(|n| json!({"name": n})).collect();
    Json(json!(names))
}

async fn webhook(State(state): State<ActionServerState>, Json(request): Json<ActionRequest>) -> Response {
    let name = request.next_action.clone();
    let Some(action) = state.registry.get(&name) else {
        warn!(action = %name, "actions: no registered action");
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("No registered action found for name '{}'.", name),
                "action_name": name,
            })),
        )
            .into_response();
    };

    info!(action = %name, sender = request.sender_id(), "actions: running");
    let mut dispatcher = Dispatcher::new();
    match action.run(&state.context, &mut dispatcher, &request).await {
        Ok(events) => Json(ActionResponse { events, responses: dispatcher.into_messages() }).into_response(),
        Err(e) => {
            error!(action = %name, error = %e, "actions: action failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string(), "action_name": name})),
            )
                .into_response()
        }
    }
}
