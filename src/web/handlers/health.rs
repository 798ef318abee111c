//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::web::state::SharedState;

pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.lock().await;
    let profiles = state.storage.count_profiles().unwrap_or(0);
    let links = state.storage.count_all_links().unwrap_or(0);

    let body = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "profiles": profiles,
        "links": links,
    });
    (StatusCode::OK, axum::Json(body))
}
