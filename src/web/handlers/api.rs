//! JSON API over the link and profile services.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::services::{LinkInput, LinkService, ProfileService, ProfileUpdate};
use crate::web::session::require_api_session;
use crate::web::state::SharedState;
use crate::web::utils::{now_millis, service_error};

pub async fn list_links_handler(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let st = state.lock().await;
    let session = match require_api_session(&st, &jar) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match st.backend(now_millis()).list_links(&session) {
        Ok(links) => (StatusCode::OK, axum::Json(links)).into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn create_link_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    axum::Json(input): axum::Json<LinkInput>,
) -> Response {
    let st = state.lock().await;
    let session = match require_api_session(&st, &jar) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match st.backend(now_millis()).create_link(&session, &input, None) {
        Ok(link) => (StatusCode::CREATED, axum::Json(link)).into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn update_link_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(link_id): Path<String>,
    axum::Json(input): axum::Json<LinkInput>,
) -> Response {
    let st = state.lock().await;
    let session = match require_api_session(&st, &jar) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match st
        .backend(now_millis())
        .update_link(&session, &link_id, &input, None)
    {
        Ok(link) => (StatusCode::OK, axum::Json(link)).into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn delete_link_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(link_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    let session = match require_api_session(&st, &jar) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match st.backend(now_millis()).delete_link(&session, &link_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn toggle_highlight_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(link_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    let session = match require_api_session(&st, &jar) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match st.backend(now_millis()).toggle_highlight(&session, &link_id) {
        Ok(link) => (StatusCode::OK, axum::Json(link)).into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn toggle_active_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(link_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    let session = match require_api_session(&st, &jar) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match st.backend(now_millis()).toggle_active(&session, &link_id) {
        Ok(link) => (StatusCode::OK, axum::Json(link)).into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn record_click_handler(
    State(state): State<SharedState>,
    Path(link_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    match st.backend(now_millis()).record_click(&link_id) {
        Ok(link) => (
            StatusCode::CREATED,
            axum::Json(serde_json::json!({ "link_id": link.id, "url": link.url })),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn get_profile_handler(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let st = state.lock().await;
    let session = match require_api_session(&st, &jar) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match st.backend(now_millis()).get_profile(&session) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn update_profile_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    axum::Json(update): axum::Json<ProfileUpdate>,
) -> Response {
    let st = state.lock().await;
    let session = match require_api_session(&st, &jar) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match st.backend(now_millis()).update_profile(&session, &update) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn public_user_handler(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Response {
    let st = state.lock().await;
    match st.backend(now_millis()).public_page(&username) {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(e) => service_error(e),
    }
}
