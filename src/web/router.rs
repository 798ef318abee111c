//! Axum router construction.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::web::config::MAX_UPLOAD_BODY;
use crate::web::handlers;
use crate::web::state::SharedState;
use crate::web::static_files::static_handler;

/// Build the complete Axum router: pages, JSON API, blobs and static assets.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // Landing / auth
        .route("/", get(handlers::auth::landing_handler))
        .route(
            "/login",
            get(handlers::auth::login_page_handler).post(handlers::auth::login_handler),
        )
        .route(
            "/signup",
            get(handlers::auth::signup_page_handler).post(handlers::auth::signup_handler),
        )
        .route("/logout", post(handlers::auth::logout_handler))
        .route(
            "/auth/auth-code-error",
            get(handlers::auth::auth_code_error_handler),
        )
        // Dashboard: links
        .route("/dashboard", get(handlers::dashboard::dashboard_handler))
        .route(
            "/dashboard/links",
            post(handlers::dashboard::save_link_handler)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY)),
        )
        .route(
            "/dashboard/links/:link_id/delete",
            post(handlers::dashboard::delete_link_handler),
        )
        .route(
            "/dashboard/links/:link_id/highlight",
            post(handlers::dashboard::toggle_highlight_handler),
        )
        .route(
            "/dashboard/links/:link_id/active",
            post(handlers::dashboard::toggle_active_handler),
        )
        // Dashboard: profile
        .route(
            "/dashboard/profile",
            get(handlers::profile::profile_page_handler)
                .post(handlers::profile::save_profile_handler),
        )
        .route(
            "/dashboard/profile/avatar",
            post(handlers::profile::upload_avatar_handler)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY)),
        )
        // Health
        .route("/api/health", get(handlers::health::health_handler))
        // Links API
        .route(
            "/api/links",
            get(handlers::api::list_links_handler).post(handlers::api::create_link_handler),
        )
        .route(
            "/api/links/:link_id",
            axum::routing::put(handlers::api::update_link_handler)
                .delete(handlers::api::delete_link_handler),
        )
        .route(
            "/api/links/:link_id/highlight",
            post(handlers::api::toggle_highlight_handler),
        )
        .route(
            "/api/links/:link_id/active",
            post(handlers::api::toggle_active_handler),
        )
        .route(
            "/api/links/:link_id/click",
            post(handlers::api::record_click_handler),
        )
        // Profiles API
        .route(
            "/api/profile",
            get(handlers::api::get_profile_handler).put(handlers::api::update_profile_handler),
        )
        .route(
            "/api/users/:username",
            get(handlers::api::public_user_handler),
        )
        // Blobs and assets
        .route(
            "/storage/:bucket/:name",
            get(handlers::storage::blob_handler),
        )
        .route("/static/*path", get(static_handler))
        // Click-through and public pages
        .route("/go/:link_id", get(handlers::public::go_handler))
        .route("/:username", get(handlers::public::public_page_handler))
        .fallback(handlers::public::not_found_handler)
        .with_state(state)
}
