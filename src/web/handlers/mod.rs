//! Route handler modules for linkshare-web.

pub mod api;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod profile;
pub mod public;
pub mod storage;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tera::Context;

use crate::web::state::AppState;
use crate::web::templates::render;
use crate::web::utils::{take_notice, Notice};

/// Context shared by every page: the pending notice and whether the
/// visitor is signed in.
pub(crate) fn base_context(notice: Option<Notice>, signed_in: bool) -> Context {
    let mut ctx = Context::new();
    ctx.insert("notice", &notice);
    ctx.insert("session_user", &signed_in);
    ctx
}

/// Render a page, consuming any pending notice from the cookie jar.
pub(crate) fn render_page(
    state: &AppState,
    jar: CookieJar,
    name: &str,
    signed_in: bool,
    fill: impl FnOnce(&mut Context),
) -> Response {
    let (jar, notice) = take_notice(jar);
    let mut ctx = base_context(notice, signed_in);
    fill(&mut ctx);
    (jar, render(&state.templates, name, &ctx, StatusCode::OK)).into_response()
}

pub(crate) fn not_found_page(state: &AppState, signed_in: bool) -> Response {
    let ctx = base_context(None, signed_in);
    render(&state.templates, "not_found.html", &ctx, StatusCode::NOT_FOUND)
}
