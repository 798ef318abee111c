//! Public profile pages, click-through redirects and the 404 page.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::services::{LinkService, ProfileService, ServiceError};
use crate::web::handlers::{not_found_page, render_page};
use crate::web::session::current_session;
use crate::web::state::SharedState;
use crate::web::utils::{now_millis, service_status, try_see_other};

pub async fn public_page_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> Response {
    let st = state.lock().await;
    let signed_in = current_session(&st, &jar).is_some();
    match st.backend(now_millis()).public_page(&username) {
        Ok(page) => render_page(&st, jar, "public.html", signed_in, |ctx| {
            ctx.insert("profile", &page.profile);
            ctx.insert("highlighted", &page.highlighted);
            ctx.insert("links", &page.links);
            ctx.insert("socials", &page.socials);
        }),
        Err(ServiceError::NotFound(_)) => not_found_page(&st, signed_in),
        Err(e) => (service_status(&e), e.to_string()).into_response(),
    }
}

/// Record a click and send the visitor on to the link's destination.
pub async fn go_handler(State(state): State<SharedState>, Path(link_id): Path<String>) -> Response {
    let st = state.lock().await;
    match st.backend(now_millis()).record_click(&link_id) {
        Ok(link) => try_see_other(&link.url).unwrap_or_else(|| {
            crate::tlog!(
                "WARNING: {} has an unusable destination",
                crate::logging::link_id(&link_id)
            );
            not_found_page(&st, false)
        }),
        Err(ServiceError::NotFound(_)) => not_found_page(&st, false),
        Err(e) => {
            crate::tlog!("WARNING: click on {} failed: {}", crate::logging::link_id(&link_id), e);
            (service_status(&e), e.to_string()).into_response()
        }
    }
}

pub async fn not_found_handler(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let st = state.lock().await;
    let signed_in = current_session(&st, &jar).is_some();
    not_found_page(&st, signed_in)
}
