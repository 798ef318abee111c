//! Session cookie handling and the auth gate for protected routes.

use axum::http::StatusCode;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::{resolve_session, Session};
use crate::storage::ProfileRow;
use crate::web::state::AppState;
use crate::web::utils::{api_error, now_secs, see_other};

pub const SESSION_COOKIE: &str = "linkshare_session";

pub fn session_cookie(token: String, ttl_secs: u64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(ttl_secs as i64))
        .build()
}

pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// The live session named by the request's cookie, if any.
pub fn current_session(state: &AppState, jar: &CookieJar) -> Option<Session> {
    let token = session_token(jar)?;
    match resolve_session(&state.storage, &token, now_secs()) {
        Ok(session) => session,
        Err(e) => {
            crate::tlog!("WARNING: session lookup failed: {}", e);
            None
        }
    }
}

/// Gate for HTML pages: the session and its profile, or a redirect to
/// `/login`. A session whose profile is missing is treated as logged out.
pub fn require_page_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<(Session, ProfileRow), Response> {
    let Some(session) = current_session(state, jar) else {
        return Err(see_other("/login"));
    };
    match state.storage.get_profile(&session.user_id) {
        Ok(Some(profile)) => Ok((session, profile)),
        Ok(None) => {
            crate::tlog!(
                "WARNING: session for {} has no profile",
                crate::logging::user_id(&session.user_id)
            );
            Err(see_other("/login"))
        }
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Gate for JSON routes: the session, or `401`.
pub fn require_api_session(state: &AppState, jar: &CookieJar) -> Result<Session, Response> {
    current_session(state, jar)
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "not signed in"))
}
