//! Shared utility functions for the web layer.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::links::ImageError;
use crate::services::ServiceError;
use crate::storage::StorageError;
use crate::web::config::NOTICE_TTL_SECS;

pub const NOTICE_COOKIE: &str = "linkshare_notice";

/// Build a standard JSON error response.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, axum::Json(body)).into_response()
}

pub fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Image(ImageError::TooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
        ServiceError::Image(_) | ServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) | ServiceError::Storage(StorageError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        ServiceError::Conflict(_) | ServiceError::Storage(StorageError::AlreadyExists(_)) => {
            StatusCode::CONFLICT
        }
        ServiceError::Storage(StorageError::InvalidBlobName(_)) => StatusCode::BAD_REQUEST,
        ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error response for a failed service call.
pub fn service_error(err: ServiceError) -> Response {
    api_error(service_status(&err), err.to_string())
}

/// Current time as seconds since UNIX epoch.
pub fn now_secs() -> u64 {
    now_millis() / 1000
}

/// Current time as milliseconds since UNIX epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// `303 See Other` to `path`.
pub fn see_other(path: &str) -> Response {
    Redirect::to(path).into_response()
}

/// 303 to an external location, or `None` if it cannot be sent as a
/// `Location` header.
pub fn try_see_other(location: &str) -> Option<Response> {
    let value = HeaderValue::from_str(location).ok()?;
    Some((StatusCode::SEE_OTHER, [(header::LOCATION, value)]).into_response())
}

// ---------------------------------------------------------------------------
// One-shot notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    fn encode(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    fn decode(value: &str) -> Option<Self> {
        let json = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(value)
            .ok()?;
        serde_json::from_slice(&json).ok()
    }
}

/// Queue a notice for the next page render.
pub fn set_notice(jar: CookieJar, notice: Notice) -> CookieJar {
    let cookie = Cookie::build((NOTICE_COOKIE, notice.encode()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(NOTICE_TTL_SECS));
    jar.add(cookie)
}

/// Read and clear the pending notice.
pub fn take_notice(jar: CookieJar) -> (CookieJar, Option<Notice>) {
    let Some(value) = jar.get(NOTICE_COOKIE).map(|c| c.value().to_string()) else {
        return (jar, None);
    };
    let jar = jar.remove(Cookie::build(NOTICE_COOKIE).path("/"));
    (jar, Notice::decode(&value))
}

/// Redirect to `path` carrying a notice.
pub fn redirect_with_notice(jar: CookieJar, path: &str, notice: Notice) -> Response {
    (set_notice(jar, notice), Redirect::to(path)).into_response()
}
