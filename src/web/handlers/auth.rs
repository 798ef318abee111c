//! Landing page, signup, login and logout.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::auth::{log_in, log_out, sign_up, AuthError, SignUp};
use crate::web::handlers::{base_context, render_page};
use crate::web::session::{clear_session_cookie, current_session, session_cookie, session_token};
use crate::web::state::{AppState, SharedState};
use crate::web::templates::render;
use crate::web::utils::{now_secs, redirect_with_notice, see_other, Notice};

pub async fn landing_handler(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let st = state.lock().await;
    if current_session(&st, &jar).is_some() {
        return see_other("/dashboard");
    }
    render_page(&st, jar, "landing.html", false, |_| {})
}

pub async fn login_page_handler(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let st = state.lock().await;
    if current_session(&st, &jar).is_some() {
        return see_other("/dashboard");
    }
    render_page(&st, jar, "login.html", false, |ctx| {
        ctx.insert("email", "");
    })
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

pub async fn login_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let st = state.lock().await;
    match log_in(
        &st.storage,
        &form.email,
        &form.password,
        now_secs(),
        st.session_ttl_secs,
    ) {
        Ok(session) => {
            crate::tlog!("auth: login {}", crate::logging::user_id(&session.user_id));
            let jar = jar.add(session_cookie(session.token, st.session_ttl_secs));
            (jar, see_other("/dashboard")).into_response()
        }
        Err(e) => {
            let status = auth_status(&e);
            let mut ctx = base_context(Some(Notice::error(e.to_string())), false);
            ctx.insert("email", &form.email);
            render(&st.templates, "login.html", &ctx, status)
        }
    }
}

pub async fn signup_page_handler(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let st = state.lock().await;
    if current_session(&st, &jar).is_some() {
        return see_other("/dashboard");
    }
    render_page(&st, jar, "signup.html", false, |ctx| {
        ctx.insert("form", &SignupForm::default());
    })
}

#[derive(Deserialize, serde::Serialize, Default)]
pub struct SignupForm {
    email: String,
    #[serde(skip_serializing)]
    password: String,
    username: String,
    #[serde(default)]
    full_name: String,
}

pub async fn signup_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Response {
    let st = state.lock().await;
    let req = SignUp {
        email: form.email.clone(),
        password: form.password.clone(),
        username: form.username.clone(),
        full_name: form.full_name.clone(),
    };
    match sign_up(&st.storage, &req, now_secs(), st.session_ttl_secs) {
        Ok(session) => {
            crate::tlog!("auth: signup {}", crate::logging::user_id(&session.user_id));
            let jar = jar.add(session_cookie(session.token, st.session_ttl_secs));
            redirect_with_notice(jar, "/dashboard", Notice::success("Welcome to LinkShare!"))
        }
        Err(e) => signup_failed(&st, &form, e),
    }
}

fn signup_failed(st: &AppState, form: &SignupForm, err: AuthError) -> Response {
    let status = auth_status(&err);
    let mut ctx = base_context(Some(Notice::error(err.to_string())), false);
    ctx.insert("form", form);
    render(&st.templates, "signup.html", &ctx, status)
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::EmailTaken | AuthError::UsernameTaken => StatusCode::CONFLICT,
        AuthError::Invalid(_) => StatusCode::BAD_REQUEST,
        AuthError::Hash(_) | AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn logout_handler(State(state): State<SharedState>, jar: CookieJar) -> Response {
    if let Some(token) = session_token(&jar) {
        let st = state.lock().await;
        if let Err(e) = log_out(&st.storage, &token) {
            crate::tlog!("WARNING: failed to delete session: {}", e);
        }
    }
    (clear_session_cookie(jar), see_other("/login")).into_response()
}

pub async fn auth_code_error_handler(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let st = state.lock().await;
    let signed_in = current_session(&st, &jar).is_some();
    render_page(&st, jar, "auth_code_error.html", signed_in, |_| {})
}
