//! Link manager pages: list, create/update form, delete and toggles.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::Multipart;
use serde::Deserialize;

use crate::links::ImageUpload;
use crate::services::{LinkInput, LinkService, ServiceError};
use crate::web::handlers::render_page;
use crate::web::session::require_page_session;
use crate::web::state::SharedState;
use crate::web::utils::{now_millis, redirect_with_notice, Notice};

#[derive(Deserialize)]
pub struct DashboardQuery {
    edit: Option<String>,
}

pub async fn dashboard_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let st = state.lock().await;
    let (session, profile) = match require_page_session(&st, &jar) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let backend = st.backend(now_millis());
    let links = match backend.list_links(&session) {
        Ok(links) => links,
        Err(e) => {
            return redirect_with_notice(jar, "/dashboard/profile", Notice::error(e.to_string()))
        }
    };
    let editing = query
        .edit
        .as_deref()
        .and_then(|id| backend.get_link(&session, id).ok());

    let page_url = format!("{}/{}", st.public_url, profile.username);
    render_page(&st, jar, "dashboard.html", true, |ctx| {
        ctx.insert("profile", &profile);
        ctx.insert("links", &links);
        ctx.insert("editing", &editing);
        ctx.insert("page_url", &page_url);
    })
}

/// Fields of the link form. `id` is present when editing.
#[derive(Default)]
struct LinkForm {
    id: Option<String>,
    input: LinkInput,
    image: Option<ImageUpload>,
}

async fn read_link_form(multipart: &mut Multipart) -> Result<LinkForm, String> {
    let mut form = LinkForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(format!("failed to read form: {e}")),
        };
        let name = field.name().unwrap_or("").to_string();
        if name == "thumbnail" {
            let file_name = field.file_name().unwrap_or("").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| format!("failed to read image: {e}"))?;
            // An empty file input still submits a nameless, empty part.
            if !(file_name.is_empty() && data.is_empty()) {
                form.image = Some(ImageUpload {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| format!("failed to read form: {e}"))?;
        match name.as_str() {
            "id" if !value.trim().is_empty() => form.id = Some(value.trim().to_string()),
            "title" => form.input.title = value,
            "url" => form.input.url = value,
            "description" => form.input.description = Some(value),
            "cta_text" => form.input.cta_text = Some(value),
            _ => {}
        }
    }
    Ok(form)
}

pub async fn save_link_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    // Read the body before taking the lock.
    let form = read_link_form(&mut multipart).await;

    let st = state.lock().await;
    let (session, _) = match require_page_session(&st, &jar) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let form = match form {
        Ok(form) => form,
        Err(msg) => return redirect_with_notice(jar, "/dashboard", Notice::error(msg)),
    };

    let backend = st.backend(now_millis());
    match &form.id {
        Some(id) => match backend.update_link(&session, id, &form.input, form.image.as_ref()) {
            Ok(_) => redirect_with_notice(jar, "/dashboard", Notice::success("Link updated")),
            Err(e @ ServiceError::NotFound(_)) => {
                redirect_with_notice(jar, "/dashboard", Notice::error(e.to_string()))
            }
            Err(e) => redirect_with_notice(
                jar,
                &format!("/dashboard?edit={id}"),
                Notice::error(e.to_string()),
            ),
        },
        None => match backend.create_link(&session, &form.input, form.image.as_ref()) {
            Ok(_) => redirect_with_notice(jar, "/dashboard", Notice::success("Link created")),
            Err(e) => redirect_with_notice(jar, "/dashboard", Notice::error(e.to_string())),
        },
    }
}

pub async fn delete_link_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(link_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    let (session, _) = match require_page_session(&st, &jar) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let notice = match st.backend(now_millis()).delete_link(&session, &link_id) {
        Ok(()) => Notice::success("Link deleted"),
        Err(e) => Notice::error(e.to_string()),
    };
    redirect_with_notice(jar, "/dashboard", notice)
}

pub async fn toggle_highlight_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(link_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    let (session, _) = match require_page_session(&st, &jar) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let notice = match st.backend(now_millis()).toggle_highlight(&session, &link_id) {
        Ok(link) if link.is_highlighted => Notice::success("Link highlighted"),
        Ok(_) => Notice::success("Highlight removed"),
        Err(e) => Notice::error(e.to_string()),
    };
    redirect_with_notice(jar, "/dashboard", notice)
}

pub async fn toggle_active_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(link_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    let (session, _) = match require_page_session(&st, &jar) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let notice = match st.backend(now_millis()).toggle_active(&session, &link_id) {
        Ok(link) if link.is_active => Notice::success("Link is now visible"),
        Ok(_) => Notice::success("Link hidden from your page"),
        Err(e) => Notice::error(e.to_string()),
    };
    redirect_with_notice(jar, "/dashboard", notice)
}
