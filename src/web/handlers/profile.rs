//! Profile editor: fields, social handles and avatar upload.

use axum::extract::State;
use axum::response::Response;
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::Multipart;

use crate::links::{ImageUpload, MAX_IMAGE_BYTES};
use crate::services::{social_links, ProfileService, ProfileUpdate};
use crate::social::SocialPlatform;
use crate::web::handlers::render_page;
use crate::web::session::require_page_session;
use crate::web::state::SharedState;
use crate::web::utils::{now_millis, redirect_with_notice, Notice};

pub async fn profile_page_handler(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let st = state.lock().await;
    let (_, profile) = match require_page_session(&st, &jar) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let platforms: Vec<serde_json::Value> = SocialPlatform::ALL
        .iter()
        .map(|p| {
            let value = match p {
                SocialPlatform::Instagram => &profile.instagram_url,
                SocialPlatform::Twitter => &profile.twitter_url,
                SocialPlatform::Facebook => &profile.facebook_url,
                SocialPlatform::Linkedin => &profile.linkedin_url,
                SocialPlatform::Youtube => &profile.youtube_url,
            };
            serde_json::json!({
                "field": format!("{}_url", p.key()),
                "label": p.label(),
                "prefix": p.url_prefix(),
                "value": value.as_deref().unwrap_or_default(),
            })
        })
        .collect();
    let page_url = format!("{}/{}", st.public_url, profile.username);
    let socials = social_links(&profile);
    render_page(&st, jar, "profile.html", true, |ctx| {
        ctx.insert("profile", &profile);
        ctx.insert("platforms", &platforms);
        ctx.insert("socials", &socials);
        ctx.insert("page_url", &page_url);
        ctx.insert("max_image_bytes", &MAX_IMAGE_BYTES);
    })
}

pub async fn save_profile_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(update): Form<ProfileUpdate>,
) -> Response {
    let st = state.lock().await;
    let (session, _) = match require_page_session(&st, &jar) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let notice = match st.backend(now_millis()).update_profile(&session, &update) {
        Ok(_) => Notice::success("Profile saved"),
        Err(e) => Notice::error(e.to_string()),
    };
    redirect_with_notice(jar, "/dashboard/profile", notice)
}

async fn read_avatar(multipart: &mut Multipart) -> Result<Option<ImageUpload>, String> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return Err(format!("failed to read upload: {e}")),
        };
        if field.name() != Some("avatar") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| format!("failed to read upload: {e}"))?;
        return Ok(Some(ImageUpload {
            file_name,
            content_type,
            data: data.to_vec(),
        }));
    }
}

pub async fn upload_avatar_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let upload = read_avatar(&mut multipart).await;

    let st = state.lock().await;
    let (session, _) = match require_page_session(&st, &jar) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let notice = match upload {
        Ok(Some(image)) => match st.backend(now_millis()).update_avatar(&session, &image) {
            Ok(_) => Notice::success("Avatar updated"),
            Err(e) => Notice::error(e.to_string()),
        },
        Ok(None) => Notice::error("choose an image to upload"),
        Err(msg) => Notice::error(msg),
    };
    redirect_with_notice(jar, "/dashboard/profile", notice)
}
