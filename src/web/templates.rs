//! Server-rendered pages: tera templates embedded in the binary.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use rust_embed::Embed;
use tera::{Context, Tera, Value};

#[derive(Embed)]
#[folder = "templates/"]
struct TemplateFiles;

/// Load every embedded template. Auto-escaping is on for `.html`.
pub fn load() -> Result<Tera, tera::Error> {
    let mut sources = Vec::new();
    for name in TemplateFiles::iter() {
        let Some(file) = TemplateFiles::get(&name) else {
            continue;
        };
        let body = String::from_utf8(file.data.into_owned())
            .map_err(|e| tera::Error::msg(format!("{name}: {e}")))?;
        sources.push((name.to_string(), body));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(sources)?;
    tera.register_filter("initial", initial_filter);
    Ok(tera)
}

fn initial_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let title = value.as_str().unwrap_or_default();
    Ok(Value::String(crate::links::initial(title)))
}

/// Render a template to an HTML response with the given status.
pub fn render(tera: &Tera, name: &str, context: &Context, status: StatusCode) -> Response {
    match tera.render(name, context) {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            crate::tlog!("WARNING: failed to render {}: {:?}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LinkRow, ProfileRow};

    #[test]
    fn all_templates_load() {
        let tera = load().unwrap();
        let names: Vec<&str> = tera.get_template_names().collect();
        for expected in [
            "landing.html",
            "login.html",
            "signup.html",
            "dashboard.html",
            "profile.html",
            "public.html",
            "auth_code_error.html",
            "not_found.html",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn public_page_escapes_user_content() {
        let tera = load().unwrap();
        let mut ctx = crate::web::handlers::base_context(None, false);
        ctx.insert(
            "profile",
            &ProfileRow {
                username: "jdoe".to_string(),
                full_name: "<script>alert(1)</script>".to_string(),
                ..Default::default()
            },
        );
        ctx.insert(
            "highlighted",
            &Some(LinkRow {
                id: "l1".to_string(),
                title: "github".to_string(),
                cta_text: "Visit".to_string(),
                ..Default::default()
            }),
        );
        ctx.insert("links", &Vec::<LinkRow>::new());
        ctx.insert("socials", &Vec::<crate::services::SocialLink>::new());

        let html = tera.render("public.html", &ctx).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        // Placeholder initial for a highlighted link without a thumbnail.
        assert!(html.contains(">G<"));
    }
}
