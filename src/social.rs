//! Social network handles shown on the public page.
//!
//! Users may paste either a bare handle or a full profile URL; both are
//! stored as a bare handle and expanded back into a URL on render.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Instagram,
    Twitter,
    Facebook,
    Linkedin,
    Youtube,
}

impl SocialPlatform {
    pub const ALL: [SocialPlatform; 5] = [
        SocialPlatform::Instagram,
        SocialPlatform::Twitter,
        SocialPlatform::Facebook,
        SocialPlatform::Linkedin,
        SocialPlatform::Youtube,
    ];

    /// Lowercase name, also the second-level domain of the platform.
    pub fn key(&self) -> &'static str {
        match self {
            SocialPlatform::Instagram => "instagram",
            SocialPlatform::Twitter => "twitter",
            SocialPlatform::Facebook => "facebook",
            SocialPlatform::Linkedin => "linkedin",
            SocialPlatform::Youtube => "youtube",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SocialPlatform::Instagram => "Instagram",
            SocialPlatform::Twitter => "Twitter",
            SocialPlatform::Facebook => "Facebook",
            SocialPlatform::Linkedin => "LinkedIn",
            SocialPlatform::Youtube => "YouTube",
        }
    }

    /// URL prefix a handle is appended to.
    pub fn url_prefix(&self) -> &'static str {
        match self {
            SocialPlatform::Instagram => "https://instagram.com/",
            SocialPlatform::Twitter => "https://twitter.com/",
            SocialPlatform::Facebook => "https://facebook.com/",
            SocialPlatform::Linkedin => "https://linkedin.com/in/",
            SocialPlatform::Youtube => "https://youtube.com/",
        }
    }

    pub fn profile_url(&self, handle: &str) -> String {
        format!("{}{}", self.url_prefix(), handle)
    }
}

/// Reduce a pasted profile URL or handle to the bare handle.
///
/// Strips, in order: surrounding whitespace, an `http://`/`https://`
/// scheme, a leading `www.`, the first `<platform>.com/`, the first
/// `<platform>.com`, and any leading or trailing slashes.
pub fn normalize_handle(platform: SocialPlatform, input: &str) -> String {
    let mut handle = input.trim();
    if handle.is_empty() {
        return String::new();
    }
    handle = handle
        .strip_prefix("https://")
        .or_else(|| handle.strip_prefix("http://"))
        .unwrap_or(handle);
    handle = handle.strip_prefix("www.").unwrap_or(handle);

    let domain = format!("{}.com", platform.key());
    let handle = handle.replacen(&format!("{domain}/"), "", 1);
    let handle = handle.replacen(&domain, "", 1);
    handle.trim_matches('/').to_string()
}

/// [`normalize_handle`], with empty results mapped to `None` for storage.
pub fn normalize_optional(platform: SocialPlatform, input: Option<&str>) -> Option<String> {
    let handle = normalize_handle(platform, input.unwrap_or_default());
    (!handle.is_empty()).then_some(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_url_becomes_bare_handle() {
        assert_eq!(
            normalize_handle(SocialPlatform::Instagram, "https://www.instagram.com/jdoe/"),
            "jdoe"
        );
        assert_eq!(
            normalize_handle(SocialPlatform::Twitter, "http://twitter.com/jdoe"),
            "jdoe"
        );
        assert_eq!(
            normalize_handle(SocialPlatform::Youtube, "youtube.com/@jdoe"),
            "@jdoe"
        );
    }

    #[test]
    fn bare_handle_is_unchanged() {
        assert_eq!(normalize_handle(SocialPlatform::Instagram, "jdoe"), "jdoe");
        assert_eq!(normalize_handle(SocialPlatform::Facebook, " jane.doe "), "jane.doe");
    }

    #[test]
    fn other_platform_domains_are_kept() {
        // Only the matching platform's domain is stripped.
        assert_eq!(
            normalize_handle(SocialPlatform::Instagram, "https://twitter.com/jdoe"),
            "twitter.com/jdoe"
        );
    }

    #[test]
    fn empty_input_maps_to_none() {
        assert_eq!(normalize_optional(SocialPlatform::Linkedin, Some("  ")), None);
        assert_eq!(normalize_optional(SocialPlatform::Linkedin, None), None);
        assert_eq!(
            normalize_optional(SocialPlatform::Linkedin, Some("linkedin.com/jdoe")),
            Some("jdoe".to_string())
        );
    }

    #[test]
    fn profile_urls() {
        assert_eq!(
            SocialPlatform::Linkedin.profile_url("jdoe"),
            "https://linkedin.com/in/jdoe"
        );
        assert_eq!(
            SocialPlatform::Instagram.profile_url("jdoe"),
            "https://instagram.com/jdoe"
        );
    }
}
