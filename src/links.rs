//! Link field rules, display ordering, and image upload validation.

use std::cmp::Ordering;

use crate::storage::LinkRow;

pub const MAX_DESCRIPTION_CHARS: usize = 150;
/// Upper bound for avatars and thumbnails.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_CTA_TEXT: &str = "Visit";

/// Raster image types accepted for avatars and thumbnails, with the
/// extension their stored blobs get.
const IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("no image data received")]
    Empty,
    #[error("image must be at most 5MB (got {0} bytes)")]
    TooLarge(usize),
    #[error("file must be an image (got {0})")]
    NotAnImage(String),
    #[error("unsupported image type {0}, use PNG, JPEG, GIF or WebP")]
    Unsupported(String),
}

/// Stored extension for a declared content type, ignoring parameters.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    IMAGE_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Content type a stored blob is served with. Anything not produced by
/// an accepted upload is served as opaque bytes.
pub fn content_type_for(blob_name: &str) -> &'static str {
    let ext = blob_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    IMAGE_TYPES
        .iter()
        .find(|(_, known)| known.eq_ignore_ascii_case(ext))
        .map(|(mime, _)| *mime)
        .unwrap_or("application/octet-stream")
}

/// An image received from a form, not yet stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageUpload {
    /// Size and type checks, run before anything touches storage.
    pub fn validate(&self) -> Result<(), ImageError> {
        self.extension().map(|_| ())
    }

    /// Extension for the stored name, taken from the declared type.
    /// The uploaded file name never decides it.
    pub fn extension(&self) -> Result<&'static str, ImageError> {
        if self.data.is_empty() {
            return Err(ImageError::Empty);
        }
        if self.data.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge(self.data.len()));
        }
        if !self.content_type.starts_with("image/") {
            return Err(ImageError::NotAnImage(self.content_type.clone()));
        }
        extension_for(&self.content_type)
            .ok_or_else(|| ImageError::Unsupported(self.content_type.clone()))
    }

    /// Generated blob name: `{owner}-{unix millis}-{random}.{ext}`.
    pub fn blob_name(&self, owner_id: &str, now_millis: u64) -> Result<String, ImageError> {
        let ext = self.extension()?;
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        Ok(format!("{owner_id}-{now_millis}-{}.{ext}", &nonce[..8]))
    }
}

/// Trim and cut a description to [`MAX_DESCRIPTION_CHARS`]; empty becomes `None`.
pub fn clean_description(input: Option<&str>) -> Option<String> {
    let trimmed = input.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_DESCRIPTION_CHARS).collect())
}

/// Trimmed call-to-action text, defaulting when blank.
pub fn clean_cta_text(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        DEFAULT_CTA_TEXT.to_string()
    } else {
        trimmed.to_string()
    }
}

fn display_order(a: &LinkRow, b: &LinkRow) -> Ordering {
    b.is_highlighted
        .cmp(&a.is_highlighted)
        .then(a.position.cmp(&b.position))
}

/// Highlighted link first, then ascending position.
pub fn sort_for_display(links: &mut [LinkRow]) {
    links.sort_by(display_order);
}

/// First letter of a title, uppercased, for thumbnail placeholders.
pub fn initial(title: &str) -> String {
    title
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: &str, position: i64, highlighted: bool) -> LinkRow {
        LinkRow {
            id: id.to_string(),
            position,
            is_highlighted: highlighted,
            ..Default::default()
        }
    }

    fn image(name: &str, content_type: &str, len: usize) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            data: vec![0u8; len],
        }
    }

    #[test]
    fn highlighted_link_sorts_first_regardless_of_position() {
        let mut links = vec![link("a", 0, false), link("b", 1, true)];
        sort_for_display(&mut links);
        assert_eq!(links[0].id, "b");
        assert_eq!(links[1].id, "a");
    }

    #[test]
    fn remaining_links_follow_position() {
        let mut links = vec![
            link("d", 3, false),
            link("a", 0, false),
            link("c", 2, true),
            link("b", 1, false),
        ];
        sort_for_display(&mut links);
        let ids: Vec<&str> = links.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b", "d"]);
        assert!(links[1..].windows(2).all(|w| w[0].position < w[1].position));
    }

    #[test]
    fn description_is_truncated_to_150_chars() {
        let long = "é".repeat(200);
        let cleaned = clean_description(Some(&long)).unwrap();
        assert_eq!(cleaned.chars().count(), MAX_DESCRIPTION_CHARS);

        assert_eq!(clean_description(Some("  short  ")).as_deref(), Some("short"));
        assert_eq!(clean_description(Some("   ")), None);
        assert_eq!(clean_description(None), None);
    }

    #[test]
    fn cta_defaults_when_blank() {
        assert_eq!(clean_cta_text("  "), DEFAULT_CTA_TEXT);
        assert_eq!(clean_cta_text(" Buy "), "Buy");
    }

    #[test]
    fn image_validation() {
        assert_eq!(image("a.png", "image/png", 10).validate(), Ok(()));
        assert_eq!(
            image("a.png", "image/png", MAX_IMAGE_BYTES).validate(),
            Ok(())
        );
        assert_eq!(
            image("a.png", "image/png", MAX_IMAGE_BYTES + 1).validate(),
            Err(ImageError::TooLarge(MAX_IMAGE_BYTES + 1))
        );
        assert_eq!(
            image("a.pdf", "application/pdf", 10).validate(),
            Err(ImageError::NotAnImage("application/pdf".to_string()))
        );
        assert_eq!(
            image("a.svg", "image/svg+xml", 10).validate(),
            Err(ImageError::Unsupported("image/svg+xml".to_string()))
        );
        assert_eq!(image("a.png", "image/png", 0).validate(), Err(ImageError::Empty));
    }

    #[test]
    fn blob_names_use_owner_time_and_declared_type() {
        let name = image("Photo.JPG", "image/jpeg", 1)
            .blob_name("u1", 1700000000123)
            .unwrap();
        assert!(name.starts_with("u1-1700000000123-"));
        assert!(name.ends_with(".jpg"));

        let guessed = image("avatar", "image/png; charset=binary", 1)
            .blob_name("u1", 5)
            .unwrap();
        assert!(guessed.starts_with("u1-5-") && guessed.ends_with(".png"));

        // Same owner and millisecond still yields distinct names.
        let again = image("avatar", "image/png", 1).blob_name("u1", 5).unwrap();
        assert_ne!(guessed, again);
    }

    #[test]
    fn uploaded_file_name_cannot_pick_the_served_type() {
        let html = image("evil.html", "image/png", 10);
        assert_eq!(html.extension(), Ok("png"));
        let name = html.blob_name("u1", 5).unwrap();
        assert!(name.ends_with(".png"));
        assert_eq!(content_type_for(&name), "image/png");
    }

    #[test]
    fn served_types_are_limited_to_accepted_images() {
        assert_eq!(content_type_for("u1-5-abcd.webp"), "image/webp");
        assert_eq!(content_type_for("u1-5-abcd.JPG"), "image/jpeg");
        assert_eq!(content_type_for("u1-5.html"), "application/octet-stream");
        assert_eq!(content_type_for("u1-5.svg"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn initial_uppercases_first_char() {
        assert_eq!(initial("github"), "G");
        assert_eq!(initial(""), "");
    }
}
