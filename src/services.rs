//! Application services behind both the HTML pages and the JSON API.
//!
//! Every operation that acts on a user's data takes the caller's
//! [`Session`] explicitly. Links owned by someone else are reported as
//! not found. Blob cleanup after a committed row change is best-effort:
//! failures are logged and never undo the row change.

use serde::{Deserialize, Serialize};

use crate::auth::{normalize_username, AuthError, Session};
use crate::blobs::{BlobStore, Bucket};
use crate::links::{clean_cta_text, clean_description, sort_for_display, ImageError, ImageUpload};
use crate::social::{normalize_optional, SocialPlatform};
use crate::storage::{AnalyticsRow, LinkRow, ProfileRow, Storage, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("{0}")]
    Invalid(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Editable link fields as submitted by a form or JSON body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkInput {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cta_text: Option<String>,
}

/// [`LinkInput`] after the field rules have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanLink {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub cta_text: String,
}

impl LinkInput {
    pub fn validate(&self) -> Result<CleanLink, ServiceError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ServiceError::Invalid("title is required".to_string()));
        }
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ServiceError::Invalid("url is required".to_string()));
        }
        if url.chars().any(char::is_control) {
            return Err(ServiceError::Invalid(
                "url must not contain control characters".to_string(),
            ));
        }
        let parsed = url::Url::parse(url)
            .map_err(|e| ServiceError::Invalid(format!("invalid url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ServiceError::Invalid(
                "url must start with http:// or https://".to_string(),
            ));
        }
        Ok(CleanLink {
            title: title.to_string(),
            url: parsed.to_string(),
            description: clean_description(self.description.as_deref()),
            cta_text: clean_cta_text(self.cta_text.as_deref().unwrap_or_default()),
        })
    }
}

/// A link with its summed click count, as shown on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct LinkWithClicks {
    #[serde(flatten)]
    pub link: LinkRow,
    pub clicks: u64,
}

/// Editable profile fields. `avatar_url` is changed only by avatar upload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub instagram_url: Option<String>,
    #[serde(default)]
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub facebook_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub youtube_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SocialLink {
    pub platform: SocialPlatform,
    pub label: &'static str,
    pub handle: String,
    pub url: String,
}

/// Everything the public page renders.
#[derive(Debug, Clone, Serialize)]
pub struct PublicPage {
    pub profile: ProfileRow,
    pub highlighted: Option<LinkRow>,
    pub links: Vec<LinkRow>,
    pub socials: Vec<SocialLink>,
}

/// The social links of a profile with a non-empty handle, in display order.
pub fn social_links(profile: &ProfileRow) -> Vec<SocialLink> {
    SocialPlatform::ALL
        .iter()
        .filter_map(|platform| {
            let handle = match platform {
                SocialPlatform::Instagram => profile.instagram_url.as_deref(),
                SocialPlatform::Twitter => profile.twitter_url.as_deref(),
                SocialPlatform::Facebook => profile.facebook_url.as_deref(),
                SocialPlatform::Linkedin => profile.linkedin_url.as_deref(),
                SocialPlatform::Youtube => profile.youtube_url.as_deref(),
            }?;
            (!handle.is_empty()).then(|| SocialLink {
                platform: *platform,
                label: platform.label(),
                handle: handle.to_string(),
                url: platform.profile_url(handle),
            })
        })
        .collect()
}

pub trait LinkService {
    /// All of the caller's links in position order, with click counts.
    fn list_links(&self, session: &Session) -> Result<Vec<LinkWithClicks>, ServiceError>;
    fn get_link(&self, session: &Session, id: &str) -> Result<LinkRow, ServiceError>;
    fn create_link(
        &self,
        session: &Session,
        input: &LinkInput,
        image: Option<&ImageUpload>,
    ) -> Result<LinkRow, ServiceError>;
    fn update_link(
        &self,
        session: &Session,
        id: &str,
        input: &LinkInput,
        image: Option<&ImageUpload>,
    ) -> Result<LinkRow, ServiceError>;
    fn delete_link(&self, session: &Session, id: &str) -> Result<(), ServiceError>;
    fn toggle_highlight(&self, session: &Session, id: &str) -> Result<LinkRow, ServiceError>;
    fn toggle_active(&self, session: &Session, id: &str) -> Result<LinkRow, ServiceError>;
    /// Record one click on an active link and return it. Needs no session.
    fn record_click(&self, link_id: &str) -> Result<LinkRow, ServiceError>;
}

pub trait ProfileService {
    fn get_profile(&self, session: &Session) -> Result<ProfileRow, ServiceError>;
    fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<ProfileRow, ServiceError>;
    fn update_avatar(
        &self,
        session: &Session,
        image: &ImageUpload,
    ) -> Result<ProfileRow, ServiceError>;
    fn public_page(&self, username: &str) -> Result<PublicPage, ServiceError>;
}

/// Services over the SQLite database and the filesystem blob store.
///
/// Built per request while the state lock is held; `now_millis` is the
/// request time used for timestamps and generated blob names.
pub struct SqliteBackend<'a> {
    storage: &'a Storage,
    blobs: &'a BlobStore,
    now_millis: u64,
}

impl<'a> SqliteBackend<'a> {
    pub fn new(storage: &'a Storage, blobs: &'a BlobStore, now_millis: u64) -> Self {
        Self {
            storage,
            blobs,
            now_millis,
        }
    }

    fn now_secs(&self) -> u64 {
        self.now_millis / 1000
    }

    fn owned_link(&self, session: &Session, id: &str) -> Result<LinkRow, ServiceError> {
        match self.storage.get_link(id)? {
            Some(link) if link.user_id == session.user_id => Ok(link),
            _ => Err(ServiceError::NotFound("link".to_string())),
        }
    }

    fn reload_link(&self, id: &str) -> Result<LinkRow, ServiceError> {
        self.storage
            .get_link(id)?
            .ok_or_else(|| ServiceError::NotFound("link".to_string()))
    }

    fn upload(
        &self,
        bucket: Bucket,
        owner_id: &str,
        image: &ImageUpload,
    ) -> Result<String, ServiceError> {
        let name = image.blob_name(owner_id, self.now_millis)?;
        Ok(self.blobs.put(bucket, &name, &image.data)?)
    }

    fn remove_blob(&self, bucket: Bucket, url: &str) {
        if let Err(e) = self.blobs.delete_by_url(bucket, url) {
            crate::tlog!("WARNING: failed to remove {} blob {}: {}", bucket, url, e);
        }
    }
}

impl LinkService for SqliteBackend<'_> {
    fn list_links(&self, session: &Session) -> Result<Vec<LinkWithClicks>, ServiceError> {
        let links = self.storage.list_links(&session.user_id)?;
        let mut result = Vec::with_capacity(links.len());
        for link in links {
            let clicks = self.storage.count_clicks(&link.id)?;
            result.push(LinkWithClicks { link, clicks });
        }
        Ok(result)
    }

    fn get_link(&self, session: &Session, id: &str) -> Result<LinkRow, ServiceError> {
        self.owned_link(session, id)
    }

    fn create_link(
        &self,
        session: &Session,
        input: &LinkInput,
        image: Option<&ImageUpload>,
    ) -> Result<LinkRow, ServiceError> {
        let clean = input.validate()?;
        if let Some(image) = image {
            image.validate()?;
        }
        let position = self.storage.count_links(&session.user_id)?;
        let thumbnail_url = match image {
            Some(image) => Some(self.upload(Bucket::Thumbnails, &session.user_id, image)?),
            None => None,
        };

        let now = self.now_secs();
        let row = LinkRow {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: session.user_id.clone(),
            title: clean.title,
            url: clean.url,
            description: clean.description,
            thumbnail_url,
            cta_text: clean.cta_text,
            position,
            is_active: true,
            is_highlighted: false,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = self.storage.insert_link(&row) {
            if let Some(url) = &row.thumbnail_url {
                self.remove_blob(Bucket::Thumbnails, url);
            }
            return Err(e.into());
        }
        crate::tlog!(
            "links: created {} for {} at position {}",
            crate::logging::link_id(&row.id),
            crate::logging::user_id(&row.user_id),
            row.position
        );
        Ok(row)
    }

    fn update_link(
        &self,
        session: &Session,
        id: &str,
        input: &LinkInput,
        image: Option<&ImageUpload>,
    ) -> Result<LinkRow, ServiceError> {
        let existing = self.owned_link(session, id)?;
        let clean = input.validate()?;
        if let Some(image) = image {
            image.validate()?;
        }

        let new_thumbnail = match image {
            Some(image) => Some(self.upload(Bucket::Thumbnails, &session.user_id, image)?),
            None => None,
        };
        let row = LinkRow {
            title: clean.title,
            url: clean.url,
            description: clean.description,
            thumbnail_url: new_thumbnail
                .clone()
                .or_else(|| existing.thumbnail_url.clone()),
            cta_text: clean.cta_text,
            updated_at: self.now_secs(),
            ..existing.clone()
        };
        if let Err(e) = self.storage.update_link_content(&row) {
            if let Some(url) = &new_thumbnail {
                self.remove_blob(Bucket::Thumbnails, url);
            }
            return Err(e.into());
        }
        if new_thumbnail.is_some() {
            if let Some(old) = &existing.thumbnail_url {
                self.remove_blob(Bucket::Thumbnails, old);
            }
        }
        crate::tlog!("links: updated {}", crate::logging::link_id(id));
        self.reload_link(id)
    }

    fn delete_link(&self, session: &Session, id: &str) -> Result<(), ServiceError> {
        let existing = self.owned_link(session, id)?;
        if !self.storage.delete_link(id)? {
            return Err(ServiceError::NotFound("link".to_string()));
        }
        if let Some(url) = &existing.thumbnail_url {
            self.remove_blob(Bucket::Thumbnails, url);
        }
        crate::tlog!(
            "links: deleted {} for {}",
            crate::logging::link_id(id),
            crate::logging::user_id(&session.user_id)
        );
        Ok(())
    }

    fn toggle_highlight(&self, session: &Session, id: &str) -> Result<LinkRow, ServiceError> {
        let existing = self.owned_link(session, id)?;
        let highlighted = !existing.is_highlighted;
        if !self
            .storage
            .set_link_highlight(&session.user_id, id, highlighted, self.now_secs())?
        {
            return Err(ServiceError::NotFound("link".to_string()));
        }
        crate::tlog!(
            "links: {} {}",
            if highlighted { "highlighted" } else { "unhighlighted" },
            crate::logging::link_id(id)
        );
        self.reload_link(id)
    }

    fn toggle_active(&self, session: &Session, id: &str) -> Result<LinkRow, ServiceError> {
        let existing = self.owned_link(session, id)?;
        let active = !existing.is_active;
        self.storage.set_link_active(id, active, self.now_secs())?;
        crate::tlog!(
            "links: {} {}",
            if active { "showing" } else { "hiding" },
            crate::logging::link_id(id)
        );
        self.reload_link(id)
    }

    fn record_click(&self, link_id: &str) -> Result<LinkRow, ServiceError> {
        let link = match self.storage.get_link(link_id)? {
            Some(link) if link.is_active => link,
            _ => return Err(ServiceError::NotFound("link".to_string())),
        };
        let now = self.now_secs();
        self.storage.insert_analytics(&AnalyticsRow {
            id: uuid::Uuid::new_v4().to_string(),
            link_id: link.id.clone(),
            clicks: 1,
            last_clicked_at: now,
            created_at: now,
            updated_at: now,
        })?;
        Ok(link)
    }
}

impl ProfileService for SqliteBackend<'_> {
    fn get_profile(&self, session: &Session) -> Result<ProfileRow, ServiceError> {
        self.storage
            .get_profile(&session.user_id)?
            .ok_or_else(|| ServiceError::NotFound("profile".to_string()))
    }

    fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<ProfileRow, ServiceError> {
        let existing = self.get_profile(session)?;
        let username = normalize_username(&update.username).map_err(|e| match e {
            AuthError::Invalid(msg) => ServiceError::Invalid(msg),
            other => ServiceError::Invalid(other.to_string()),
        })?;
        if username != existing.username {
            if let Some(other) = self.storage.get_profile_by_username(&username)? {
                if other.id != existing.id {
                    return Err(ServiceError::Conflict(format!(
                        "username '{username}' is already taken"
                    )));
                }
            }
        }

        let bio = update
            .bio
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string);
        let row = ProfileRow {
            username,
            full_name: update.full_name.trim().to_string(),
            bio,
            instagram_url: normalize_optional(
                SocialPlatform::Instagram,
                update.instagram_url.as_deref(),
            ),
            twitter_url: normalize_optional(SocialPlatform::Twitter, update.twitter_url.as_deref()),
            facebook_url: normalize_optional(
                SocialPlatform::Facebook,
                update.facebook_url.as_deref(),
            ),
            linkedin_url: normalize_optional(
                SocialPlatform::Linkedin,
                update.linkedin_url.as_deref(),
            ),
            youtube_url: normalize_optional(SocialPlatform::Youtube, update.youtube_url.as_deref()),
            updated_at: self.now_secs(),
            ..existing
        };
        match self.storage.update_profile(&row) {
            Ok(_) => {}
            Err(e) if e.is_constraint_violation() => {
                return Err(ServiceError::Conflict(format!(
                    "username '{}' is already taken",
                    row.username
                )))
            }
            Err(e) => return Err(e.into()),
        }
        crate::tlog!("profiles: updated {}", crate::logging::user_id(&row.id));
        self.get_profile(session)
    }

    fn update_avatar(
        &self,
        session: &Session,
        image: &ImageUpload,
    ) -> Result<ProfileRow, ServiceError> {
        let existing = self.get_profile(session)?;
        let url = self.upload(Bucket::Avatars, &existing.id, image)?;
        if let Err(e) = self
            .storage
            .update_profile_avatar(&existing.id, Some(&url), self.now_secs())
        {
            self.remove_blob(Bucket::Avatars, &url);
            return Err(e.into());
        }
        if let Some(old) = &existing.avatar_url {
            self.remove_blob(Bucket::Avatars, old);
        }
        crate::tlog!(
            "profiles: new avatar for {} ({} bytes)",
            crate::logging::user_id(&existing.id),
            image.data.len()
        );
        self.get_profile(session)
    }

    fn public_page(&self, username: &str) -> Result<PublicPage, ServiceError> {
        let username = username.trim().to_lowercase();
        let profile = self
            .storage
            .get_profile_by_username(&username)?
            .ok_or_else(|| ServiceError::NotFound("profile".to_string()))?;
        let mut links = self.storage.list_active_links(&profile.id)?;
        sort_for_display(&mut links);

        let highlighted = match links.first() {
            Some(first) if first.is_highlighted => Some(links.remove(0)),
            _ => None,
        };
        let socials = social_links(&profile);
        Ok(PublicPage {
            profile,
            highlighted,
            links,
            socials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{sign_up, SignUp};
    use crate::links::MAX_IMAGE_BYTES;

    struct Fixture {
        dir: tempfile::TempDir,
        storage: Storage,
        blobs: BlobStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let blobs = BlobStore::open(dir.path(), "http://localhost:3000").unwrap();
            Self {
                dir,
                storage: Storage::open_in_memory().unwrap(),
                blobs,
            }
        }

        /// Database in a file, so a second connection can alter it.
        fn on_disk() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let blobs = BlobStore::open(&dir.path().join("blobs"), "http://localhost:3000").unwrap();
            let storage = Storage::open(&dir.path().join("linkshare.db")).unwrap();
            Self { dir, storage, blobs }
        }

        fn backend(&self, now_millis: u64) -> SqliteBackend<'_> {
            SqliteBackend::new(&self.storage, &self.blobs, now_millis)
        }

        fn user(&self, email: &str, username: &str) -> Session {
            sign_up(
                &self.storage,
                &SignUp {
                    email: email.to_string(),
                    password: "hunter22".to_string(),
                    username: username.to_string(),
                    full_name: "Jane Doe".to_string(),
                },
                1,
                3600,
            )
            .unwrap()
        }
    }

    fn input(title: &str) -> LinkInput {
        LinkInput {
            title: title.to_string(),
            url: "https://example.com".to_string(),
            ..Default::default()
        }
    }

    fn png(len: usize) -> ImageUpload {
        ImageUpload {
            file_name: "thumb.png".to_string(),
            content_type: "image/png".to_string(),
            data: vec![7u8; len],
        }
    }

    #[test]
    fn link_input_rules() {
        assert!(input("  ").validate().is_err());
        let mut bad = input("Blog");
        bad.url = "ftp://example.com".to_string();
        assert!(matches!(bad.validate(), Err(ServiceError::Invalid(_))));
        bad.url = "not a url".to_string();
        assert!(matches!(bad.validate(), Err(ServiceError::Invalid(_))));

        let clean = LinkInput {
            title: " Blog ".to_string(),
            url: "https://blog.example.com".to_string(),
            description: Some("x".repeat(200)),
            cta_text: Some(" ".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(clean.title, "Blog");
        assert_eq!(clean.description.unwrap().chars().count(), 150);
        assert_eq!(clean.cta_text, "Visit");
    }

    #[test]
    fn stored_urls_are_normalized_and_header_safe() {
        let mut link = input("Blog");
        link.url = "https://exa\nmple.com/".to_string();
        assert!(matches!(link.validate(), Err(ServiceError::Invalid(_))));
        link.url = "https://example.com/a\tb".to_string();
        assert!(matches!(link.validate(), Err(ServiceError::Invalid(_))));

        link.url = "  HTTPS://Bücher.example/ä ö?q=1 ".to_string();
        let clean = link.validate().unwrap();
        assert_eq!(clean.url, "https://xn--bcher-kva.example/%C3%A4%20%C3%B6?q=1");
        assert!(axum::http::HeaderValue::from_str(&clean.url).is_ok());

        link.url = "https://blog.example.com/post".to_string();
        assert_eq!(link.validate().unwrap().url, "https://blog.example.com/post");
    }

    #[test]
    fn create_assigns_position_from_count() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");
        let backend = fx.backend(1_000_000);

        let a = backend.create_link(&session, &input("A"), None).unwrap();
        let b = backend.create_link(&session, &input("B"), None).unwrap();
        assert_eq!((a.position, b.position), (0, 1));
        assert!(a.is_active && !a.is_highlighted);
        assert_eq!(a.cta_text, "Visit");

        let listed = backend.list_links(&session).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].link.id, a.id);
    }

    #[test]
    fn create_with_thumbnail_stores_blob() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");
        let link = fx
            .backend(1_700_000_000_123)
            .create_link(&session, &input("A"), Some(&png(16)))
            .unwrap();

        let url = link.thumbnail_url.unwrap();
        let name = crate::blobs::name_from_url(&url).unwrap();
        assert!(url.contains("/storage/thumbnails/"));
        assert!(name.starts_with(&format!("{}-1700000000123-", session.user_id)));
        assert!(name.ends_with(".png"));
        assert!(fx.blobs.get(Bucket::Thumbnails, name).unwrap().is_some());
    }

    #[test]
    fn uploads_in_the_same_millisecond_get_distinct_blobs() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");
        let backend = fx.backend(1_700_000_000_123);
        let a = backend.create_link(&session, &input("A"), Some(&png(4))).unwrap();
        let b = backend.create_link(&session, &input("B"), Some(&png(4))).unwrap();
        assert_ne!(a.thumbnail_url, b.thumbnail_url);
    }

    #[test]
    fn invalid_image_writes_nothing() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");
        let backend = fx.backend(5);

        let err = backend
            .create_link(&session, &input("A"), Some(&png(MAX_IMAGE_BYTES + 1)))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Image(ImageError::TooLarge(_))));

        let mut pdf = png(10);
        pdf.content_type = "application/pdf".to_string();
        let err = backend.create_link(&session, &input("A"), Some(&pdf)).unwrap_err();
        assert!(matches!(err, ServiceError::Image(ImageError::NotAnImage(_))));

        assert_eq!(fx.storage.count_links(&session.user_id).unwrap(), 0);
    }

    #[test]
    fn update_replaces_thumbnail_and_keeps_ordering() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");
        let link = fx
            .backend(1000)
            .create_link(&session, &input("A"), Some(&png(4)))
            .unwrap();
        fx.backend(1500).toggle_highlight(&session, &link.id).unwrap();
        let old_name = crate::blobs::name_from_url(link.thumbnail_url.as_deref().unwrap())
            .unwrap()
            .to_string();

        let mut edit = input("A2");
        edit.description = Some("new".to_string());
        let updated = fx
            .backend(2000)
            .update_link(&session, &link.id, &edit, Some(&png(8)))
            .unwrap();

        assert_eq!(updated.title, "A2");
        assert_eq!(updated.description.as_deref(), Some("new"));
        assert_eq!(updated.position, 0);
        assert!(updated.is_highlighted);
        assert_ne!(updated.thumbnail_url, link.thumbnail_url);
        assert!(fx.blobs.get(Bucket::Thumbnails, &old_name).unwrap().is_none());
    }

    #[test]
    fn delete_removes_row_and_thumbnail() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");
        let backend = fx.backend(1000);
        let link = backend.create_link(&session, &input("A"), Some(&png(4))).unwrap();
        let name = crate::blobs::name_from_url(link.thumbnail_url.as_deref().unwrap())
            .unwrap()
            .to_string();

        backend.delete_link(&session, &link.id).unwrap();
        assert!(fx.storage.get_link(&link.id).unwrap().is_none());
        assert!(fx.blobs.get(Bucket::Thumbnails, &name).unwrap().is_none());
        assert!(matches!(
            backend.delete_link(&session, &link.id),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn highlight_moves_to_toggled_link() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");
        let backend = fx.backend(1000);
        let a = backend.create_link(&session, &input("A"), None).unwrap();
        let b = backend.create_link(&session, &input("B"), None).unwrap();

        assert!(backend.toggle_highlight(&session, &b.id).unwrap().is_highlighted);
        assert!(backend.toggle_highlight(&session, &a.id).unwrap().is_highlighted);
        assert!(!fx.storage.get_link(&b.id).unwrap().unwrap().is_highlighted);

        // Toggling the highlighted link clears it.
        assert!(!backend.toggle_highlight(&session, &a.id).unwrap().is_highlighted);
    }

    #[test]
    fn foreign_links_are_not_found() {
        let fx = Fixture::new();
        let jane = fx.user("jane@example.com", "jdoe");
        let bob = fx.user("bob@example.com", "bob");
        let backend = fx.backend(1000);
        let link = backend.create_link(&jane, &input("A"), None).unwrap();

        assert!(matches!(
            backend.toggle_highlight(&bob, &link.id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            backend.update_link(&bob, &link.id, &input("X"), None),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            backend.delete_link(&bob, &link.id),
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(fx.storage.get_link(&link.id).unwrap().unwrap().title, "A");
    }

    #[test]
    fn clicks_are_recorded_for_active_links_only() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");
        let backend = fx.backend(1000);
        let link = backend.create_link(&session, &input("A"), None).unwrap();

        backend.record_click(&link.id).unwrap();
        backend.record_click(&link.id).unwrap();
        assert_eq!(backend.list_links(&session).unwrap()[0].clicks, 2);

        backend.toggle_active(&session, &link.id).unwrap();
        assert!(matches!(
            backend.record_click(&link.id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            backend.record_click("missing"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn profile_update_normalizes_socials() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");
        let backend = fx.backend(9000);

        let profile = backend
            .update_profile(
                &session,
                &ProfileUpdate {
                    username: "JaneD".to_string(),
                    full_name: " Jane D ".to_string(),
                    bio: Some("  ".to_string()),
                    instagram_url: Some("https://www.instagram.com/jdoe/".to_string()),
                    linkedin_url: Some("jdoe".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(profile.username, "janed");
        assert_eq!(profile.full_name, "Jane D");
        assert_eq!(profile.bio, None);
        assert_eq!(profile.instagram_url.as_deref(), Some("jdoe"));
        assert_eq!(profile.linkedin_url.as_deref(), Some("jdoe"));
        assert_eq!(profile.twitter_url, None);
        assert_eq!(profile.updated_at, 9);
    }

    #[test]
    fn profile_update_rejects_taken_username() {
        let fx = Fixture::new();
        let jane = fx.user("jane@example.com", "jdoe");
        fx.user("bob@example.com", "bob");

        let err = fx
            .backend(1000)
            .update_profile(
                &jane,
                &ProfileUpdate {
                    username: "bob".to_string(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(fx.storage.get_profile(&jane.user_id).unwrap().unwrap().username, "jdoe");
    }

    #[test]
    fn avatar_upload_replaces_previous_blob() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");

        let first = fx.backend(1000).update_avatar(&session, &png(4)).unwrap();
        let first_url = first.avatar_url.unwrap();
        let first_name = crate::blobs::name_from_url(&first_url).unwrap().to_string();
        assert!(first_url.contains("/storage/avatars/"));

        let second = fx.backend(2000).update_avatar(&session, &png(4)).unwrap();
        assert_ne!(second.avatar_url.as_deref(), Some(first_url.as_str()));
        assert!(fx.blobs.get(Bucket::Avatars, &first_name).unwrap().is_none());
    }

    #[test]
    fn failed_avatar_update_keeps_previous_avatar() {
        let fx = Fixture::on_disk();
        let session = fx.user("jane@example.com", "jdoe");
        let first = fx.backend(1000).update_avatar(&session, &png(4)).unwrap();
        let first_url = first.avatar_url.unwrap();
        let first_name = crate::blobs::name_from_url(&first_url).unwrap().to_string();

        let side = rusqlite::Connection::open(fx.dir.path().join("linkshare.db")).unwrap();
        side.execute_batch(
            "CREATE TRIGGER freeze_avatar BEFORE UPDATE OF avatar_url ON profiles
             BEGIN SELECT RAISE(ABORT, 'avatar updates disabled'); END;",
        )
        .unwrap();

        let err = fx.backend(2000).update_avatar(&session, &png(8)).unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));

        let profile = fx.backend(3000).get_profile(&session).unwrap();
        assert_eq!(profile.avatar_url.as_deref(), Some(first_url.as_str()));
        assert!(fx.blobs.get(Bucket::Avatars, &first_name).unwrap().is_some());
        // The rejected upload is not left behind either.
        let stored = std::fs::read_dir(fx.dir.path().join("blobs").join("avatars"))
            .unwrap()
            .count();
        assert_eq!(stored, 1);
    }

    #[test]
    fn public_page_puts_highlight_first_and_hides_inactive() {
        let fx = Fixture::new();
        let session = fx.user("jane@example.com", "jdoe");
        let backend = fx.backend(1000);
        let a = backend.create_link(&session, &input("A"), None).unwrap();
        let b = backend.create_link(&session, &input("B"), None).unwrap();
        let c = backend.create_link(&session, &input("C"), None).unwrap();
        backend.toggle_highlight(&session, &b.id).unwrap();
        backend.toggle_active(&session, &c.id).unwrap();

        let page = backend.public_page("JDOE").unwrap();
        assert_eq!(page.highlighted.map(|l| l.id), Some(b.id));
        let rest: Vec<String> = page.links.into_iter().map(|l| l.id).collect();
        assert_eq!(rest, vec![a.id]);

        assert!(matches!(
            backend.public_page("nobody"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn social_links_skip_empty_handles() {
        let profile = ProfileRow {
            instagram_url: Some("jdoe".to_string()),
            youtube_url: Some(String::new()),
            linkedin_url: Some("jane".to_string()),
            ..Default::default()
        };
        let socials = social_links(&profile);
        let urls: Vec<&str> = socials.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://instagram.com/jdoe", "https://linkedin.com/in/jane"]
        );
    }
}
