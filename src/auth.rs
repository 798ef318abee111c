//! Email/password accounts and cookie sessions.
//!
//! Passwords are stored as argon2id PHC strings. A session is an opaque
//! random token persisted in the `sessions` table; the web layer carries
//! it in a cookie and turns it into a [`Session`] per request.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::Engine as _;
use rand::RngCore;

use crate::storage::{ProfileRow, SessionRow, Storage, StorageError, UserRow};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const SESSION_TOKEN_BYTES: usize = 32;
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;

/// First path segments owned by the application; a username may not
/// shadow them.
pub const RESERVED_USERNAMES: &[&str] = &[
    "api", "auth", "dashboard", "go", "login", "logout", "signup", "static", "storage",
];

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("username is already taken")]
    UsernameTaken,
    #[error("{0}")]
    Invalid(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The authenticated caller, passed explicitly into every service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub expires_at: u64,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            token: row.token,
            user_id: row.user_id,
            expires_at: row.expires_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub username: String,
    pub full_name: String,
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// False for a wrong password and for an unparsable stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AuthError::Invalid("enter a valid email address".to_string())),
    }
}

/// Lowercase the username and check length, alphabet and reserved words.
pub fn normalize_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim().to_lowercase();
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AuthError::Invalid(format!(
            "username must be {USERNAME_MIN} to {USERNAME_MAX} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AuthError::Invalid(
            "username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }
    if RESERVED_USERNAMES.contains(&username.as_str()) {
        return Err(AuthError::Invalid(format!("username '{username}' is reserved")));
    }
    Ok(username)
}

fn new_session(user_id: &str, now: u64, ttl_secs: u64) -> SessionRow {
    SessionRow {
        token: generate_session_token(),
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: now.saturating_add(ttl_secs),
    }
}

/// Create the account, its profile and a first session.
pub fn sign_up(
    storage: &Storage,
    req: &SignUp,
    now: u64,
    ttl_secs: u64,
) -> Result<Session, AuthError> {
    let email = normalize_email(&req.email)?;
    let username = normalize_username(&req.username)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if storage.get_user_by_email(&email)?.is_some() {
        return Err(AuthError::EmailTaken);
    }
    if storage.get_profile_by_username(&username)?.is_some() {
        return Err(AuthError::UsernameTaken);
    }

    let user_id = uuid::Uuid::new_v4().to_string();
    let user = UserRow {
        id: user_id.clone(),
        email,
        password_hash: hash_password(&req.password)?,
        created_at: now,
    };
    let profile = ProfileRow {
        id: user_id.clone(),
        username,
        full_name: req.full_name.trim().to_string(),
        created_at: now,
        updated_at: now,
        ..Default::default()
    };
    let session = new_session(&user_id, now, ttl_secs);
    match storage.insert_account(&user, &profile, &session) {
        Ok(()) => Ok(session.into()),
        // Lost a race with a concurrent signup for the same email/username.
        Err(e) if e.is_constraint_violation() => Err(AuthError::UsernameTaken),
        Err(e) => Err(e.into()),
    }
}

pub fn log_in(
    storage: &Storage,
    email: &str,
    password: &str,
    now: u64,
    ttl_secs: u64,
) -> Result<Session, AuthError> {
    let email = email.trim().to_lowercase();
    let user = storage
        .get_user_by_email(&email)?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }
    let session = new_session(&user.id, now, ttl_secs);
    storage.insert_session(&session)?;
    Ok(session.into())
}

pub fn log_out(storage: &Storage, token: &str) -> Result<bool, AuthError> {
    Ok(storage.delete_session(token)?)
}

/// Look up a live session. Expired sessions are deleted and reported as absent.
pub fn resolve_session(
    storage: &Storage,
    token: &str,
    now: u64,
) -> Result<Option<Session>, AuthError> {
    match storage.get_session(token)? {
        Some(row) if row.expires_at > now => Ok(Some(row.into())),
        Some(row) => {
            storage.delete_session(&row.token)?;
            Ok(None)
        }
        None => Ok(None),
    }
}
