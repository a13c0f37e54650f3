//! Session gate: password hashing, the server-side session store, and the
//! guard composed in front of every protected operation.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use bcrypt::{hash, verify, DEFAULT_COST};
use moka::future::Cache;
use tracing::debug;
use uuid::Uuid;

use crate::schemas::{ApiError, AppState};

/// Name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "session";

/// Server-side session state keyed by opaque token.
pub type SessionStore = Cache<String, Identity>;

/// The authenticated caller, resolved from the session store and passed
/// explicitly into each handler that needs it.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user_id: i32,
    pub username: String,
    pub avatar_url: Option<String>,
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

/// One-way compare; plaintext is never stored or compared directly.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, password_hash)
}

/// Store a fresh session and return the jar carrying its token cookie.
pub async fn establish_session(store: &SessionStore, jar: CookieJar, identity: Identity) -> CookieJar {
    let token = Uuid::new_v4().to_string();
    debug!("Establishing session for user {}", identity.user_id);
    store.insert(token.clone(), identity).await;

    jar.add(
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .build(),
    )
}

/// Drop the caller's session state and cookie. Idempotent: clearing an
/// already-cleared session is fine.
pub async fn clear_session(store: &SessionStore, jar: CookieJar) -> CookieJar {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        store.invalidate(cookie.value()).await;
    }
    jar.remove(Cookie::build(SESSION_COOKIE).path("/").build())
}

/// Guard for protected operations. A missing or stale token yields a
/// redirect-to-login effect rather than an error payload.
pub async fn require_session(state: &AppState, jar: &CookieJar) -> Result<Identity, ApiError> {
    let token = jar.get(SESSION_COOKIE).ok_or(ApiError::LoginRequired)?;
    state
        .sessions
        .get(token.value())
        .await
        .ok_or(ApiError::LoginRequired)
}
