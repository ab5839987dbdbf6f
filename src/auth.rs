//! Email/password accounts, sessions and user profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::database::DocumentStore;
use crate::error::{AeroResult, AeroTrackError};

pub const USERS: &str = "users";
pub const CREDENTIALS: &str = "credentials";
pub const SESSIONS: &str = "sessions";
const CURRENT_SESSION: &str = "current";
const MIN_PASSWORD_LEN: usize = 6;

/// A signed-in user. Passed explicitly to anything that needs an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    pub token: String,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryItem {
    pub id: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub search_history: Vec<SearchHistoryItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Profile for a user with no stored document yet
    pub fn basic(session: &Session) -> Self {
        Self {
            uid: session.uid.clone(),
            email: session.email.clone(),
            display_name: session.display_name.clone(),
            created_at: Utc::now(),
            search_history: Vec::new(),
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Credential {
    uid: String,
    email: String,
    salt: String,
    digest: String,
    /// Stretching rounds; zero marks a credential from before stretching
    #[serde(default)]
    rounds: u32,
}

const DIGEST_CONTEXT: &str = "aerotrack 2025 password digest v1";
const DIGEST_ROUNDS: u32 = 100_000;

/// Salted password digest, stretched over `rounds` keyed blake3 passes
fn password_digest(salt: &str, password: &str, rounds: u32) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();
    if rounds == 0 {
        return digest;
    }

    let key = blake3::derive_key(DIGEST_CONTEXT, salt.as_bytes());
    for _ in 0..rounds {
        digest = blake3::keyed_hash(&key, digest.as_bytes());
    }
    digest
}

fn normalize_email(email: &str) -> AeroResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AeroTrackError::auth("Email is required"));
    }
    if !email.contains('@') {
        return Err(AeroTrackError::auth(format!("Invalid email address: {}", email)));
    }
    Ok(email)
}

pub struct AuthService {
    store: Arc<dyn DocumentStore>,
}

impl AuthService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> AeroResult<Session> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AeroTrackError::auth(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.store.get(CREDENTIALS, &email).await?.is_some() {
            return Err(AeroTrackError::auth(format!("An account already exists for {}", email)));
        }

        let uid = uuid::Uuid::new_v4().simple().to_string();
        let salt = uuid::Uuid::new_v4().to_string();
        let credential = Credential {
            uid: uid.clone(),
            email: email.clone(),
            digest: password_digest(&salt, password, DIGEST_ROUNDS).to_hex().to_string(),
            rounds: DIGEST_ROUNDS,
            salt,
        };
        self.store.put(CREDENTIALS, &email, &to_document(&credential)?).await?;

        let session = Session {
            uid,
            email,
            display_name: display_name.trim().to_string(),
            token: uuid::Uuid::new_v4().to_string(),
            signed_in_at: Utc::now(),
        };

        // The account exists even if the profile write fails; the profile
        // view falls back to a basic profile.
        let profile = UserProfile::basic(&session);
        match to_document(&profile) {
            Ok(doc) => {
                if let Err(e) = self.store.put(USERS, &session.uid, &doc).await {
                    warn!("Could not create profile for {}: {}", session.uid, e);
                }
            }
            Err(e) => warn!("Could not encode profile for {}: {}", session.uid, e),
        }

        info!("👤 Created account {} ({})", session.email, session.uid);
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AeroResult<Session> {
        let email = normalize_email(email)?;
        let invalid = || AeroTrackError::auth("Invalid email or password");

        let doc = self.store.get(CREDENTIALS, &email).await?.ok_or_else(invalid)?;
        let credential: Credential = from_document(CREDENTIALS, doc)?;

        let stored = blake3::Hash::from_hex(&credential.digest)
            .map_err(|_| AeroTrackError::auth("Stored credential is corrupt"))?;
        if password_digest(&credential.salt, password, credential.rounds) != stored {
            return Err(invalid());
        }

        let display_name = match self.store.get(USERS, &credential.uid).await {
            Ok(Some(doc)) => doc
                .get("displayName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };

        info!("🔓 Signed in {}", credential.email);
        Ok(Session {
            uid: credential.uid,
            email: credential.email,
            display_name,
            token: uuid::Uuid::new_v4().to_string(),
            signed_in_at: Utc::now(),
        })
    }

    /// End a session, forgetting it if it is the remembered one
    pub async fn sign_out(&self, session: Session) -> AeroResult<()> {
        if let Some(current) = self.current_session().await? {
            if current.token == session.token {
                self.store.delete(SESSIONS, CURRENT_SESSION).await?;
            }
        }
        info!("🔒 Signed out {}", session.email);
        Ok(())
    }

    /// Remember a session across CLI invocations
    pub async fn persist_session(&self, session: &Session) -> AeroResult<()> {
        self.store.put(SESSIONS, CURRENT_SESSION, &to_document(session)?).await
    }

    pub async fn current_session(&self) -> AeroResult<Option<Session>> {
        match self.store.get(SESSIONS, CURRENT_SESSION).await? {
            Some(doc) => Ok(Some(from_document(SESSIONS, doc)?)),
            None => Ok(None),
        }
    }

    pub async fn require_session(&self) -> AeroResult<Session> {
        self.current_session().await?.ok_or(AeroTrackError::NotAuthenticated)
    }

    /// Stored profile, or a basic one when there is none or it can't be read
    pub async fn profile(&self, session: &Session) -> UserProfile {
        match self.store.get(USERS, &session.uid).await {
            Ok(Some(doc)) => match serde_json::from_value::<UserProfile>(doc) {
                Ok(mut profile) => {
                    if profile.email.is_empty() {
                        profile.email = session.email.clone();
                    }
                    if profile.display_name.is_empty() {
                        profile.display_name = session.display_name.clone();
                    }
                    profile
                }
                Err(e) => {
                    warn!("Profile for {} is malformed: {}", session.uid, e);
                    UserProfile::basic(session)
                }
            },
            Ok(None) => UserProfile::basic(session),
            Err(e) => {
                warn!("Could not load profile for {}: {}", session.uid, e);
                UserProfile::basic(session)
            }
        }
    }
}

pub(crate) fn to_document<T: Serialize>(value: &T) -> AeroResult<Value> {
    serde_json::to_value(value).map_err(|e| AeroTrackError::encoding("serialize document", e))
}

pub(crate) fn from_document<T: serde::de::DeserializeOwned>(collection: &str, doc: Value) -> AeroResult<T> {
    serde_json::from_value(doc).map_err(|e| AeroTrackError::encoding(format!("decode {} document", collection), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDocumentStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryDocumentStore::new()))
    }

    #[tokio::test]
    async fn test_sign_up_and_sign_in() {
        let auth = service();
        let created = auth.sign_up("Tech@Example.com", "hunter22", "Sam").await.unwrap();
        assert_eq!(created.email, "tech@example.com");

        let session = auth.sign_in("tech@example.com ", "hunter22").await.unwrap();
        assert_eq!(session.uid, created.uid);
        assert_eq!(session.display_name, "Sam");
        assert_ne!(session.token, created.token);
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let auth = service();
        assert!(matches!(auth.sign_up("", "hunter22", "x").await, Err(AeroTrackError::Auth { .. })));
        assert!(auth.sign_up("tech@example.com", "short", "x").await.is_err());

        auth.sign_up("tech@example.com", "hunter22", "x").await.unwrap();
        let duplicate = auth.sign_up("TECH@example.com", "another1", "y").await;
        assert!(matches!(duplicate, Err(AeroTrackError::Auth { .. })));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let auth = service();
        auth.sign_up("tech@example.com", "hunter22", "Sam").await.unwrap();
        assert!(auth.sign_in("tech@example.com", "hunter23").await.is_err());
        assert!(auth.sign_in("nobody@example.com", "hunter22").await.is_err());
    }

    #[tokio::test]
    async fn test_session_persistence_and_sign_out() {
        let auth = service();
        let session = auth.sign_up("tech@example.com", "hunter22", "Sam").await.unwrap();
        assert!(matches!(auth.require_session().await, Err(AeroTrackError::NotAuthenticated)));

        auth.persist_session(&session).await.unwrap();
        assert_eq!(auth.current_session().await.unwrap(), Some(session.clone()));

        auth.sign_out(session).await.unwrap();
        assert_eq!(auth.current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_profile_is_basic() {
        let store = Arc::new(MemoryDocumentStore::new());
        let auth = AuthService::new(store.clone());
        let session = auth.sign_up("tech@example.com", "hunter22", "Sam").await.unwrap();

        store.delete(USERS, &session.uid).await.unwrap();
        let profile = auth.profile(&session).await;
        assert_eq!(profile.uid, session.uid);
        assert_eq!(profile.display_name, "Sam");
        assert!(profile.search_history.is_empty());
    }

    #[test]
    fn test_digest_depends_on_salt() {
        assert_ne!(password_digest("salt-a", "hunter22", 10), password_digest("salt-b", "hunter22", 10));
        assert_eq!(password_digest("salt-a", "hunter22", 10), password_digest("salt-a", "hunter22", 10));
    }

    #[test]
    fn test_rounds_stretch_the_digest() {
        let single = password_digest("salt-a", "hunter22", 0);
        assert_ne!(single, password_digest("salt-a", "hunter22", 1));
        assert_ne!(password_digest("salt-a", "hunter22", 10), password_digest("salt-a", "hunter22", 11));
    }

    #[tokio::test]
    async fn test_new_credentials_are_stretched() {
        let store = Arc::new(MemoryDocumentStore::new());
        let auth = AuthService::new(store.clone());
        auth.sign_up("tech@example.com", "hunter22", "Sam").await.unwrap();

        let doc = store.get(CREDENTIALS, "tech@example.com").await.unwrap().unwrap();
        assert_eq!(doc["rounds"], DIGEST_ROUNDS);
        let single = password_digest(doc["salt"].as_str().unwrap(), "hunter22", 0);
        assert_ne!(doc["digest"].as_str().unwrap(), single.to_hex().as_str());
    }

    #[tokio::test]
    async fn test_single_pass_credential_still_signs_in() {
        let store = Arc::new(MemoryDocumentStore::new());
        let digest = password_digest("old-salt", "hunter22", 0).to_hex().to_string();
        let legacy = serde_json::json!({
            "uid": "u-legacy",
            "email": "old@example.com",
            "salt": "old-salt",
            "digest": digest,
        });
        store.put(CREDENTIALS, "old@example.com", &legacy).await.unwrap();

        let auth = AuthService::new(store);
        let session = auth.sign_in("old@example.com", "hunter22").await.unwrap();
        assert_eq!(session.uid, "u-legacy");
        assert!(auth.sign_in("old@example.com", "wrong-pass").await.is_err());
    }
}
