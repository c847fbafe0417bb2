//! Session store: bearer tokens, per-session scratch directories, active document

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::{AuthConfig, UserCredential};
use crate::error::{AuthError, Result};

/// Live session; the scratch directory is deleted when this is dropped
struct Session {
    username: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
    scratch: TempDir,
    active_document: Option<Uuid>,
}

/// Snapshot of a session handed to request handlers
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionView {
    #[serde(skip)]
    pub token: String,
    pub username: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub scratch_dir: PathBuf,
    pub active_document: Option<Uuid>,
}

impl Session {
    fn view(&self, token: &str) -> SessionView {
        SessionView {
            token: token.to_string(),
            username: self.username.clone(),
            is_admin: self.is_admin,
            created_at: self.created_at,
            scratch_dir: self.scratch.path().to_path_buf(),
            active_document: self.active_document,
        }
    }
}

/// Concurrent token → session map
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    users: Arc<Vec<UserCredential>>,
    scratch_prefix: String,
}

impl SessionStore {
    pub fn new(auth: &AuthConfig, scratch_prefix: impl Into<String>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            users: Arc::new(auth.users.clone()),
            scratch_prefix: scratch_prefix.into(),
        }
    }

    /// Check credentials and open a session with its own scratch directory
    pub fn login(&self, username: &str, password: &str) -> Result<SessionView> {
        let user = self
            .users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .ok_or(AuthError::InvalidCredentials)?;

        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}{}_", self.scratch_prefix, sanitize(&user.username)))
            .tempdir()?;

        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let session = Session {
            username: user.username.clone(),
            is_admin: user.is_admin,
            created_at: Utc::now(),
            scratch,
            active_document: None,
        };
        let view = session.view(&token);
        self.sessions.insert(token, session);

        tracing::info!("User {} logged in", view.username);
        Ok(view)
    }

    /// End a session, releasing its scratch directory. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) -> bool {
        match self.sessions.remove(token) {
            Some((_, session)) => {
                tracing::info!("User {} logged out", session.username);
                true
            }
            None => false,
        }
    }

    pub fn resolve(&self, token: &str) -> Result<SessionView> {
        self.sessions
            .get(token)
            .map(|s| s.view(token))
            .ok_or_else(|| AuthError::InvalidSession.into())
    }

    /// Point the session at a document for later queries
    pub fn set_active(&self, token: &str, document_id: Uuid) -> Result<()> {
        let mut session = self
            .sessions
            .get_mut(token)
            .ok_or(AuthError::InvalidSession)?;
        session.active_document = Some(document_id);
        Ok(())
    }

    /// Drop active pointers to a removed document; returns how many were cleared
    pub fn clear_active_for(&self, document_id: Uuid) -> usize {
        let mut cleared = 0;
        for mut session in self.sessions.iter_mut() {
            if session.active_document == Some(document_id) {
                session.active_document = None;
                cleared += 1;
            }
        }
        cleared
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session
    pub fn clear_all(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        tracing::info!("Closed {} sessions", count);
    }
}

/// Keep only characters that are safe in a directory name
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn store() -> SessionStore {
        SessionStore::new(&AuthConfig::default(), "doc_qa_")
    }

    #[test]
    fn test_login_creates_scratch_dir() {
        let store = store();
        let session = store.login("user", "password").unwrap();

        assert!(!session.is_admin);
        assert!(session.scratch_dir.is_dir());
        let dir_name = session.scratch_dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(dir_name.starts_with("doc_qa_user_"));
        assert_eq!(store.resolve(&session.token).unwrap().username, "user");
    }

    #[test]
    fn test_bad_credentials() {
        let store = store();
        let err = store.login("user", "nope").unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_logout_releases_scratch_and_is_idempotent() {
        let store = store();
        let session = store.login("admin", "admin").unwrap();
        assert!(session.is_admin);

        assert!(store.logout(&session.token));
        assert!(!session.scratch_dir.exists());
        assert!(!store.logout(&session.token));
        assert!(matches!(
            store.resolve(&session.token),
            Err(Error::Auth(AuthError::InvalidSession))
        ));
    }

    #[test]
    fn test_tokens_are_unique_per_login() {
        let store = store();
        let a = store.login("user", "password").unwrap();
        let b = store.login("user", "password").unwrap();
        assert_ne!(a.token, b.token);
        assert_ne!(a.scratch_dir, b.scratch_dir);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_active_document_pointer() {
        let store = store();
        let a = store.login("user", "password").unwrap();
        let b = store.login("admin", "admin").unwrap();
        let doc = Uuid::new_v4();

        store.set_active(&a.token, doc).unwrap();
        store.set_active(&b.token, doc).unwrap();
        assert_eq!(store.resolve(&a.token).unwrap().active_document, Some(doc));

        assert_eq!(store.clear_active_for(doc), 2);
        assert_eq!(store.resolve(&b.token).unwrap().active_document, None);
        tokio_test::assert_err!(store.set_active("bogus", doc));
    }

    #[test]
    fn test_clear_all_releases_everything() {
        let store = store();
        let session = store.login("user", "password").unwrap();
        store.clear_all();
        assert!(store.is_empty());
        assert!(!session.scratch_dir.exists());
    }
}
