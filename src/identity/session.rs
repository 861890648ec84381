use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{Profile, User};
use crate::store::{RecordStore, StoreError};

/// The signed-in user and their profile, if one is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub user: User,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl SessionState {
    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .or(self.user.email.as_deref())
            .unwrap_or(if self.user.is_anonymous { "guest" } else { &self.user.id })
    }
}

/// Holder of the current session.
///
/// Readers either take a snapshot with [`SessionContext::current`] or
/// [`SessionContext::subscribe`] to be pushed every change. When created
/// with a path the session is mirrored to that file so it survives restarts.
#[derive(Debug)]
pub struct SessionContext {
    state: watch::Sender<Option<SessionState>>,
    path: Option<PathBuf>,
}

impl SessionContext {
    /// A session that lives only in memory.
    pub fn in_memory() -> Self {
        let (state, _) = watch::channel(None);
        Self { state, path: None }
    }

    /// Restore the session persisted at `path`, or start signed out.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn init(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let restored = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            Some(serde_json::from_str::<SessionState>(&raw)?)
        } else {
            None
        };
        let (state, _) = watch::channel(restored);
        Ok(Self {
            state,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Option<SessionState> {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionState>> {
        self.state.subscribe()
    }

    /// Replace the session and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be written. The in-memory
    /// session is updated regardless.
    pub fn set_session(&self, session: SessionState) -> Result<(), StoreError> {
        debug!(user = %session.user.id, "session set");
        self.state.send_replace(Some(session.clone()));
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_vec_pretty(&session)?)?;
        }
        Ok(())
    }

    /// Forget the session, in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file exists and cannot be removed.
    pub fn clear(&self) -> Result<(), StoreError> {
        debug!("session cleared");
        self.state.send_replace(None);
        if let Some(path) = &self.path
            && path.exists()
        {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// React to an identity change: load the profile for a new user, or
    /// clear everything when the user signed out.
    ///
    /// A profile lookup failure still establishes the session, without a
    /// profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be updated.
    pub async fn apply_identity_change(
        &self,
        user: Option<User>,
        store: &dyn RecordStore,
    ) -> Result<(), StoreError> {
        let Some(user) = user else {
            return self.clear();
        };
        let profile = match store.fetch_profile(&user.id).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(user = %user.id, error = %err, "profile lookup failed");
                None
            }
        };
        self.set_session(SessionState { user, profile })
    }

    /// Mirror every change pushed by an identity subscription until the
    /// sender goes away.
    pub async fn follow(
        &self,
        mut changes: watch::Receiver<Option<User>>,
        store: &dyn RecordStore,
    ) {
        while changes.changed().await.is_ok() {
            let user = changes.borrow_and_update().clone();
            if let Err(err) = self.apply_identity_change(user, store).await {
                warn!(error = %err, "failed to persist session change");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Identity, LocalIdentity};
    use crate::store::MemoryStore;
    use tempfile::tempdir;

    fn anon(id: &str) -> User {
        User {
            id: id.to_string(),
            provider: None,
            is_anonymous: true,
            email: None,
        }
    }

    #[tokio::test]
    async fn test_profile_is_loaded_with_user() {
        let store = MemoryStore::new();
        store
            .upsert_profile(Profile {
                id: "u1".to_string(),
                name: Some("Ada".to_string()),
                avatar_url: None,
            })
            .await
            .unwrap();
        let session = SessionContext::in_memory();
        session
            .apply_identity_change(Some(anon("u1")), &store)
            .await
            .unwrap();

        let state = session.current().unwrap();
        assert_eq!(state.display_name(), "Ada");
        assert_eq!(state.user.id, "u1");
    }

    #[tokio::test]
    async fn test_session_persists_and_clears() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = MemoryStore::new();

        let session = SessionContext::init(&path).unwrap();
        session
            .apply_identity_change(Some(anon("u2")), &store)
            .await
            .unwrap();
        drop(session);

        let restored = SessionContext::init(&path).unwrap();
        assert_eq!(restored.user().unwrap().id, "u2");
        assert_eq!(restored.current().unwrap().display_name(), "guest");

        restored.apply_identity_change(None, &store).await.unwrap();
        assert!(restored.current().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_subscribers_are_pushed_changes() {
        let session = SessionContext::in_memory();
        let mut rx = session.subscribe();
        session
            .set_session(SessionState {
                user: anon("u3"),
                profile: None,
            })
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().user.id, "u3");
    }

    #[tokio::test]
    async fn test_follow_mirrors_identity() {
        let store = MemoryStore::new();
        let identity = LocalIdentity::new();
        let session = SessionContext::in_memory();
        let mut observed = session.subscribe();
        let changes = identity.subscribe();

        let follower = session.follow(changes, &store);
        let driver = async {
            let user = identity.sign_in_anonymously().await.unwrap();
            observed.changed().await.unwrap();
            assert_eq!(observed.borrow_and_update().as_ref().unwrap().user, user);
            identity.sign_out().await.unwrap();
            observed.changed().await.unwrap();
            assert!(observed.borrow_and_update().is_none());
        };
        tokio::select! {
            () = follower => panic!("identity sender dropped early"),
            () = driver => {}
        }
    }
}
