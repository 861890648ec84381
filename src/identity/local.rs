use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use super::{Identity, IdentityError, Provider, User};

/// In-process identity provider.
///
/// Anonymous sign-in mints a fresh user. The provider flow is a loopback:
/// the authorize URL is the redirect target itself with a one-time code,
/// and [`Identity::exchange_code`] redeems it.
#[derive(Debug)]
pub struct LocalIdentity {
    current: watch::Sender<Option<User>>,
    pending_codes: Mutex<HashMap<String, Provider>>,
}

impl LocalIdentity {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            pending_codes: Mutex::new(HashMap::new()),
        }
    }

    /// Resume with an already known user, e.g. one restored from disk.
    pub fn with_user(user: Option<User>) -> Self {
        let identity = Self::new();
        identity.current.send_replace(user);
        identity
    }

    fn pending(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Provider>>, IdentityError> {
        self.pending_codes
            .lock()
            .map_err(|_| IdentityError::Unavailable("code table poisoned".to_string()))
    }
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Identity for LocalIdentity {
    async fn sign_in_with_provider(
        &self,
        provider: Provider,
        redirect_to: &str,
    ) -> Result<String, IdentityError> {
        let code = Uuid::new_v4().simple().to_string();
        self.pending()?.insert(code.clone(), provider);
        let separator = if redirect_to.contains('?') { '&' } else { '?' };
        Ok(format!("{redirect_to}{separator}code={code}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<User, IdentityError> {
        let provider = self
            .pending()?
            .remove(code)
            .ok_or(IdentityError::InvalidCode)?;
        let user = User {
            id: Uuid::new_v4().to_string(),
            provider: Some(provider),
            is_anonymous: false,
            email: None,
        };
        info!(user = %user.id, provider = provider.as_str(), "signed in");
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in_anonymously(&self) -> Result<User, IdentityError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            provider: None,
            is_anonymous: true,
            email: None,
        };
        info!(user = %user.id, "signed in anonymously");
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if self.current.borrow().is_none() {
            return Err(IdentityError::NotSignedIn);
        }
        self.current.send_replace(None);
        info!("signed out");
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_from(url: &str) -> &str {
        url.split("code=").nth(1).unwrap()
    }

    #[tokio::test]
    async fn test_provider_flow_redeems_code_once() {
        let identity = LocalIdentity::new();
        let url = identity
            .sign_in_with_provider(Provider::Github, "http://localhost/auth/callback")
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost/auth/callback?code="));

        let user = identity.exchange_code(code_from(&url)).await.unwrap();
        assert_eq!(user.provider, Some(Provider::Github));
        assert!(!user.is_anonymous);

        let again = identity.exchange_code(code_from(&url)).await;
        assert!(matches!(again, Err(IdentityError::InvalidCode)));
    }

    #[tokio::test]
    async fn test_subscribers_see_sign_in_and_out() {
        let identity = LocalIdentity::new();
        let mut rx = identity.subscribe();
        assert!(rx.borrow_and_update().is_none());

        let user = identity.sign_in_anonymously().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&user));

        identity.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_fails() {
        let identity = LocalIdentity::new();
        assert!(matches!(
            identity.sign_out().await,
            Err(IdentityError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn test_redirect_with_query_appends_code() {
        let identity = LocalIdentity::new();
        let url = identity
            .sign_in_with_provider(Provider::Github, "http://x/cb?next=/")
            .await
            .unwrap();
        assert!(url.contains("?next=/&code="));
    }
}
