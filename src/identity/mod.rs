//! Identity capability and the explicit session context.
//!
//! [`Identity`] signs users in and out and pushes session changes to
//! subscribers. [`SessionContext`] is the one place the rest of the app
//! reads the current user and profile from; it is created at start-up,
//! passed where needed, and cleared on sign-out.

mod local;
mod session;

pub use local::LocalIdentity;
pub use session::{SessionContext, SessionState};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub use crate::store::Profile;

/// Federated sign-in providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
}

impl Provider {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
        }
    }
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub provider: Option<Provider>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The redirect carried a code that was never issued or already used.
    #[error("authorization code is invalid or expired")]
    InvalidCode,

    #[error("not signed in")]
    NotSignedIn,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Identity: Send + Sync {
    /// Start a provider sign-in. Returns the URL the user must visit; the
    /// provider then redirects to `redirect_to` with a `code` parameter.
    async fn sign_in_with_provider(
        &self,
        provider: Provider,
        redirect_to: &str,
    ) -> Result<String, IdentityError>;

    /// Finish a provider sign-in with the code from the redirect.
    async fn exchange_code(&self, code: &str) -> Result<User, IdentityError>;

    async fn sign_in_anonymously(&self) -> Result<User, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Observe the signed-in user; the receiver sees every change.
    fn subscribe(&self) -> watch::Receiver<Option<User>>;
}
