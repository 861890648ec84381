//! Account-level operations around the editor: sign-in, the diagram
//! listing, creating and deleting diagrams.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, info};

use crate::identity::{Identity, IdentityError, Provider, SessionContext, SessionState};
use crate::notify::{Notification, Notifier};
use crate::store::{
    BlobStore, DEFAULT_DIAGRAM_CODE, DiagramId, DiagramRecord, NewDiagram, Profile, RecordStore,
    StoreError, thumbnail_key,
};

/// Where the provider sends the user back to after authorizing.
pub const AUTH_CALLBACK_URL: &str = "http://localhost/auth/callback";

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("title is required")]
    EmptyTitle,

    #[error("diagram {0} belongs to another user")]
    NotOwner(DiagramId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// How to sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignIn {
    Guest,
    Provider(Provider),
}

/// A thumbnail picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Input of the create form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramForm {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<Thumbnail>,
}

pub struct Dashboard {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
}

impl Dashboard {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            blobs,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Sign in and establish the session, profile included.
    ///
    /// The provider flow follows the redirect the provider hands back; a
    /// redirect without a usable code is an [`IdentityError::InvalidCode`].
    ///
    /// # Errors
    ///
    /// Returns an error if the identity provider refuses or the session
    /// cannot be persisted.
    pub async fn sign_in(
        &self,
        identity: &dyn Identity,
        session: &SessionContext,
        method: SignIn,
    ) -> Result<SessionState, DashboardError> {
        let user = match method {
            SignIn::Guest => identity.sign_in_anonymously().await?,
            SignIn::Provider(provider) => {
                let redirect = identity
                    .sign_in_with_provider(provider, AUTH_CALLBACK_URL)
                    .await?;
                debug!(%redirect, "provider redirect");
                let code = code_from_redirect(&redirect).ok_or(IdentityError::InvalidCode)?;
                identity.exchange_code(code).await?
            }
        };
        session
            .apply_identity_change(Some(user), self.store.as_ref())
            .await?;
        session.current().ok_or(DashboardError::NotSignedIn)
    }

    /// Sign out and forget the session.
    ///
    /// A provider that no longer knows the user is not an error; the local
    /// session is cleared either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be removed.
    pub async fn sign_out(
        &self,
        identity: &dyn Identity,
        session: &SessionContext,
    ) -> Result<(), DashboardError> {
        match identity.sign_out().await {
            Ok(()) | Err(IdentityError::NotSignedIn) => {}
            Err(err) => return Err(err.into()),
        }
        session.apply_identity_change(None, self.store.as_ref()).await?;
        Ok(())
    }

    /// Store a display name for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is signed in or the profile cannot be saved.
    pub async fn set_display_name(
        &self,
        session: &SessionContext,
        name: &str,
    ) -> Result<SessionState, DashboardError> {
        let mut state = session.current().ok_or(DashboardError::NotSignedIn)?;
        let mut profile = state.profile.take().unwrap_or_else(|| Profile {
            id: state.user.id.clone(),
            name: None,
            avatar_url: None,
        });
        profile.name = Some(name.trim().to_string());
        self.store.upsert_profile(profile.clone()).await?;
        state.profile = Some(profile);
        session.set_session(state.clone())?;
        Ok(state)
    }

    /// The signed-in user's diagrams, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is signed in or the store fails.
    pub async fn list(&self, session: &SessionContext) -> Result<Vec<DiagramRecord>, DashboardError> {
        let user = session.user().ok_or(DashboardError::NotSignedIn)?;
        Ok(self.store.list_by_owner(&user.id).await?)
    }

    /// Create a diagram with the starter code, uploading the thumbnail
    /// first if one was picked.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is signed in, the title is blank, or the
    /// upload or insert fails. Failures are also reported to the notifier.
    pub async fn create(
        &self,
        session: &SessionContext,
        form: DiagramForm,
    ) -> Result<DiagramRecord, DashboardError> {
        let user = session.user().ok_or(DashboardError::NotSignedIn)?;
        if form.title.trim().is_empty() {
            return Err(DashboardError::EmptyTitle);
        }
        let result = self.insert(&user.id, form).await;
        match &result {
            Ok(record) => {
                info!(id = %record.id, "diagram created");
                self.notifier.notify(Notification::success("Diagram Initiated."));
            }
            Err(err) => self
                .notifier
                .notify(Notification::error("Failed to create").with_detail(err.to_string())),
        }
        result
    }

    async fn insert(&self, owner: &str, form: DiagramForm) -> Result<DiagramRecord, DashboardError> {
        let thumbnail_url = match form.thumbnail {
            Some(thumbnail) => {
                let key = thumbnail_key(owner, &thumbnail.file_name);
                self.blobs.upload(&key, thumbnail.bytes).await?;
                Some(self.blobs.public_url(&key))
            }
            None => None,
        };
        let record = self
            .store
            .insert(NewDiagram {
                title: form.title,
                description: form.description.filter(|d| !d.trim().is_empty()),
                code: DEFAULT_DIAGRAM_CODE.to_string(),
                thumbnail_url,
                created_by: owner.to_string(),
            })
            .await?;
        Ok(record)
    }

    /// Delete one of the signed-in user's diagrams.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is signed in, the diagram does not exist
    /// or belongs to someone else, or the store fails.
    pub async fn delete(&self, session: &SessionContext, id: &DiagramId) -> Result<(), DashboardError> {
        let user = session.user().ok_or(DashboardError::NotSignedIn)?;
        let result = self.delete_owned(&user.id, id).await;
        match &result {
            Ok(()) => self.notifier.notify(Notification::success("Deleted")),
            Err(err) => self
                .notifier
                .notify(Notification::error("Failed").with_detail(err.to_string())),
        }
        result
    }

    async fn delete_owned(&self, owner: &str, id: &DiagramId) -> Result<(), DashboardError> {
        let record = self
            .store
            .fetch(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if record.created_by != owner {
            return Err(DashboardError::NotOwner(id.clone()));
        }
        self.store.delete(id).await?;
        Ok(())
    }
}

/// The `code` query parameter of a provider redirect.
pub fn code_from_redirect(url: &str) -> Option<&str> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("code="))
        .filter(|code| !code.is_empty())
}

/// Plain-text listing, one diagram per line.
pub fn format_listing(records: &[DiagramRecord]) -> String {
    if records.is_empty() {
        return "No diagrams yet. Create one with `mermaid-dash new <title>`.\n".to_string();
    }
    let id_width = records.iter().map(|r| r.id.as_str().len()).max().unwrap_or(0);
    let mut out = format!("{} diagrams\n", records.len());
    for record in records {
        let _ = write!(
            out,
            "{:<id_width$}  {}  {}",
            record.id.as_str(),
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.title
        );
        if let Some(description) = &record.description {
            let _ = write!(out, " - {description}");
        }
        out.push('\n');
    }
    out
}
