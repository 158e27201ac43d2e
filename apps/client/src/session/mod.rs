//! Session state: the credential store handle, the sign-in/sign-out signal the
//! UI layer watches, and the single-flight refresh protocol.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::storage::StoreError;

pub mod refresh;
pub mod store;
mod terminator;

pub use refresh::{RefreshCoordinator, TerminationReason, TerminationSignal};
pub use store::{CredentialKind, CredentialStore, FileCredentialStore, MemoryCredentialStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    /// The UI should be showing the unauthenticated entry point.
    SignedOut(SignOutCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutCause {
    /// No credentials were present when the session was opened.
    NotSignedIn,
    /// The user asked to log out.
    Logout,
    /// An access credential expired and no refresh credential was stored.
    RefreshUnavailable,
    /// The refresh endpoint rejected the exchange or could not be reached.
    RefreshFailed,
}

/// Shared handle over the credential store. Cheap to clone; every clone sees
/// the same credentials and the same state channel.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let initial = if store.get(CredentialKind::Access).is_some() {
            SessionState::Authenticated
        } else {
            SessionState::SignedOut(SignOutCause::NotSignedIn)
        };
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(SessionInner { store, state }),
        }
    }

    /// Session over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()))
    }

    pub fn access_credential(&self) -> Option<String> {
        self.inner.store.get(CredentialKind::Access)
    }

    pub fn refresh_credential(&self) -> Option<String> {
        self.inner.store.get(CredentialKind::Refresh)
    }

    /// True iff an access credential is present.
    pub fn is_authenticated(&self) -> bool {
        self.access_credential().is_some()
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Stores a freshly issued credential pair after a successful login.
    pub fn establish(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        self.inner.store.set(CredentialKind::Access, access)?;
        self.inner.store.set(CredentialKind::Refresh, refresh)?;
        self.inner.state.send_replace(SessionState::Authenticated);
        info!("session established");
        Ok(())
    }

    /// Replaces the access credential, and the refresh credential when the
    /// backend rotated it.
    pub(crate) fn rotate(&self, access: &str, refresh: Option<&str>) -> Result<(), StoreError> {
        self.inner.store.set(CredentialKind::Access, access)?;
        if let Some(refresh) = refresh {
            self.inner.store.set(CredentialKind::Refresh, refresh)?;
        }
        self.inner.state.send_if_modified(|state| {
            let changed = *state != SessionState::Authenticated;
            *state = SessionState::Authenticated;
            changed
        });
        Ok(())
    }

    fn store(&self) -> &dyn CredentialStore {
        self.inner.store.as_ref()
    }

    fn state_sender(&self) -> &watch::Sender<SessionState> {
        &self.inner.state
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_starts_signed_out() {
        let session = Session::in_memory();
        assert!(!session.is_authenticated());
        assert_eq!(
            session.state(),
            SessionState::SignedOut(SignOutCause::NotSignedIn)
        );
    }

    #[test]
    fn test_persisted_access_starts_authenticated() {
        let store = MemoryCredentialStore::with_credentials(Some("a1"), Some("r1"));
        let session = Session::new(Arc::new(store));
        assert!(session.is_authenticated());
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[test]
    fn test_establish_populates_both_credentials() {
        let session = Session::in_memory();
        let mut rx = session.subscribe();

        session.establish("a1", "r1").unwrap();

        assert_eq!(session.access_credential().as_deref(), Some("a1"));
        assert_eq!(session.refresh_credential().as_deref(), Some("r1"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::Authenticated);
    }

    #[test]
    fn test_rotate_keeps_refresh_when_not_rotated() {
        let session = Session::in_memory();
        session.establish("a1", "r1").unwrap();

        session.rotate("a2", None).unwrap();
        assert_eq!(session.access_credential().as_deref(), Some("a2"));
        assert_eq!(session.refresh_credential().as_deref(), Some("r1"));

        session.rotate("a3", Some("r2")).unwrap();
        assert_eq!(session.access_credential().as_deref(), Some("a3"));
        assert_eq!(session.refresh_credential().as_deref(), Some("r2"));
    }

    #[test]
    fn test_rotate_while_authenticated_does_not_signal() {
        let session = Session::in_memory();
        session.establish("a1", "r1").unwrap();
        let rx = session.subscribe();

        session.rotate("a2", None).unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_debug_does_not_leak_credentials() {
        let session = Session::in_memory();
        session.establish("secret-access", "secret-refresh").unwrap();
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret"));
    }
}
