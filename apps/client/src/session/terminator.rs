use tracing::{debug, error, info};

use super::{Session, SessionState, SignOutCause};

impl Session {
    /// Clears both credentials, marks the session unauthenticated, and signals
    /// subscribers to navigate to the unauthenticated entry point.
    ///
    /// Idempotent: returns `false` and signals nothing when the session is
    /// already terminated.
    pub fn terminate(&self, cause: SignOutCause) -> bool {
        let holds_credentials =
            self.access_credential().is_some() || self.refresh_credential().is_some();
        let signed_in = self.state() == SessionState::Authenticated;

        if !holds_credentials && !signed_in {
            debug!(?cause, "session already terminated");
            return false;
        }

        if let Err(e) = self.store().clear() {
            error!(error = %e, "failed to clear persisted credentials");
        }
        self.state_sender()
            .send_replace(SessionState::SignedOut(cause));

        info!(?cause, "session terminated");
        true
    }
}
