//! Refresh Coordinator: single-flight exchange of the refresh credential.
//!
//! However many requests are rejected with 401 while a refresh is running, at
//! most one `POST /auth/refresh` is in flight. Every caller that arrives in that
//! window is queued and resumed with the same outcome, so concurrent failures
//! never race to rotate the same refresh credential.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::http::{OutboundRequest, Transport, REFRESH_PATH};
use crate::session::{Session, SignOutCause};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminationReason {
    #[error("no refresh credential is stored")]
    MissingRefreshCredential,

    #[error("refresh endpoint rejected the credential with status {0}")]
    Rejected(u16),

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh response was malformed: {0}")]
    MalformedResponse(String),

    /// The task driving the refresh was dropped before it settled. The session
    /// is left as it was.
    #[error("refresh was abandoned before it settled")]
    Interrupted,
}

/// Outcome handed to every caller when a refresh cannot produce a credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("session terminated: {reason}")]
pub struct TerminationSignal {
    pub reason: TerminationReason,
}

impl TerminationSignal {
    pub fn new(reason: TerminationReason) -> Self {
        Self { reason }
    }
}

pub type RefreshOutcome = Result<String, TerminationSignal>;

enum RefreshState {
    Idle,
    InFlight {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

enum Role {
    Leader,
    Waiter(oneshot::Receiver<RefreshOutcome>),
    /// The rejected credential was already replaced by a refresh that settled.
    Current(String),
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

pub struct RefreshCoordinator {
    session: Session,
    transport: Arc<dyn Transport>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(session: Session, transport: Arc<dyn Transport>) -> Self {
        Self {
            session,
            transport,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Returns a fresh access credential, joining the in-flight refresh if one
    /// is running. On failure the session has already been terminated.
    pub async fn ensure_fresh_credential(&self) -> RefreshOutcome {
        self.refresh_after_rejection(None).await
    }

    /// Like [`Self::ensure_fresh_credential`], for a request that was rejected
    /// while presenting `rejected`. If that credential has since been replaced,
    /// the current one is returned without another refresh.
    pub(crate) async fn refresh_after_rejection(&self, rejected: Option<&str>) -> RefreshOutcome {
        match self.claim(rejected) {
            Role::Current(token) => {
                debug!("rejected credential already replaced; reusing current one");
                Ok(token)
            }
            Role::Waiter(rx) => rx
                .await
                .unwrap_or_else(|_| Err(TerminationSignal::new(TerminationReason::Interrupted))),
            Role::Leader => {
                let mut guard = InFlightGuard {
                    coordinator: self,
                    settled: false,
                };
                let outcome = self.perform_refresh().await;
                guard.settle(&outcome);
                outcome
            }
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::InFlight { .. })
    }

    /// Number of callers parked behind the in-flight refresh.
    pub fn waiting(&self) -> usize {
        match &*self.lock_state() {
            RefreshState::InFlight { waiters } => waiters.len(),
            RefreshState::Idle => 0,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, rejected: Option<&str>) -> Role {
        let mut state = self.lock_state();

        if let RefreshState::InFlight { waiters } = &mut *state {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            debug!(waiters = waiters.len(), "refresh in flight; queued");
            return Role::Waiter(rx);
        }

        if let (Some(rejected), Some(current)) = (rejected, self.session.access_credential()) {
            if current != rejected {
                return Role::Current(current);
            }
        }

        *state = RefreshState::InFlight {
            waiters: Vec::new(),
        };
        Role::Leader
    }

    /// Resets to idle and hands `outcome` to every queued caller. With `None`
    /// the senders are dropped and the callers observe `Interrupted`.
    fn release(&self, outcome: Option<&RefreshOutcome>) {
        let waiters = match std::mem::replace(&mut *self.lock_state(), RefreshState::Idle) {
            RefreshState::InFlight { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        };

        if let Some(outcome) = outcome {
            debug!(waiters = waiters.len(), ok = outcome.is_ok(), "releasing refresh waiters");
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }

    async fn perform_refresh(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.session.refresh_credential() else {
            return Err(self.fail(TerminationReason::MissingRefreshCredential));
        };

        info!("refreshing access credential");

        // Query parameter and JSON body both carry the credential.
        let request = match OutboundRequest::post(REFRESH_PATH)
            .query("refresh_token", refresh_token.as_str())
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            }) {
            Ok(request) => request,
            Err(e) => return Err(self.fail(TerminationReason::MalformedResponse(e.to_string()))),
        };

        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(TerminationReason::Transport(e.to_string()))),
        };

        if !response.is_success() {
            return Err(self.fail(TerminationReason::Rejected(response.status.as_u16())));
        }

        let tokens: RefreshResponse = match response.json() {
            Ok(tokens) => tokens,
            Err(e) => return Err(self.fail(TerminationReason::MalformedResponse(e.to_string()))),
        };

        if tokens.access_token.is_empty() {
            return Err(self.fail(TerminationReason::MalformedResponse(
                "empty access_token".to_string(),
            )));
        }

        if let Err(e) = self
            .session
            .rotate(&tokens.access_token, tokens.refresh_token.as_deref())
        {
            warn!(error = %e, "refreshed credential could not be persisted");
        }

        info!(
            rotated_refresh = tokens.refresh_token.is_some(),
            "access credential refreshed"
        );
        Ok(tokens.access_token)
    }

    fn fail(&self, reason: TerminationReason) -> TerminationSignal {
        warn!(%reason, "credential refresh failed; terminating session");
        let cause = match reason {
            TerminationReason::MissingRefreshCredential => SignOutCause::RefreshUnavailable,
            _ => SignOutCause::RefreshFailed,
        };
        self.session.terminate(cause);
        TerminationSignal::new(reason)
    }
}

/// Returns the coordinator to idle even if the leader's future is dropped
/// mid-refresh, so queued callers are never stranded.
struct InFlightGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl InFlightGuard<'_> {
    fn settle(&mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.release(Some(outcome));
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("refresh abandoned before settling");
            self.coordinator.release(None);
        }
    }
}
