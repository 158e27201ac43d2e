//! Scripted in-process backend for exercising the session pipeline without a
//! network. Protected routes accept exactly one bearer credential; the refresh
//! endpoint replies as configured and can be slowed down to open a window for
//! concurrent callers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde_json::json;

use crate::http::{ApiResponse, OutboundRequest, RequestBody, Transport, TransportError, REFRESH_PATH};

const PUBLIC_PATHS: &[&str] = &["/auth/request-otp", "/auth/verify-otp"];

#[derive(Debug, Clone)]
pub(crate) enum RefreshReply {
    /// Issue `access` (and optionally rotate the refresh credential); the
    /// backend accepts `access` from then on.
    Rotate {
        access: String,
        refresh: Option<String>,
    },
    Reject(StatusCode),
    /// 200 with a body that is not a token pair.
    Garbage,
}

impl RefreshReply {
    pub(crate) fn rotate(access: &str, refresh: Option<&str>) -> Self {
        RefreshReply::Rotate {
            access: access.to_string(),
            refresh: refresh.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub query: Vec<(String, String)>,
    pub retried: bool,
    pub body: RequestBody,
}

struct FakeState {
    accepted_token: Option<String>,
    /// Reject every protected request, even ones carrying a refreshed credential.
    reject_all: bool,
    refresh_reply: RefreshReply,
    routes: HashMap<String, (StatusCode, Bytes)>,
    log: Vec<Recorded>,
}

pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
    refresh_delay: Duration,
    refresh_calls: AtomicUsize,
}

impl FakeBackend {
    /// Backend whose refresh endpoint issues `token`. No credential is accepted
    /// on protected routes until a refresh happens or [`Self::accepting`] is used.
    pub(crate) fn new(token: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                accepted_token: None,
                reject_all: false,
                refresh_reply: RefreshReply::rotate(token, None),
                routes: HashMap::new(),
                log: Vec::new(),
            }),
            refresh_delay: Duration::ZERO,
            refresh_calls: AtomicUsize::new(0),
        }
    }

    /// Backend that rejects every protected call regardless of credential.
    pub(crate) fn rejecting_everything() -> Self {
        let backend = Self::new("fresh");
        backend.lock().reject_all = true;
        backend
    }

    pub(crate) fn accepting(self, token: &str) -> Self {
        self.lock().accepted_token = Some(token.to_string());
        self
    }

    pub(crate) fn with_refresh(self, reply: RefreshReply) -> Self {
        self.lock().refresh_reply = reply;
        self
    }

    pub(crate) fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub(crate) fn with_route(self, path: &str, status: StatusCode, body: impl Into<Bytes>) -> Self {
        self.lock()
            .routes
            .insert(path.to_string(), (status, body.into()));
        self
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn total_requests(&self) -> usize {
        self.lock().log.len()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.lock()
            .log
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn answer_refresh(&self) -> ApiResponse {
        let mut state = self.lock();
        match state.refresh_reply.clone() {
            RefreshReply::Rotate { access, refresh } => {
                state.accepted_token = Some(access.clone());
                let body = match refresh {
                    Some(refresh) => json!({"access_token": access, "refresh_token": refresh}),
                    None => json!({"access_token": access}),
                };
                ApiResponse::new(StatusCode::OK, body.to_string())
            }
            RefreshReply::Reject(status) => {
                ApiResponse::new(status, r#"{"detail":"Invalid refresh token"}"#)
            }
            RefreshReply::Garbage => ApiResponse::new(StatusCode::OK, "<html>oops</html>"),
        }
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &OutboundRequest) -> Result<ApiResponse, TransportError> {
        self.lock().log.push(Recorded {
            method: request.method.clone(),
            path: request.path.clone(),
            bearer: request.bearer().map(str::to_string),
            query: request.query.clone(),
            retried: request.retried,
            body: request.body.clone(),
        });

        if request.path == REFRESH_PATH {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if !self.refresh_delay.is_zero() {
                tokio::time::sleep(self.refresh_delay).await;
            }
            return Ok(self.answer_refresh());
        }

        let state = self.lock();
        let public = PUBLIC_PATHS.contains(&request.path.as_str());
        let presented_ok = matches!(
            (&state.accepted_token, request.bearer()),
            (Some(accepted), Some(presented)) if accepted == presented
        );
        let authorized = public || (!state.reject_all && presented_ok);

        if !authorized {
            return Ok(ApiResponse::new(
                StatusCode::UNAUTHORIZED,
                r#"{"detail":"Could not validate credentials"}"#,
            ));
        }

        Ok(match state.routes.get(&request.path) {
            Some((status, body)) => ApiResponse::new(*status, body.clone()),
            None => ApiResponse::new(StatusCode::OK, "{}"),
        })
    }
}
