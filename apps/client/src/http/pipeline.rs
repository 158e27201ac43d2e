//! Request Pipeline: the only way requests leave the client.
//!
//! Attaches the access credential, routes a 401 through the
//! [`RefreshCoordinator`], and replays the identical request at most once.

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{info, warn};

use crate::errors::ApiError;
use crate::http::{ApiResponse, OutboundRequest, Transport};
use crate::session::{RefreshCoordinator, Session};

#[derive(Clone)]
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    session: Session,
    refresh: Arc<RefreshCoordinator>,
}

impl SessionClient {
    pub fn new(transport: Arc<dyn Transport>, session: Session) -> Self {
        let refresh = Arc::new(RefreshCoordinator::new(session.clone(), transport.clone()));
        Self {
            transport,
            session,
            refresh,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    /// Sends `request`, returning the response only when it is 2xx.
    ///
    /// A 401 on a request that has not been retried triggers one refresh and
    /// one replay. If the refresh fails, the session is already terminated and
    /// the original 401 is returned.
    pub async fn execute(&self, mut request: OutboundRequest) -> Result<ApiResponse, ApiError> {
        if request.is_refresh() {
            let response = self.transport.send(&request).await?;
            return into_result(response);
        }

        let presented = self.session.access_credential();
        if let Some(token) = &presented {
            request.set_bearer(token)?;
        }

        let response = self.transport.send(&request).await?;
        if response.status != StatusCode::UNAUTHORIZED || request.retried {
            return into_result(response);
        }

        request.retried = true;
        info!(method = %request.method, path = %request.path, "access credential rejected; refreshing");

        match self.refresh.refresh_after_rejection(presented.as_deref()).await {
            Ok(token) => {
                request.set_bearer(&token)?;
                let retry = self.transport.send(&request).await?;
                if retry.status == StatusCode::UNAUTHORIZED {
                    warn!(path = %request.path, "refreshed credential rejected; not retrying again");
                }
                into_result(retry)
            }
            Err(signal) => {
                warn!(path = %request.path, %signal, "request abandoned after failed refresh");
                Err(ApiError::from_response(&response))
            }
        }
    }
}

fn into_result(response: ApiResponse) -> Result<ApiResponse, ApiError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(&response))
    }
}
