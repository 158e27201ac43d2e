//! OTP login and logout.

use tracing::{info, warn};

use crate::api::{LOGOUT_PATH, REQUEST_OTP_PATH, VERIFY_OTP_PATH};
use crate::errors::ApiError;
use crate::http::{OutboundRequest, SessionClient};
use crate::models::auth::{OtpRequest, OtpVerification, TokenPair};
use crate::session::SignOutCause;

const OTP_LENGTH: usize = 6;

impl SessionClient {
    /// POST /auth/request-otp
    pub async fn request_otp(&self, email: &str) -> Result<(), ApiError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ApiError::Validation("email cannot be empty".to_string()));
        }

        let request = OutboundRequest::post(REQUEST_OTP_PATH).json(&OtpRequest { email })?;
        self.execute(request).await?;
        info!("one-time code requested");
        Ok(())
    }

    /// POST /auth/verify-otp
    ///
    /// Stores the issued credential pair and flips the session to authenticated.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<(), ApiError> {
        let email = email.trim();
        let otp = otp.trim();
        if email.is_empty() {
            return Err(ApiError::Validation("email cannot be empty".to_string()));
        }
        if otp.chars().count() != OTP_LENGTH {
            return Err(ApiError::Validation(format!(
                "one-time code must be {OTP_LENGTH} characters"
            )));
        }

        let request =
            OutboundRequest::post(VERIFY_OTP_PATH).json(&OtpVerification { email, otp })?;
        let tokens: TokenPair = self.execute(request).await?.json()?;

        self.session()
            .establish(&tokens.access_token, &tokens.refresh_token)?;
        Ok(())
    }

    /// POST /auth/logout
    ///
    /// Best effort: the backend call may fail, the local session is always
    /// terminated.
    pub async fn logout(&self) {
        if self.session().is_authenticated() {
            // A rejected credential is not refreshed just to be revoked.
            let mut request = OutboundRequest::post(LOGOUT_PATH);
            request.retried = true;
            if let Err(e) = self.execute(request).await {
                warn!(error = %e, "logout request failed; signing out locally");
            }
        }
        self.session().terminate(SignOutCause::Logout);
    }
}
