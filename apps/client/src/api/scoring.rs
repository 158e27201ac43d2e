use serde_json::Value;
use tracing::{debug, info};

use crate::analysis::{normalize, AnalysisRecord};
use crate::api::SCORE_PATH;
use crate::errors::ApiError;
use crate::http::{OutboundRequest, SessionClient};
use crate::models::job::ScoreRequest;

impl SessionClient {
    /// POST /ats/score, returning the payload exactly as the backend sent it.
    pub async fn score_raw(&self, job_description: &str) -> Result<Value, ApiError> {
        if job_description.trim().is_empty() {
            return Err(ApiError::Validation(
                "job description cannot be empty".to_string(),
            ));
        }

        let request = OutboundRequest::post(SCORE_PATH).json(&ScoreRequest { job_description })?;
        let response = self.execute(request).await?;
        Ok(response.json()?)
    }

    /// Scores the current resume against `job_description`.
    ///
    /// `Ok(None)` means the backend answered but no score could be found in the
    /// payload.
    pub async fn score(&self, job_description: &str) -> Result<Option<AnalysisRecord>, ApiError> {
        let payload = self.score_raw(job_description).await?;
        let record = normalize(&payload);
        match &record {
            Some(record) => info!(score = record.score, "resume scored"),
            None => debug!("score payload carried no analysis"),
        }
        Ok(record)
    }
}
