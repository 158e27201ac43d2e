use tracing::info;

use crate::api::ANALYZE_JOB_PATH;
use crate::errors::ApiError;
use crate::http::{OutboundRequest, SessionClient};
use crate::models::job::{JobAnalysis, JobContent};

impl SessionClient {
    /// POST /jobs/analyze
    pub async fn analyze_job(&self, content: &str) -> Result<JobAnalysis, ApiError> {
        if content.trim().is_empty() {
            return Err(ApiError::Validation(
                "job description cannot be empty".to_string(),
            ));
        }

        let request = OutboundRequest::post(ANALYZE_JOB_PATH).json(&JobContent { content })?;
        let analysis: JobAnalysis = self.execute(request).await?.json()?;
        info!(skills = analysis.skills.len(), "job description analyzed");
        Ok(analysis)
    }
}
