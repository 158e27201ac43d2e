//! Resume upload, retrieval, and history.

use std::path::Path;

use bytes::Bytes;
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::api::{
    LATEST_ANALYZED_FILE_PATH, LATEST_RESUME_PATH, RESUME_HISTORY_PATH, UPLOAD_RESUME_PATH,
};
use crate::errors::ApiError;
use crate::http::{OutboundRequest, SessionClient};
use crate::models::ResumeHistory;

const UPLOAD_FIELD: &str = "file";

/// MIME type sent with an uploaded resume, inferred from its extension.
pub fn resume_mime(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("doc") => "application/msword",
        _ => "application/octet-stream",
    }
}

impl SessionClient {
    /// POST /resumes/upload (multipart `file`). Returns the stored file as the
    /// backend echoes it.
    pub async fn upload_resume(
        &self,
        file_name: &str,
        contents: impl Into<Bytes>,
    ) -> Result<Bytes, ApiError> {
        let contents = contents.into();
        if contents.is_empty() {
            return Err(ApiError::Validation("resume file is empty".to_string()));
        }

        let size = contents.len();
        let request = OutboundRequest::post(UPLOAD_RESUME_PATH).multipart(
            UPLOAD_FIELD,
            file_name,
            resume_mime(file_name),
            contents,
        );
        let response = self.execute(request).await?;
        info!(file_name, bytes = size, "resume uploaded");
        Ok(response.body)
    }

    /// GET /resumes/latest/verify
    ///
    /// `None` when the user has not uploaded a resume yet: the backend answers
    /// with an empty body or a 404.
    pub async fn latest_resume(&self) -> Result<Option<Bytes>, ApiError> {
        match self.execute(OutboundRequest::get(LATEST_RESUME_PATH)).await {
            Ok(response) if response.body.is_empty() => Ok(None),
            Ok(response) => Ok(Some(response.body)),
            Err(ApiError::Server { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                debug!("no resume uploaded yet");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// GET /resumes/latest-analyzed-file
    pub async fn latest_analyzed_file(&self) -> Result<Bytes, ApiError> {
        let response = self
            .execute(OutboundRequest::get(LATEST_ANALYZED_FILE_PATH))
            .await?;
        Ok(response.body)
    }

    /// GET /resumes/history
    pub async fn resume_history(&self) -> Result<ResumeHistory, ApiError> {
        let response = self.execute(OutboundRequest::get(RESUME_HISTORY_PATH)).await?;
        Ok(response.json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeBackend;
    use crate::http::RequestBody;
    use crate::session::Session;
    use std::sync::Arc;

    fn signed_in(backend: Arc<FakeBackend>) -> SessionClient {
        let client = SessionClient::new(backend, Session::in_memory());
        client.session().establish("a1", "r1").unwrap();
        client
    }

    #[test]
    fn test_resume_mime_by_extension() {
        assert_eq!(resume_mime("cv.PDF"), "application/pdf");
        assert_eq!(
            resume_mime("cv.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(resume_mime("cv"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_file() {
        let backend = Arc::new(FakeBackend::new("a1").accepting("a1").with_route(
            UPLOAD_RESUME_PATH,
            StatusCode::OK,
            "%PDF-1.7",
        ));
        let client = signed_in(backend.clone());

        let echoed = client
            .upload_resume("resume.pdf", b"%PDF-1.7".to_vec())
            .await
            .unwrap();

        assert_eq!(&echoed[..], b"%PDF-1.7");
        let calls = backend.requests_to(UPLOAD_RESUME_PATH);
        match &calls[0].body {
            RequestBody::Multipart {
                field,
                file_name,
                mime,
                bytes,
            } => {
                assert_eq!(field, "file");
                assert_eq!(file_name, "resume.pdf");
                assert_eq!(mime, "application/pdf");
                assert_eq!(&bytes[..], b"%PDF-1.7");
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_file() {
        let backend = Arc::new(FakeBackend::new("a1").accepting("a1"));
        let client = signed_in(backend.clone());

        let err = client.upload_resume("resume.pdf", Vec::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(backend.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_upload_is_replayed_after_refresh() {
        let backend = Arc::new(FakeBackend::new("fresh"));
        let client = signed_in(backend.clone());

        client
            .upload_resume("resume.pdf", b"%PDF".to_vec())
            .await
            .unwrap();

        let calls = backend.requests_to(UPLOAD_RESUME_PATH);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].body, calls[1].body);
    }

    #[tokio::test]
    async fn test_latest_resume_empty_body_is_none() {
        let backend = Arc::new(FakeBackend::new("a1").accepting("a1").with_route(
            LATEST_RESUME_PATH,
            StatusCode::OK,
            Bytes::new(),
        ));
        let client = signed_in(backend);
        assert!(client.latest_resume().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_resume_not_found_is_none() {
        let backend = Arc::new(FakeBackend::new("a1").accepting("a1").with_route(
            LATEST_RESUME_PATH,
            StatusCode::NOT_FOUND,
            r#"{"detail":"No uploaded resume found."}"#,
        ));
        let client = signed_in(backend);
        assert!(client.latest_resume().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_resume_returns_bytes() {
        let backend = Arc::new(FakeBackend::new("a1").accepting("a1").with_route(
            LATEST_RESUME_PATH,
            StatusCode::OK,
            "%PDF",
        ));
        let client = signed_in(backend);
        let bytes = client.latest_resume().await.unwrap().unwrap();
        assert_eq!(&bytes[..], b"%PDF");
    }

    #[tokio::test]
    async fn test_latest_resume_server_error_propagates() {
        let backend = Arc::new(FakeBackend::new("a1").accepting("a1").with_route(
            LATEST_RESUME_PATH,
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
        ));
        let client = signed_in(backend);
        assert!(client.latest_resume().await.is_err());
    }

    #[tokio::test]
    async fn test_resume_history_parses() {
        let backend = Arc::new(FakeBackend::new("a1").accepting("a1").with_route(
            RESUME_HISTORY_PATH,
            StatusCode::OK,
            r#"{"resume_id":"r","history":[{"resume_version_id":"v1","status":"PARSED","created_at":"2025-01-01T00:00:00","analyses":[]}]}"#,
        ));
        let client = signed_in(backend);

        let history = client.resume_history().await.unwrap();
        assert_eq!(history.history.len(), 1);
        assert_eq!(history.history[0].status, "PARSED");
    }
}
