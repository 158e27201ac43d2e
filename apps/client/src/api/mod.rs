//! Typed operations for every backend endpoint the client consumes. Each one
//! goes through [`crate::SessionClient::execute`], so all of them get credential
//! attachment and refresh-and-retry for free.

pub mod auth;
pub mod jobs;
pub mod resumes;
pub mod scoring;

pub const REQUEST_OTP_PATH: &str = "/auth/request-otp";
pub const VERIFY_OTP_PATH: &str = "/auth/verify-otp";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const UPLOAD_RESUME_PATH: &str = "/resumes/upload";
pub const LATEST_RESUME_PATH: &str = "/resumes/latest/verify";
pub const LATEST_ANALYZED_FILE_PATH: &str = "/resumes/latest-analyzed-file";
pub const RESUME_HISTORY_PATH: &str = "/resumes/history";
pub const ANALYZE_JOB_PATH: &str = "/jobs/analyze";
pub const SCORE_PATH: &str = "/ats/score";
