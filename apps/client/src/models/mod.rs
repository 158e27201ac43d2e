pub mod auth;
pub mod job;
pub mod resume;

pub use auth::TokenPair;
pub use job::{JobAnalysis, JobSkill};
pub use resume::{AnalysisHistoryItem, ResumeHistory, ResumeVersion};
