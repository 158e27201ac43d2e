use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response of `GET /resumes/history`. Every field defaults, so a partial
/// payload still renders as an (emptier) history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeHistory {
    #[serde(default)]
    pub resume_id: Option<String>,
    #[serde(default)]
    pub history: Vec<ResumeVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeVersion {
    pub resume_version_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub analyses: Vec<AnalysisHistoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisHistoryItem {
    pub job_description_id: String,
    #[serde(default)]
    pub final_score: f64,
    #[serde(default)]
    pub breakdown: BTreeMap<String, f64>,
    #[serde(default)]
    pub created_at: String,
}

impl ResumeHistory {
    /// Best score across every analysed version, if any analysis exists.
    pub fn best_score(&self) -> Option<f64> {
        self.history
            .iter()
            .flat_map(|v| v.analyses.iter())
            .map(|a| a.final_score)
            .fold(None, |best, s| Some(best.map_or(s, |b: f64| b.max(s))))
    }
}
