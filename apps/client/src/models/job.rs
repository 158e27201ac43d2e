use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSkill {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Response of `POST /jobs/analyze`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobAnalysis {
    #[serde(default)]
    pub job_description_id: Option<String>,
    #[serde(default)]
    pub skills: Vec<JobSkill>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JobContent<'a> {
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreRequest<'a> {
    pub job_description: &'a str,
}
