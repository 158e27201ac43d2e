use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::normalizer::normalize;

/// A resume analysis with every field present.
///
/// Serializes in the backend's canonical shape, and deserializes from any
/// payload the normalizer accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    /// 0..=100
    pub score: f64,
    pub breakdown: BTreeMap<String, f64>,
    pub matched_skills: Vec<String>,
    pub weak_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    /// Section name to presence. Always contains every known section.
    pub sections: BTreeMap<String, bool>,
    pub experience_feedback: Vec<String>,
    pub formatting_feedback: Vec<String>,
    pub suggestions: Vec<String>,
}

impl AnalysisRecord {
    pub fn to_canonical(&self) -> Value {
        json!({
            "final_ats_score": self.score,
            "score_breakdown": self.breakdown,
            "skills": {
                "matched": self.matched_skills,
                "weak": self.weak_skills,
                "missing": self.missing_skills,
            },
            "sections": self.sections,
            "experience": {"feedback": self.experience_feedback},
            "formatting": {"feedback": self.formatting_feedback},
            "suggestions": self.suggestions,
        })
    }

    pub fn band(&self) -> ScoreBand {
        ScoreBand::for_score(self.score)
    }

    pub fn missing_sections(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .filter(|(_, present)| !**present)
            .map(|(name, _)| name.as_str())
    }
}

impl Serialize for AnalysisRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_canonical().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AnalysisRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        normalize(&value).ok_or_else(|| de::Error::custom("no ATS score in payload"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Good,
    NeedsWork,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> Self {
        if score >= 80.0 {
            ScoreBand::Excellent
        } else if score >= 60.0 {
            ScoreBand::Good
        } else {
            ScoreBand::NeedsWork
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::NeedsWork => "needs work",
        };
        f.write_str(label)
    }
}
