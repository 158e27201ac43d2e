use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::record::AnalysisRecord;
use crate::storage::{load_json, remove_json, save_json, StoreError};

/// The last analysis shown to the user, with when it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub saved_at: DateTime<Utc>,
    pub record: AnalysisRecord,
}

/// Keeps the most recent [`AnalysisSnapshot`] on disk so results survive a restart.
#[derive(Debug, Clone)]
pub struct AnalysisSnapshotStore {
    path: PathBuf,
}

impl AnalysisSnapshotStore {
    pub const FILE_NAME: &'static str = "latest_analysis.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, record: &AnalysisRecord) -> Result<AnalysisSnapshot, StoreError> {
        let snapshot = AnalysisSnapshot {
            saved_at: Utc::now(),
            record: record.clone(),
        };
        save_json(&self.path, &snapshot)?;
        info!(path = %self.path.display(), score = record.score, "analysis snapshot saved");
        Ok(snapshot)
    }

    /// A snapshot that no longer parses is reported and treated as absent.
    pub fn load(&self) -> Result<Option<AnalysisSnapshot>, StoreError> {
        match load_json(&self.path) {
            Ok(snapshot) => Ok(snapshot),
            Err(StoreError::Json(e)) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable analysis snapshot");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        remove_json(&self.path)
    }
}
