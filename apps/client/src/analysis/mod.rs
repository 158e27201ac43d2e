//! Turns the loosely structured scoring payload into an [`AnalysisRecord`].
//!
//! The backend wraps the score object in varying envelopes: nested under
//! arbitrary keys, serialized into a string, fenced as Markdown. [`normalize`]
//! finds it wherever it is and fills every field with a default.

mod fences;
mod normalizer;
mod record;
mod snapshot;

pub use normalizer::{normalize, KNOWN_SECTIONS, SCORE_KEYS};
pub use record::{AnalysisRecord, ScoreBand};
pub use snapshot::{AnalysisSnapshot, AnalysisSnapshotStore};
