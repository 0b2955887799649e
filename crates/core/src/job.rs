//! Render job models as mirrored from the backend.
//!
//! The console never creates a [`Job`]; it only holds copies of what the
//! admin render list (`GET /api/admin/renders`) or the caller's own render
//! history (`GET /api/render-history`) returned.

use serde::{Deserialize, Deserializer, Serialize};

use crate::output_path::normalize_output_path;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

pub const STATUS_QUEUED: &str = "queued";
pub const STATUS_RENDERING: &str = "rendering";
pub const STATUS_DONE: &str = "done";
pub const STATUS_ERROR: &str = "error";
pub const STATUS_DELETED: &str = "deleted";
pub const STATUS_RESTARTED: &str = "restarted";
pub const STATUS_UNKNOWN: &str = "unknown";

/// Lifecycle status of a render job.
///
/// The backend is not trusted to stay inside the known set, so any other
/// value is carried verbatim in [`JobStatus::Other`] instead of being
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Rendering,
    Done,
    Error,
    Deleted,
    Restarted,
    #[default]
    Unknown,
    Other(String),
}

impl JobStatus {
    /// Every status the backend is documented to emit.
    pub const KNOWN: [JobStatus; 7] = [
        JobStatus::Queued,
        JobStatus::Rendering,
        JobStatus::Done,
        JobStatus::Error,
        JobStatus::Deleted,
        JobStatus::Restarted,
        JobStatus::Unknown,
    ];

    /// Wire representation of the status.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => STATUS_QUEUED,
            JobStatus::Rendering => STATUS_RENDERING,
            JobStatus::Done => STATUS_DONE,
            JobStatus::Error => STATUS_ERROR,
            JobStatus::Deleted => STATUS_DELETED,
            JobStatus::Restarted => STATUS_RESTARTED,
            JobStatus::Unknown => STATUS_UNKNOWN,
            JobStatus::Other(raw) => raw,
        }
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        match value {
            STATUS_QUEUED => JobStatus::Queued,
            STATUS_RENDERING => JobStatus::Rendering,
            STATUS_DONE => JobStatus::Done,
            STATUS_ERROR => JobStatus::Error,
            STATUS_DELETED => JobStatus::Deleted,
            STATUS_RESTARTED => JobStatus::Restarted,
            STATUS_UNKNOWN => JobStatus::Unknown,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        JobStatus::from(value.as_str())
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One render task, keyed by its server-assigned `uid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub uid: String,
    #[serde(default)]
    pub template_name: String,
    /// Username of the job owner.
    #[serde(default)]
    pub user: String,
    /// Creation time as sent by the backend (ISO-like, not parsed here).
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: JobStatus,
    /// Nominally `0.0..=1.0`; the backend does not clamp it.
    #[serde(default)]
    pub progress: Option<f64>,
    /// Present only for finished jobs. Empty strings are read as absent.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub output_path: Option<String>,
}

impl Job {
    /// Integer percentage for display, always within `0..=100`.
    pub fn percent(&self) -> u8 {
        display_percent(self.progress)
    }

    /// Public download link for a finished job.
    ///
    /// Returns `None` unless the job is [`JobStatus::Done`] and carries an
    /// output path.
    pub fn download_link(&self, download_root: &str) -> Option<String> {
        if self.status != JobStatus::Done {
            return None;
        }
        self.output_path
            .as_deref()
            .map(|path| normalize_output_path(path, download_root))
    }
}

/// Convert a raw progress fraction into a display percentage.
///
/// Missing and non-numeric (`NaN`) values display as `0`; everything else
/// is `clamp(round(p * 100), 0, 100)`.
pub fn display_percent(progress: Option<f64>) -> u8 {
    let raw = progress.unwrap_or(0.0) * 100.0;
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

// ---------------------------------------------------------------------------
// Own render history
// ---------------------------------------------------------------------------

/// A row from `GET /api/render-history`.
///
/// Unlike the admin list, progress and output location live inside the
/// free-form `params` object the job was submitted with.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    pub uid: String,
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub submitted_at: String,
    #[serde(default)]
    pub status: JobStatus,
}

impl HistoryRecord {
    fn param_str(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl From<HistoryRecord> for Job {
    fn from(record: HistoryRecord) -> Self {
        let progress = record
            .params
            .get("progress")
            .and_then(serde_json::Value::as_f64);
        let output_path = record.param_str("output_path").map(str::to_string);
        let template_name = if record.template_name.is_empty() {
            record.param_str("template").unwrap_or_default().to_string()
        } else {
            record.template_name.clone()
        };

        Job {
            uid: record.uid,
            template_name,
            user: record.username,
            date: record.submitted_at,
            status: record.status,
            progress,
            output_path,
        }
    }
}
