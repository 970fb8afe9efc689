//! Uploaded file records.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{FileId, Timestamp};

/// Content types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.ms-excel",
    "text/plain",
    "text/html",
    "text/csv",
    "text/markdown",
];

/// Returns true if `content_type` (ignoring parameters such as `charset`)
/// may be uploaded.
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    ALLOWED_CONTENT_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(essence))
}

/// Returns true if the content type carries UTF-8 text that can be split
/// without a document parser.
pub fn is_text_content_type(content_type: &str) -> bool {
    content_type.trim().to_ascii_lowercase().starts_with("text/")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    #[default]
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(Self::Uploaded),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!("Unknown file status '{other}'"))),
        }
    }
}

/// Metadata of one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    /// Name on disk (`<uuid><ext>`).
    pub filename: String,
    /// Name supplied by the client.
    pub original_filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub content_type: String,
    pub uploaded_at: Timestamp,
    pub status: FileStatus,
    pub chunks_count: i32,
    pub error_message: Option<String>,
}

impl FileRecord {
    /// Build a fresh record for a file already written to `file_path`.
    pub fn new(
        id: FileId,
        filename: impl Into<String>,
        original_filename: impl Into<String>,
        file_path: impl Into<String>,
        file_size: i64,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            filename: filename.into(),
            original_filename: original_filename.into(),
            file_path: file_path.into(),
            file_size,
            content_type: content_type.into(),
            uploaded_at: Utc::now(),
            status: FileStatus::Uploaded,
            chunks_count: 0,
            error_message: None,
        }
    }
}
