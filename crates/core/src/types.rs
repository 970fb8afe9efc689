/// Identifier of a processing task.
pub type TaskId = uuid::Uuid;

/// Identifier of an uploaded file record.
pub type FileId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
