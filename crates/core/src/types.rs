/// All timestamps handled by the console are normalized to UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
