/// Projects are keyed by a UUID v4 rendered as a string; the id doubles as
/// the project's directory name in storage.
pub type ProjectId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh random identifier (projects, sessions).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
