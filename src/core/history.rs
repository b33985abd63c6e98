use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store I/O failed")]
    Io(#[from] std::io::Error),
    #[error("history store is corrupt")]
    Format(#[from] serde_json::Error),
}

/// Recently viewed URIs and resume offsets.
pub trait HistoryStore {
    /// Most recent first. Empty when there is no history.
    fn list_recent(&self) -> Vec<String>;

    fn record_visit(&self, uri: &str) -> Result<(), HistoryError>;

    fn save_resume(&self, uri: &str, position: Duration) -> Result<(), HistoryError>;

    fn resume_position(&self, uri: &str) -> Option<Duration>;
}
