use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::history::{HistoryError, HistoryStore};
use crate::utils::logger;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResumePoint {
    position_seconds: f64,
    saved_at: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryData {
    #[serde(default)]
    recent: Vec<String>,
    #[serde(default)]
    resume: BTreeMap<String, ResumePoint>,
}

/// History store kept as one JSON file.
///
/// Every call reads the file and every change rewrites it, so separate
/// sessions never clobber each other's entries for long.
pub struct JsonHistory {
    path: PathBuf,
    limit: usize,
}

impl JsonHistory {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HistoryData, HistoryError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HistoryData::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, data: &HistoryData) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn update(&self, change: impl FnOnce(&mut HistoryData)) -> Result<(), HistoryError> {
        let mut data = self.load()?;
        change(&mut data);
        self.save(&data)
    }
}

impl HistoryStore for JsonHistory {
    fn list_recent(&self) -> Vec<String> {
        match self.load() {
            Ok(data) => data.recent,
            Err(err) => {
                logger::warn(&format!("cannot read {}: {}", self.path.display(), err));
                Vec::new()
            }
        }
    }

    fn record_visit(&self, uri: &str) -> Result<(), HistoryError> {
        let limit = self.limit;
        self.update(|data| {
            data.recent.retain(|entry| entry != uri);
            data.recent.insert(0, uri.to_string());
            data.recent.truncate(limit);
        })
    }

    fn save_resume(&self, uri: &str, position: Duration) -> Result<(), HistoryError> {
        self.update(|data| {
            if position.is_zero() {
                data.resume.remove(uri);
            } else {
                data.resume.insert(
                    uri.to_string(),
                    ResumePoint {
                        position_seconds: position.as_secs_f64(),
                        saved_at: chrono::Utc::now().timestamp(),
                    },
                );
            }
        })
    }

    fn resume_position(&self, uri: &str) -> Option<Duration> {
        let data = self.load().ok()?;
        let point = data.resume.get(uri)?;
        Duration::try_from_secs_f64(point.position_seconds).ok()
    }
}
