use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Navigation log entry (JSONL)
// ---------------------------------------------------------------------------

/// One navigation, as appended to `~/.emote-dash/history.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    /// What produced the navigation: `"patch"` or `"toggle"`.
    pub origin: String,
    /// The patch exactly as the control sent it.
    #[serde(default)]
    pub patch: Value,
    /// URL that was pushed.
    pub url: String,
}

/// Append-only navigation history backed by a JSONL file.
///
/// All writes are best-effort: a failing history file never blocks a
/// navigation.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.emote-dash/history.jsonl`, if a home directory exists.
    pub fn default_location() -> Option<Self> {
        history_path().map(Self::at)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, origin: &str, patch: &Value, url: &str) {
        let entry = HistoryEntry {
            timestamp: Utc::now().to_rfc3339(),
            origin: origin.to_string(),
            patch: patch.clone(),
            url: url.to_string(),
        };

        if let Err(e) = self.append(&entry) {
            log::debug!("history.write_failed path={} error={e}", self.path.display());
        }
    }

    /// The last `limit` entries, oldest first. Malformed lines are skipped.
    pub fn read_recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let Ok(file) = fs::File::open(&self.path) else {
            return Vec::new();
        };

        let entries: Vec<HistoryEntry> = BufReader::new(file)
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        let skip = entries.len().saturating_sub(limit);
        entries.into_iter().skip(skip).collect()
    }

    fn append(&self, entry: &HistoryEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{json}")?;

        Ok(())
    }
}

/// Return the path to the navigation history file.
pub fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".emote-dash").join("history.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::at(dir.path().join("none.jsonl"));
        assert!(log.read_recent(5).is_empty());
    }

    #[test]
    fn record_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::at(dir.path().join("nested").join("history.jsonl"));
        log.record("patch", &json!({ "chartType": "bar" }), "/?data=x");
        assert!(log.path().exists());
    }

    #[test]
    fn read_recent_keeps_the_tail_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::at(dir.path().join("history.jsonl"));
        for i in 0..4 {
            log.record("patch", &json!({ "maxClipIndex": i }), &format!("/?i={i}"));
        }
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, "not json").unwrap();

        let recent = log.read_recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].url, "/?i=2");
        assert_eq!(recent[1].url, "/?i=3");
        assert_eq!(recent[1].patch, json!({ "maxClipIndex": 3 }));
    }
}
