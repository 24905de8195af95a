use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    delivery::types::FailureKind,
    errors::Error,
    feed::{FeedReport, FeedStatus},
    ports::ResultSink,
    Result,
};

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

// ============== Activity Log ==============

const ACTIVITY_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct ActivityEvent {
    pub timestamp: String,
    pub event: String,
    pub feed: String,
    pub status: FeedStatus,
    pub note: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
}

impl ActivityEvent {
    pub fn feed_result(report: &FeedReport) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: "telegram_feed".to_string(),
            feed: report.feed.clone(),
            status: report.status,
            note: report.note.clone(),
            message_id: report.message_id.as_ref().map(|m| m.0.clone()),
            failure_kind: report.failure_kind,
        }
    }
}

/// Append-only activity log, one entry per delivery attempt.
#[derive(Debug)]
pub struct ActivityLog {
    path: PathBuf,
    json: bool,
    // Serializes appends from concurrent feeds.
    lock: Mutex<()>,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: ActivityEvent) -> Result<()> {
        event.note = truncate_text(&event.note, ACTIVITY_MAX_TEXT);

        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::External("activity log lock poisoned".to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "activity event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

impl ResultSink for ActivityLog {
    fn report(&self, report: &FeedReport) -> Result<()> {
        self.write(ActivityEvent::feed_result(report))
    }
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

// ============== Tracing Sink ==============

/// Result sink that only logs. Used when the host has no activity log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl ResultSink for TracingSink {
    fn report(&self, report: &FeedReport) -> Result<()> {
        match report.status {
            FeedStatus::Success => info!(feed = %report.feed, "{}", report.note),
            FeedStatus::Failed => warn!(
                feed = %report.feed,
                kind = ?report.failure_kind,
                "{}",
                report.note
            ),
        }
        Ok(())
    }
}
