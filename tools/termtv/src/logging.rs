use crate::config::LoggingConfig;
use crate::errors::TermtvError;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: 4096,
        }
    }

    pub fn from_config(cfg: &LoggingConfig) -> Option<Self> {
        cfg.path.as_ref().map(|path| Self {
            path: path.clone(),
            max_payload_bytes: cfg.max_payload_bytes,
        })
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), TermtvError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| TermtvError::Io(e.to_string()))?;
        }
        let truncated = truncate_json(event.payload.clone(), self.max_payload_bytes);
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncated,
        })
        .map_err(|e| TermtvError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TermtvError::Io(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| TermtvError::Io(e.to_string()))
    }
}

/// Appends to `logger` when one is configured. Logging never fails the caller.
pub fn log_event(logger: Option<&JsonlLogger>, level: &str, event_type: &str, payload: Value) {
    if let Some(logger) = logger {
        let _ = logger.append(&LogEvent {
            level,
            event_type,
            payload,
        });
    }
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes.saturating_sub(3);
    while end > 0 && !rendered.is_char_boundary(end) {
        end -= 1;
    }
    Value::String(format!("{}...", &rendered[..end]))
}
