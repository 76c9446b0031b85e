//! Archive-first lookup of recording bytes with a fallback to the live
//! workspace copy.
//!
//! Once an archived copy exists it is returned unconditionally and the
//! workspace is never consulted again. Lookups are read-only.

use crate::errors::TermtvError;
use crate::logging::{log_event, JsonlLogger};
use crate::recording::Recording;
use crate::runtime::FileSystem;
use crate::types::{RecordingSource, RecordingState};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found {
        source: RecordingSource,
        bytes: Vec<u8>,
    },
    NotFound,
}

impl Resolution {
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Found { bytes, .. } => Some(bytes),
            Self::NotFound => None,
        }
    }

    pub fn source(&self) -> Option<RecordingSource> {
        match self {
            Self::Found { source, .. } => Some(*source),
            Self::NotFound => None,
        }
    }
}

#[derive(Clone)]
pub struct RecordingResolver {
    fs: Arc<dyn FileSystem>,
    max_recording_bytes: Option<u64>,
    logger: Option<JsonlLogger>,
}

impl RecordingResolver {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            max_recording_bytes: None,
            logger: None,
        }
    }

    pub fn with_max_recording_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_recording_bytes = limit;
        self
    }

    pub fn with_logger(mut self, logger: Option<JsonlLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn logger(&self) -> Option<&JsonlLogger> {
        self.logger.as_ref()
    }

    /// Bytes of the archived copy, or `None` when no regular file is there.
    pub fn resolve_archive(&self, recording: &Recording) -> Result<Option<Vec<u8>>, TermtvError> {
        let path = &recording.archive_location;
        if !self.fs.is_file(path) {
            return Ok(None);
        }
        if self.max_recording_bytes.is_some() {
            let len = self.fs.len(path)?;
            self.check_size(path, len)?;
        }
        self.fs.read_bytes(path).map(Some)
    }

    /// Bytes of the workspace copy as of the moment its length was sampled.
    ///
    /// The recorder may still be appending. Anything written after the length
    /// snapshot is left out; a file that shrank yields the shorter content.
    pub fn resolve_live(&self, recording: &Recording) -> Result<Option<Vec<u8>>, TermtvError> {
        self.read_live(recording, true)
    }

    /// Same snapshot read as `resolve_live` without the serving size cap.
    /// The archive hand-off must keep recordings of any size.
    pub fn resolve_live_uncapped(
        &self,
        recording: &Recording,
    ) -> Result<Option<Vec<u8>>, TermtvError> {
        self.read_live(recording, false)
    }

    fn read_live(
        &self,
        recording: &Recording,
        capped: bool,
    ) -> Result<Option<Vec<u8>>, TermtvError> {
        let path = &recording.live_location;
        if !self.fs.exists(path) {
            return Ok(None);
        }
        let len = self.fs.len(path)?;
        if capped {
            self.check_size(path, len)?;
        }
        self.fs.read_prefix(path, len).map(Some)
    }

    /// Archive first, then live. Failures degrade to `NotFound`.
    pub fn resolve(&self, recording: &Recording) -> Resolution {
        let resolution = match self.try_resolve(recording) {
            Ok(resolution) => resolution,
            Err(err) => {
                log_event(
                    self.logger.as_ref(),
                    "warn",
                    "recording_read_failed",
                    json!({
                        "name": recording.name.as_str(),
                        "error": err.to_string(),
                    }),
                );
                Resolution::NotFound
            }
        };

        match &resolution {
            Resolution::Found { source, bytes } => log_event(
                self.logger.as_ref(),
                "info",
                "recording_resolved",
                json!({
                    "name": recording.name.as_str(),
                    "source": source.as_str(),
                    "bytes": bytes.len(),
                }),
            ),
            Resolution::NotFound => log_event(
                self.logger.as_ref(),
                "info",
                "recording_not_found",
                json!({ "name": recording.name.as_str() }),
            ),
        }
        resolution
    }

    pub fn state(&self, recording: &Recording) -> RecordingState {
        if self.fs.is_file(&recording.archive_location) {
            RecordingState::Archived
        } else if self.fs.exists(&recording.live_location) {
            RecordingState::Live
        } else {
            RecordingState::Missing
        }
    }

    fn try_resolve(&self, recording: &Recording) -> Result<Resolution, TermtvError> {
        if let Some(bytes) = self.resolve_archive(recording)? {
            return Ok(Resolution::Found {
                source: RecordingSource::Archive,
                bytes,
            });
        }
        if let Some(bytes) = self.resolve_live(recording)? {
            return Ok(Resolution::Found {
                source: RecordingSource::Live,
                bytes,
            });
        }
        Ok(Resolution::NotFound)
    }

    fn check_size(&self, path: &Path, len: u64) -> Result<(), TermtvError> {
        match self.max_recording_bytes {
            Some(limit) if len > limit => Err(TermtvError::Io(format!(
                "{} is {len} bytes, over the {limit} byte limit",
                path.display()
            ))),
            _ => Ok(()),
        }
    }
}
