use crate::errors::TermtvError;
use crate::logging::log_event;
use crate::recording::Recording;
use crate::resolver::RecordingResolver;
use serde_json::json;

/// Diagnostic result of a hand-off. It is never an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchivalOutcome {
    Archived { bytes: usize },
    SkippedNoLiveCopy,
    Failed { reason: String },
}

impl ArchivalOutcome {
    pub fn is_archived(&self) -> bool {
        matches!(self, Self::Archived { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Archived { bytes } => format!("archived bytes={bytes}"),
            Self::SkippedNoLiveCopy => "skipped: no live recording".to_string(),
            Self::Failed { reason } => format!("failed: {reason}"),
        }
    }
}

/// Copies a recording's live bytes into the build archive at build end.
#[derive(Clone)]
pub struct ArchivalCoordinator {
    resolver: RecordingResolver,
}

impl ArchivalCoordinator {
    pub fn new(resolver: RecordingResolver) -> Self {
        Self { resolver }
    }

    /// Best-effort copy of live to archive. Overwrites any previous archive
    /// content and swallows every I/O failure into `ArchivalOutcome::Failed`.
    pub fn archive(&self, recording: &Recording) -> ArchivalOutcome {
        let outcome = self
            .try_archive(recording)
            .unwrap_or_else(|err| ArchivalOutcome::Failed {
                reason: err.to_string(),
            });

        let level = match outcome {
            ArchivalOutcome::Failed { .. } => "warn",
            _ => "info",
        };
        log_event(
            self.resolver.logger(),
            level,
            "recording_archived",
            json!({
                "name": recording.name.as_str(),
                "archive": recording.archive_location.display().to_string(),
                "outcome": outcome.describe(),
            }),
        );
        outcome
    }

    fn try_archive(&self, recording: &Recording) -> Result<ArchivalOutcome, TermtvError> {
        let fs = self.resolver.file_system();
        fs.create_dir_all(&recording.archive_parent())?;

        let Some(bytes) = self.resolver.resolve_live_uncapped(recording)? else {
            return Ok(ArchivalOutcome::SkippedNoLiveCopy);
        };
        fs.write_bytes(&recording.archive_location, &bytes)?;
        Ok(ArchivalOutcome::Archived { bytes: bytes.len() })
    }
}
