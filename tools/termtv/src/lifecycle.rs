//! Build start/end hooks.
//!
//! The orchestrator calls `on_build_start` when a build begins and keeps the
//! returned handle with the build. `on_build_end` performs the archive
//! hand-off and always reports back without an error so a recording problem
//! can never fail the build.

use crate::archival::{ArchivalCoordinator, ArchivalOutcome};
use crate::config::{AppConfig, ViewerConfig};
use crate::errors::TermtvError;
use crate::logging::{log_event, JsonlLogger};
use crate::recording::Recording;
use crate::resolver::{RecordingResolver, Resolution};
use crate::runtime::FileSystem;
use crate::types::{BuildContext, RecordingName, RecordingState};
use serde_json::json;
use std::sync::Arc;

pub trait BuildLifecycle: Send + Sync {
    fn on_build_start(
        &self,
        build: BuildContext,
        name: &RecordingName,
    ) -> Result<RecordingHandle, TermtvError>;

    fn on_build_end(&self, handle: &RecordingHandle) -> ArchivalOutcome;
}

/// Per-build association of a recording with the build that produced it.
#[derive(Clone)]
pub struct RecordingHandle {
    build: BuildContext,
    recording: Recording,
    archive_subdir: String,
    viewer: ViewerConfig,
    resolver: RecordingResolver,
}

impl RecordingHandle {
    pub fn build(&self) -> &BuildContext {
        &self.build
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn viewer(&self) -> &ViewerConfig {
        &self.viewer
    }

    pub fn fetch(&self) -> Resolution {
        self.resolver.resolve(&self.recording)
    }

    pub fn state(&self) -> RecordingState {
        self.resolver.state(&self.recording)
    }

    pub fn archived_copy_exists(&self) -> bool {
        self.state() == RecordingState::Archived
    }

    /// Path of the archived copy relative to the build's artifact listing.
    pub fn artifact_url_path(&self) -> String {
        format!("artifact/{}/{}", self.archive_subdir, self.recording.name)
    }
}

pub struct RecordingLifecycle {
    fs: Arc<dyn FileSystem>,
    config: AppConfig,
    logger: Option<JsonlLogger>,
}

impl RecordingLifecycle {
    pub fn new(fs: Arc<dyn FileSystem>, config: AppConfig) -> Self {
        let logger = JsonlLogger::from_config(&config.logging);
        Self { fs, config, logger }
    }

    fn resolver(&self) -> RecordingResolver {
        RecordingResolver::new(self.fs.clone())
            .with_max_recording_bytes(self.config.storage.max_recording_bytes)
            .with_logger(self.logger.clone())
    }
}

impl BuildLifecycle for RecordingLifecycle {
    fn on_build_start(
        &self,
        build: BuildContext,
        name: &RecordingName,
    ) -> Result<RecordingHandle, TermtvError> {
        if !is_routable_build_id(&build.build_id) {
            return Err(TermtvError::InvalidConfig(format!(
                "build id {:?} must be a non-empty segment of [A-Za-z0-9._-]",
                build.build_id
            )));
        }
        let recording =
            Recording::for_build(&build, &self.config.storage.archive_subdir, name.clone());
        log_event(
            self.logger.as_ref(),
            "info",
            "recording_registered",
            json!({
                "build_id": build.build_id,
                "name": name.as_str(),
                "live": recording.live_location.display().to_string(),
            }),
        );
        Ok(RecordingHandle {
            build,
            recording,
            archive_subdir: self.config.storage.archive_subdir.clone(),
            viewer: self.config.viewer.clone(),
            resolver: self.resolver(),
        })
    }

    fn on_build_end(&self, handle: &RecordingHandle) -> ArchivalOutcome {
        ArchivalCoordinator::new(handle.resolver.clone()).archive(&handle.recording)
    }
}

/// Build ids appear verbatim as a URL path segment.
fn is_routable_build_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
