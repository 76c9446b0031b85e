use crate::types::{BuildContext, RecordingName};
use std::path::PathBuf;

/// One named ttyrec stream and the two places its bytes can live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub name: RecordingName,
    pub archive_root: PathBuf,
    pub archive_location: PathBuf,
    pub live_location: PathBuf,
}

impl Recording {
    pub fn for_build(build: &BuildContext, archive_subdir: &str, name: RecordingName) -> Self {
        let archive_root = build.artifacts_dir.join(archive_subdir);
        Self {
            archive_location: name.under(&archive_root),
            live_location: name.under(&build.workspace_dir),
            archive_root,
            name,
        }
    }

    /// Directory that must exist before the archived copy can be written.
    pub fn archive_parent(&self) -> PathBuf {
        self.archive_location
            .parent()
            .map(|parent| parent.to_path_buf())
            .unwrap_or_else(|| self.archive_root.clone())
    }
}
