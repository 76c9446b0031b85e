use crate::errors::TermtvError;
use crate::runtime::FileSystem;
use crate::types::RecordingName;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ARCHIVE_SUBDIR: &str = "ttyrecordings";

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub log_path: Option<PathBuf>,
    pub max_recording_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub viewer: ViewerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory under a build's artifacts dir that holds archived recordings.
    pub archive_subdir: String,
    pub max_recording_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewerConfig {
    pub display_name: String,
    pub url_name: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
    pub max_payload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                archive_subdir: DEFAULT_ARCHIVE_SUBDIR.to_string(),
                max_recording_bytes: None,
            },
            server: ServerConfig {
                bind: "127.0.0.1:8080".to_string(),
            },
            viewer: ViewerConfig {
                display_name: "TermTV".to_string(),
                url_name: "termtv".to_string(),
                icon: "terminal.png".to_string(),
            },
            logging: LoggingConfig {
                path: None,
                max_payload_bytes: 4096,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAppConfig {
    storage: Option<PartialStorageConfig>,
    server: Option<PartialServerConfig>,
    viewer: Option<PartialViewerConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialStorageConfig {
    archive_subdir: Option<String>,
    max_recording_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialServerConfig {
    bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialViewerConfig {
    display_name: Option<String>,
    url_name: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
}

pub fn load_config(
    overrides: &CliOverrides,
    process_cwd: &Path,
    fs: &dyn FileSystem,
) -> Result<AppConfig, TermtvError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let path = absolutize_path(process_cwd, path);
        let raw = fs.read_bytes(&path)?;
        let file_contents =
            String::from_utf8(raw).map_err(|e| TermtvError::ConfigParse(e.to_string()))?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| TermtvError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    if let Some(path) = &cfg.logging.path {
        cfg.logging.path = Some(absolutize_path(process_cwd, path));
    }

    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(storage) = partial.storage {
        if let Some(value) = storage.archive_subdir {
            cfg.storage.archive_subdir = value;
        }
        if let Some(value) = storage.max_recording_bytes {
            cfg.storage.max_recording_bytes = Some(value);
        }
    }

    if let Some(server) = partial.server {
        if let Some(bind) = server.bind {
            cfg.server.bind = bind;
        }
    }

    if let Some(viewer) = partial.viewer {
        if let Some(value) = viewer.display_name {
            cfg.viewer.display_name = value;
        }
        if let Some(value) = viewer.url_name {
            cfg.viewer.url_name = value;
        }
        if let Some(value) = viewer.icon {
            cfg.viewer.icon = value;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(path) = logging.path {
            cfg.logging.path = Some(path);
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(bind) = &overrides.bind {
        cfg.server.bind = bind.clone();
    }
    if let Some(path) = &overrides.log_path {
        cfg.logging.path = Some(path.clone());
    }
    if let Some(limit) = overrides.max_recording_bytes {
        cfg.storage.max_recording_bytes = Some(limit);
    }
}

pub fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), TermtvError> {
    let subdir = RecordingName::parse(&cfg.storage.archive_subdir).map_err(|e| {
        TermtvError::InvalidConfig(format!("storage.archive_subdir is not usable: {e}"))
    })?;
    if subdir.as_str().contains('/') {
        return Err(TermtvError::InvalidConfig(
            "storage.archive_subdir must be a single directory name".to_string(),
        ));
    }

    if cfg.storage.max_recording_bytes == Some(0) {
        return Err(TermtvError::InvalidConfig(
            "storage.max_recording_bytes must be greater than zero when set".to_string(),
        ));
    }

    if cfg.server.bind.trim().is_empty() {
        return Err(TermtvError::InvalidConfig(
            "server.bind must not be empty".to_string(),
        ));
    }

    let url_name = cfg.viewer.url_name.trim();
    if url_name.is_empty() || url_name.contains('/') {
        return Err(TermtvError::InvalidConfig(
            "viewer.url_name must be a non-empty path segment".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_config, AppConfig, CliOverrides};
    use crate::runtime::FakeFileSystem;
    use std::path::{Path, PathBuf};

    fn overrides_for(path: &str) -> CliOverrides {
        CliOverrides {
            config_path: Some(PathBuf::from(path)),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn defaults_apply_without_config_file() {
        let fs = FakeFileSystem::default();
        let cfg = load_config(&CliOverrides::default(), Path::new("/"), &fs).expect("config");
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.storage.archive_subdir, "ttyrecordings");
        assert_eq!(cfg.viewer.url_name, "termtv");
    }

    #[test]
    fn partial_file_merges_over_defaults_and_cli_wins() {
        let fs = FakeFileSystem::with_file(
            "/etc/termtv.toml",
            br#"
[storage]
max_recording_bytes = 1024
[server]
bind = "0.0.0.0:9000"
[logging]
path = "logs/termtv.jsonl"
"#
            .to_vec(),
        );
        let mut overrides = overrides_for("/etc/termtv.toml");
        overrides.bind = Some("127.0.0.1:7000".to_string());

        let cfg = load_config(&overrides, Path::new("/srv"), &fs).expect("config");
        assert_eq!(cfg.storage.archive_subdir, "ttyrecordings");
        assert_eq!(cfg.storage.max_recording_bytes, Some(1024));
        assert_eq!(cfg.server.bind, "127.0.0.1:7000");
        assert_eq!(
            cfg.logging.path.as_deref(),
            Some(Path::new("/srv/logs/termtv.jsonl"))
        );
        assert_eq!(cfg.viewer.display_name, "TermTV");
    }

    #[test]
    fn rejects_archive_subdir_that_escapes_artifacts_dir() {
        let fs = FakeFileSystem::with_file(
            "/cfg.toml",
            b"[storage]\narchive_subdir = \"../outside\"\n".to_vec(),
        );
        let err = load_config(&overrides_for("/cfg.toml"), Path::new("/"), &fs)
            .expect_err("invalid subdir");
        assert!(err.to_string().contains("storage.archive_subdir"));
    }

    #[test]
    fn rejects_zero_size_cap_and_slashed_url_name() {
        let fs = FakeFileSystem::with_file(
            "/cap.toml",
            b"[storage]\nmax_recording_bytes = 0\n".to_vec(),
        );
        assert!(load_config(&overrides_for("/cap.toml"), Path::new("/"), &fs).is_err());

        let fs = FakeFileSystem::with_file("/url.toml", b"[viewer]\nurl_name = \"a/b\"\n".to_vec());
        assert!(load_config(&overrides_for("/url.toml"), Path::new("/"), &fs).is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let fs = FakeFileSystem::with_file("/bad.toml", b"[storage\n".to_vec());
        let err = load_config(&overrides_for("/bad.toml"), Path::new("/"), &fs)
            .expect_err("parse error");
        assert!(err.to_string().starts_with("config parse error"));
    }
}
