use crate::errors::TermtvError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Relative path of a recording inside its workspace and archive directory.
///
/// Construction rejects anything that could resolve outside the containing
/// directory, so `root.join(name)` always stays below `root`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordingName(String);

impl RecordingName {
    pub fn parse(value: &str) -> Result<Self, TermtvError> {
        if value.trim().is_empty() {
            return Err(TermtvError::InvalidName("name must not be empty".to_string()));
        }
        if value.contains('\0') {
            return Err(TermtvError::InvalidName(format!(
                "{value:?} contains a NUL byte"
            )));
        }
        if value.contains('\\') {
            return Err(TermtvError::InvalidName(format!(
                "{value:?} contains a backslash"
            )));
        }
        for component in Path::new(value).components() {
            match component {
                Component::Normal(_) => {}
                Component::CurDir | Component::ParentDir => {
                    return Err(TermtvError::InvalidName(format!(
                        "{value:?} contains a relative directory segment"
                    )));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(TermtvError::InvalidName(format!(
                        "{value:?} must be a relative path"
                    )));
                }
            }
        }
        if value.ends_with('/') {
            return Err(TermtvError::InvalidName(format!(
                "{value:?} must name a file"
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn under(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for RecordingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordingName {
    type Error = TermtvError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RecordingName> for String {
    fn from(value: RecordingName) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub build_id: String,
    pub workspace_dir: PathBuf,
    pub artifacts_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingSource {
    Archive,
    Live,
}

impl RecordingSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Live => "live",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Missing,
    Live,
    Archived,
}

impl RecordingState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Live => "live",
            Self::Archived => "archived",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RecordingName;
    use std::path::Path;

    #[test]
    fn accepts_plain_and_nested_relative_names() {
        assert_eq!(RecordingName::parse("session1").expect("plain").as_str(), "session1");
        assert_eq!(
            RecordingName::parse("logs/session1.ttyrec")
                .expect("nested")
                .under(Path::new("/ws")),
            Path::new("/ws/logs/session1.ttyrec")
        );
    }

    #[test]
    fn rejects_names_that_escape_the_root() {
        for bad in [
            "",
            "   ",
            "../secret",
            "logs/../../etc/passwd",
            "/etc/passwd",
            "./session",
            "logs/",
            "a\\..\\b",
            "nul\0byte",
        ] {
            assert!(RecordingName::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn deserialization_goes_through_validation() {
        let ok: RecordingName = serde_json::from_str("\"session1\"").expect("valid");
        assert_eq!(ok.as_str(), "session1");
        assert!(serde_json::from_str::<RecordingName>("\"../x\"").is_err());
    }
}
