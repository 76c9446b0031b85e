use crate::errors::TermtvError;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait FileSystem: Send + Sync {
    fn is_file(&self, path: &Path) -> bool;
    fn exists(&self, path: &Path) -> bool;
    fn len(&self, path: &Path) -> Result<u64, TermtvError>;
    /// Reads at most `len` bytes from the start of the file.
    fn read_prefix(&self, path: &Path, len: u64) -> Result<Vec<u8>, TermtvError>;
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, TermtvError>;
    /// Creates the file or truncates it before writing.
    fn write_bytes(&self, path: &Path, contents: &[u8]) -> Result<(), TermtvError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), TermtvError>;
}

pub trait Terminal: Send + Sync {
    fn write_line(&self, line: &str) -> Result<(), TermtvError>;
    fn write_bytes(&self, bytes: &[u8]) -> Result<(), TermtvError>;
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn len(&self, path: &Path) -> Result<u64, TermtvError> {
        std::fs::metadata(path)
            .map(|meta| meta.len())
            .map_err(|e| TermtvError::Io(e.to_string()))
    }

    fn read_prefix(&self, path: &Path, len: u64) -> Result<Vec<u8>, TermtvError> {
        let file = std::fs::File::open(path).map_err(|e| TermtvError::Io(e.to_string()))?;
        let mut bytes = Vec::with_capacity(usize::try_from(len).unwrap_or_default());
        file.take(len)
            .read_to_end(&mut bytes)
            .map_err(|e| TermtvError::Io(e.to_string()))?;
        Ok(bytes)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, TermtvError> {
        std::fs::read(path).map_err(|e| TermtvError::Io(e.to_string()))
    }

    fn write_bytes(&self, path: &Path, contents: &[u8]) -> Result<(), TermtvError> {
        std::fs::write(path, contents).map_err(|e| TermtvError::Io(e.to_string()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), TermtvError> {
        std::fs::create_dir_all(path).map_err(|e| TermtvError::Io(e.to_string()))
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn write_line(&self, line: &str) -> Result<(), TermtvError> {
        let mut out = std::io::stdout();
        writeln!(out, "{line}").map_err(|e| TermtvError::Io(e.to_string()))
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<(), TermtvError> {
        let mut out = std::io::stdout().lock();
        out.write_all(bytes)
            .and_then(|()| out.flush())
            .map_err(|e| TermtvError::Io(e.to_string()))
    }
}

pub struct ProductionRuntime {
    pub file_system: Arc<dyn FileSystem>,
    pub terminal: Arc<dyn Terminal>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            file_system: Arc::new(ProductionFileSystem),
            terminal: Arc::new(ProductionTerminal),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    dirs: Arc<Mutex<Vec<PathBuf>>>,
    fail_next: Arc<Mutex<Option<TermtvError>>>,
    fail_paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        let fs = Self::default();
        fs.files
            .lock()
            .expect("files lock")
            .insert(path.into(), contents.into());
        fs
    }

    pub fn set_fail_next(&self, error: TermtvError) {
        *self.fail_next.lock().expect("fail lock") = Some(error);
    }

    /// Every fallible operation touching `path` fails until the fake is dropped.
    pub fn fail_on_path(&self, path: impl Into<PathBuf>) {
        self.fail_paths.lock().expect("fail paths lock").push(path.into());
    }

    pub fn file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().expect("files lock").get(path).cloned()
    }

    /// Drops a file, standing in for an external cleanup of the workspace.
    pub fn remove_file(&self, path: &Path) {
        self.files.lock().expect("files lock").remove(path);
    }

    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().expect("dirs lock").clone()
    }

    fn maybe_fail(&self, path: &Path) -> Result<(), TermtvError> {
        if let Some(err) = self.fail_next.lock().expect("fail lock").take() {
            return Err(err);
        }
        if self
            .fail_paths
            .lock()
            .expect("fail paths lock")
            .iter()
            .any(|failing| failing == path)
        {
            return Err(TermtvError::Io(format!("injected failure for {}", path.display())));
        }
        Ok(())
    }

    fn missing(path: &Path) -> TermtvError {
        TermtvError::Io(format!("missing file {}", path.display()))
    }
}

impl FileSystem for FakeFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().expect("files lock").contains_key(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.dirs.lock().expect("dirs lock").iter().any(|dir| dir == path)
    }

    fn len(&self, path: &Path) -> Result<u64, TermtvError> {
        self.maybe_fail(path)?;
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .map(|bytes| bytes.len() as u64)
            .ok_or_else(|| Self::missing(path))
    }

    fn read_prefix(&self, path: &Path, len: u64) -> Result<Vec<u8>, TermtvError> {
        self.maybe_fail(path)?;
        let files = self.files.lock().expect("files lock");
        let bytes = files.get(path).ok_or_else(|| Self::missing(path))?;
        let end = usize::try_from(len).unwrap_or(usize::MAX).min(bytes.len());
        Ok(bytes[..end].to_vec())
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, TermtvError> {
        self.maybe_fail(path)?;
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .cloned()
            .ok_or_else(|| Self::missing(path))
    }

    fn write_bytes(&self, path: &Path, contents: &[u8]) -> Result<(), TermtvError> {
        self.maybe_fail(path)?;
        self.files
            .lock()
            .expect("files lock")
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), TermtvError> {
        self.maybe_fail(path)?;
        self.dirs.lock().expect("dirs lock").push(path.to_path_buf());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct FakeTerminal {
    lines: Arc<Mutex<Vec<String>>>,
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl FakeTerminal {
    pub fn written_lines(&self) -> Vec<String> {
        self.lines.lock().expect("lines lock").clone()
    }

    pub fn written_bytes(&self) -> Vec<u8> {
        self.bytes.lock().expect("bytes lock").clone()
    }
}

impl Terminal for FakeTerminal {
    fn write_line(&self, line: &str) -> Result<(), TermtvError> {
        self.lines.lock().expect("lines lock").push(line.to_string());
        Ok(())
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<(), TermtvError> {
        self.bytes.lock().expect("bytes lock").extend_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FakeFileSystem, FileSystem, ProductionFileSystem};
    use crate::errors::TermtvError;
    use std::path::Path;

    #[test]
    fn production_read_prefix_stops_at_requested_length() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session");
        std::fs::write(&path, b"ABCDEF").expect("seed");

        let bytes = ProductionFileSystem.read_prefix(&path, 3).expect("read");
        assert_eq!(bytes, b"ABC");
    }

    #[test]
    fn production_read_prefix_returns_short_content_when_file_is_smaller() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session");
        std::fs::write(&path, b"AB").expect("seed");

        let bytes = ProductionFileSystem.read_prefix(&path, 10).expect("read");
        assert_eq!(bytes, b"AB");
    }

    #[test]
    fn fake_fail_next_only_fails_once() {
        let fs = FakeFileSystem::with_file("/ws/a", b"x".to_vec());
        fs.set_fail_next(TermtvError::Io("boom".to_string()));

        assert!(fs.read_bytes(Path::new("/ws/a")).is_err());
        assert_eq!(fs.read_bytes(Path::new("/ws/a")).expect("read"), b"x");
    }

    #[test]
    fn fake_path_failures_leave_other_paths_alone() {
        let fs = FakeFileSystem::default();
        fs.fail_on_path("/art/bad");

        assert!(fs.write_bytes(Path::new("/art/bad"), b"x").is_err());
        fs.write_bytes(Path::new("/art/good"), b"y").expect("write");
        assert!(fs.is_file(Path::new("/art/good")));
        assert!(!fs.is_file(Path::new("/art/bad")));
    }
}
