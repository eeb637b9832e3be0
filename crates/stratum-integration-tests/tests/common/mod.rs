//! Shared fixtures for integration tests.

use std::collections::HashMap;
use std::path::PathBuf;

use tempfile::TempDir;

/// A temporary directory of config files.
///
/// The directory is removed when the fixture is dropped.
#[allow(dead_code)]
pub struct ConfigDir {
    dir: TempDir,
}

#[allow(dead_code)]
impl ConfigDir {
    /// Create an empty fixture directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create tempdir"),
        }
    }

    /// Write `contents` to `name` (creating parent directories) and return
    /// the full path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(&path, contents).expect("failed to write config file");
        path
    }

    /// Full path of `name` inside the fixture.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// The fixture root.
    pub fn root(&self) -> &std::path::Path {
        self.dir.path()
    }
}

/// Build an injected environment from `(name, value)` pairs.
#[allow(dead_code)]
pub fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
