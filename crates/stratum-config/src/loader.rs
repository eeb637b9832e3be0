//! Reading configuration files and discovering them in directories.

use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ConfigError, ConfigResult};
use crate::format::Format;

/// Maximum config file size (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Read and parse a configuration file, picking the format from its
/// extension.
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedFormat`] for an unknown extension,
/// [`ConfigError::ReadError`] if the file cannot be read,
/// [`ConfigError::FileTooLarge`] past [`MAX_CONFIG_FILE_SIZE`], or
/// [`ConfigError::ParseError`] if the content is malformed.
pub fn read_file(path: &Path) -> ConfigResult<Value> {
    let format = Format::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Check size after reading to avoid TOCTOU between stat and read.
    let size = content.len() as u64;
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::FileTooLarge {
            path: path.display().to_string(),
            size,
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }

    format.parse(&content, &path.display().to_string())
}

/// Like [`read_file`], but a missing file yields `Ok(None)`.
///
/// # Errors
///
/// Same as [`read_file`] for everything except `NotFound`.
pub fn try_read_file(path: &Path) -> ConfigResult<Option<Value>> {
    match read_file(path) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::ReadError { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

/// Configuration files under `dir`, sorted by path.
///
/// Only files with a recognized extension are returned, and when `pattern`
/// is given only those whose file name matches it (`app*`, `*.yaml`).
/// Hidden entries (names starting with `.`) are skipped. Without
/// `recursive`, only the top level of `dir` is searched.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPattern`] for a malformed glob, or
/// [`ConfigError::ReadError`] if `dir` is not a readable directory.
pub fn discover(dir: &Path, recursive: bool, pattern: Option<&str>) -> ConfigResult<Vec<PathBuf>> {
    let matcher = pattern.map(file_name_matcher).transpose()?;
    let read_error = |source: io::Error| ConfigError::ReadError {
        path: dir.display().to_string(),
        source,
    };

    let metadata = std::fs::metadata(dir).map_err(read_error)?;
    if !metadata.is_dir() {
        return Err(read_error(io::Error::new(
            io::ErrorKind::NotADirectory,
            "not a directory",
        )));
    }

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .max_depth(if recursive { usize::MAX } else { 1 });

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_entry(|e| {
        // Skip hidden entries (but not the root entry)
        e.depth() == 0 || e.file_name().to_str().is_none_or(|s| !s.starts_with('.'))
    }) {
        let entry = entry.map_err(|e| read_error(io::Error::from(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Format::from_extension)
            .is_some();
        if !supported {
            debug!(path = %entry.path().display(), "skipping unsupported file");
            continue;
        }
        if let Some(matcher) = &matcher
            && !matcher.is_match(entry.file_name())
        {
            debug!(path = %entry.path().display(), "skipping file not matching pattern");
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort();
    Ok(files)
}

fn file_name_matcher(pattern: &str) -> ConfigResult<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_owned(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_read_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.yml");
        fs::write(&path, "name: demo\nworkers: 4\n").unwrap();
        assert_eq!(read_file(&path).unwrap(), json!({"name": "demo", "workers": 4}));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(read_file(&path), Err(ConfigError::ReadError { .. })));
        assert!(try_read_file(&path).unwrap().is_none());
    }

    #[test]
    fn test_read_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.ini");
        fs::write(&path, "[x]\n").unwrap();
        assert!(matches!(
            read_file(&path),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_read_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.json");
        let padding = " ".repeat(usize::try_from(MAX_CONFIG_FILE_SIZE).unwrap());
        fs::write(&path, format!("{{}}{padding}")).unwrap();
        assert!(matches!(
            read_file(&path),
            Err(ConfigError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.yaml"), "b: 1").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join(".hidden.toml"), "x = 1").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.toml"), "c = 1").unwrap();

        let names = |paths: Vec<PathBuf>| -> Vec<String> {
            paths
                .iter()
                .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
                .collect()
        };

        assert_eq!(names(discover(dir.path(), false, None).unwrap()), vec!["a.json", "b.yaml"]);

        let recursive = names(discover(dir.path(), true, None).unwrap());
        assert_eq!(recursive.len(), 3);
        assert!(recursive.iter().any(|p| p.ends_with("c.toml")));
    }

    #[test]
    fn test_discover_filters_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.yaml"), "a: 1").unwrap();
        fs::write(dir.path().join("app.local.toml"), "a = 2").unwrap();
        fs::write(dir.path().join("db.yaml"), "b: 1").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("app.json"), "{}").unwrap();

        let file_names = |paths: Vec<PathBuf>| -> Vec<String> {
            paths
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        };

        assert_eq!(
            file_names(discover(dir.path(), false, Some("app*")).unwrap()),
            vec!["app.local.toml", "app.yaml"]
        );
        assert_eq!(
            file_names(discover(dir.path(), true, Some("*.yaml")).unwrap()),
            vec!["app.yaml", "db.yaml"]
        );
        assert_eq!(
            file_names(discover(dir.path(), true, Some("app.*")).unwrap()).len(),
            3
        );
        assert!(matches!(
            discover(dir.path(), false, Some("[unclosed")),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_discover_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.yaml");
        fs::write(&path, "a: 1").unwrap();
        assert!(matches!(
            discover(&path, false, None),
            Err(ConfigError::ReadError { .. })
        ));
    }
}
