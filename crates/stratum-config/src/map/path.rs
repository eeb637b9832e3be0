use serde_json::Value;

use super::Mapping;
use crate::error::{ConfigError, ConfigResult};

/// Separator between segments of a key path.
pub const PATH_SEPARATOR: char = '.';

/// Split a dotted path into its segments.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPath`] if the path is empty or contains an
/// empty segment (`a..b`, `.a`, `a.`).
pub fn split_path(path: &str) -> ConfigResult<Vec<&str>> {
    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::InvalidPath {
            path: path.to_owned(),
        });
    }
    Ok(segments)
}

/// Join a prefix and a key into a dotted path. An empty prefix yields `key`.
#[must_use]
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{key}")
    }
}

/// Look up a value by dotted path.
///
/// Returns `None` when any segment is missing or when a non-mapping value
/// would have to be indexed further. Malformed paths are simply absent.
#[must_use]
pub fn deep_get<'a>(map: &'a Mapping, path: &str) -> Option<&'a Value> {
    let segments = split_path(path).ok()?;
    let (first, rest) = segments.split_first()?;
    let mut current = map.get(*first)?;
    for segment in rest {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

/// Look up a value by dotted path, falling back to `default` when absent.
///
/// A present `null` is returned as-is; only a missing path yields `default`.
#[must_use]
pub fn deep_get_or<'a>(map: &'a Mapping, path: &str, default: &'a Value) -> &'a Value {
    deep_get(map, path).unwrap_or(default)
}

/// Write a value at a dotted path, creating intermediate mappings as needed.
///
/// An existing leaf at the final segment is overwritten.
///
/// # Errors
///
/// Returns [`ConfigError::ConflictError`] if an intermediate segment already
/// holds a non-mapping value, or [`ConfigError::InvalidPath`] for a malformed
/// path. The map is left untouched on error.
pub fn deep_set(map: &mut Mapping, path: &str, value: Value) -> ConfigResult<()> {
    let segments = split_path(path)?;
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(ConfigError::InvalidPath {
            path: path.to_owned(),
        });
    };

    // Mappings are only created where a segment is absent, so once one is
    // created every deeper segment is new and no conflict can follow.
    let mut current = map;
    for (depth, segment) in parents.iter().enumerate() {
        let entry = current
            .entry((*segment).to_owned())
            .or_insert_with(|| Value::Object(Mapping::new()));
        match entry {
            Value::Object(next) => current = next,
            _ => {
                return Err(ConfigError::ConflictError {
                    path: path.to_owned(),
                    segment: parents[..=depth].join("."),
                });
            },
        }
    }
    current.insert((*leaf).to_owned(), value);
    Ok(())
}

/// Remove the value at a dotted path, returning it if it was present.
pub fn deep_remove(map: &mut Mapping, path: &str) -> Option<Value> {
    let segments = split_path(path).ok()?;
    let (leaf, parents) = segments.split_last()?;
    let mut current = map;
    for segment in parents {
        current = current.get_mut(*segment)?.as_object_mut()?;
    }
    current.shift_remove(*leaf)
}
