use serde_json::Value;

use super::Mapping;
use super::path::{deep_set, join_path};
use crate::error::ConfigResult;

/// Flatten a nested mapping into `(dotted path, leaf)` pairs in document order.
///
/// Sequences are opaque leaves. Empty mappings are kept as leaves too, so
/// [`unflatten`] reproduces them.
#[must_use]
pub fn flatten(map: &Mapping) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(map, "", &mut out);
    out
}

fn flatten_into(map: &Mapping, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            Value::Object(child) if !child.is_empty() => flatten_into(child, &path, out),
            leaf => out.push((path, leaf.clone())),
        }
    }
}

/// Dotted paths of every leaf, in document order. Same traversal as
/// [`flatten`] without cloning values.
#[must_use]
pub fn leaf_paths(map: &Mapping) -> Vec<String> {
    let mut out = Vec::new();
    collect_paths(map, "", &mut out);
    out
}

fn collect_paths(map: &Mapping, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            Value::Object(child) if !child.is_empty() => collect_paths(child, &path, out),
            _ => out.push(path),
        }
    }
}

/// Rebuild a nested mapping from `(dotted path, value)` pairs.
///
/// # Errors
///
/// Returns [`ConfigError::ConflictError`](crate::ConfigError::ConflictError)
/// if one pair's path runs through another pair's scalar leaf (e.g. `a = 1`
/// followed by `a.b = 2`).
pub fn unflatten<I, K>(pairs: I) -> ConfigResult<Mapping>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut map = Mapping::new();
    for (path, value) in pairs {
        deep_set(&mut map, path.as_ref(), value)?;
    }
    Ok(map)
}
