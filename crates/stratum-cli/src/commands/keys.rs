//! `stratum keys`: list leaf key paths.

use anyhow::Result;
use stratum_config::map::{deep_get, leaf_paths};
use stratum_config::show::render_scalar;
use stratum_config::{KeyPattern, Mapping};

use super::{SourceArgs, load_config};

/// Print every leaf path, sorted, optionally filtered by a glob and
/// followed by its value. With `raw`, keys come from the loaded documents,
/// environment sections included.
pub(crate) fn run_keys(
    sources: &SourceArgs,
    pattern: Option<&str>,
    values: bool,
    raw: bool,
) -> Result<()> {
    let config = load_config(&sources.files, &sources.overrides)?;
    let pattern = pattern.map(KeyPattern::new).transpose()?;
    let map = if raw {
        config.raw()
    } else {
        config.as_mapping().clone()
    };

    for line in key_lines(&map, pattern.as_ref(), values) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn key_lines(map: &Mapping, pattern: Option<&KeyPattern>, values: bool) -> Vec<String> {
    let mut keys: Vec<String> = leaf_paths(map)
        .into_iter()
        .filter(|k| pattern.is_none_or(|p| p.matches(k)))
        .collect();
    keys.sort();

    keys.into_iter()
        .map(|key| match deep_get(map, &key) {
            Some(value) if values => format!("{key}={}", render_scalar(value)),
            _ => key,
        })
        .collect()
}
