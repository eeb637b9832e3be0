//! Environment-variable overrides.
//!
//! Variables named `<prefix><SEGMENT><sep><SEGMENT>...` become dotted paths:
//! `CONFIG_DATABASE_PORT=6000` sets `database.port` to the integer `6000`.
//! The variable source is always passed in explicitly; use
//! [`collect_env_vars`] to snapshot the process environment.

use std::collections::HashMap;

use serde_json::{Number, Value};
use tracing::{debug, warn};

use crate::map::{Mapping, deep_set};

/// Default variable-name prefix.
pub const DEFAULT_PREFIX: &str = "CONFIG_";

/// Default separator between path segments in a variable name.
pub const DEFAULT_SEPARATOR: &str = "_";

const TRUE_WORDS: &[&str] = &["true", "yes", "1", "on", "enabled"];
const FALSE_WORDS: &[&str] = &["false", "no", "0", "off", "disabled"];

/// How variable names map to configuration paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverrides {
    prefix: String,
    separator: String,
}

impl Default for EnvOverrides {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvOverrides {
    /// Overrides for variables starting with `prefix`, split on `_`.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            separator: DEFAULT_SEPARATOR.to_owned(),
        }
    }

    /// Use a different segment separator (e.g. `__`). An empty separator
    /// maps every variable to a single top-level key.
    #[must_use]
    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_owned();
        self
    }

    /// The configured prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The configured separator.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Dotted path for a variable name, or `None` if the name does not carry
    /// the prefix or yields an empty path or segment.
    ///
    /// The prefix match ignores ASCII case.
    #[must_use]
    pub fn path_for(&self, name: &str) -> Option<String> {
        let head = name.get(..self.prefix.len())?;
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return None;
        }
        let rest = name.get(self.prefix.len()..)?.to_lowercase();
        if rest.is_empty() {
            return None;
        }
        if self.separator.is_empty() {
            return Some(rest);
        }

        let separator = self.separator.to_lowercase();
        let segments: Vec<&str> = rest.split(separator.as_str()).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(segments.join("."))
    }

    /// Build the override layer from a snapshot of variables.
    ///
    /// Names are visited in sorted order so the result does not depend on
    /// hash-map iteration. Malformed names are skipped; a name whose path
    /// collides with a value already placed by another variable (say
    /// `CONFIG_DB=x` and `CONFIG_DB_PORT=1`) is skipped with a warning.
    #[must_use]
    pub fn build<S: ::std::hash::BuildHasher>(
        &self,
        vars: &HashMap<String, String, S>,
    ) -> OverrideLayer {
        let mut names: Vec<&String> = vars.keys().collect();
        names.sort();

        let mut layer = OverrideLayer::default();
        for name in names {
            let Some(raw) = vars.get(name) else {
                continue;
            };
            let Some(path) = self.path_for(name) else {
                if name
                    .get(..self.prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(&self.prefix))
                {
                    debug!(var = %name, "skipping malformed override name");
                    layer.skipped.push(name.clone());
                }
                continue;
            };

            let value = coerce_value(raw);
            if let Err(e) = deep_set(&mut layer.values, &path, value) {
                warn!(var = %name, error = %e, "skipping conflicting override");
                layer.skipped.push(name.clone());
                continue;
            }

            debug!(var = %name, path = %path, "applying env override");
            layer.origins.insert(path, name.clone());
        }
        layer
    }
}

/// Values gathered from environment variables, ready to merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideLayer {
    /// Nested override values.
    pub values: Mapping,
    /// Dotted path → variable that set it.
    pub origins: HashMap<String, String>,
    /// Prefixed variables that were not applied.
    pub skipped: Vec<String>,
}

impl OverrideLayer {
    /// Number of variables applied.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.origins.len()
    }

    /// `true` if no variable was applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Variable that set `path` or one of its ancestors.
    #[must_use]
    pub fn origin_of(&self, path: &str) -> Option<&str> {
        let mut candidate = path;
        loop {
            if let Some(var) = self.origins.get(candidate) {
                return Some(var);
            }
            candidate = &candidate[..candidate.rfind('.')?];
        }
    }
}

/// Coerce a raw variable value to a typed scalar.
///
/// Attempts, first match wins:
///
/// 1. empty → empty string
/// 2. boolean words, case-insensitive (`true`/`yes`/`1`/`on`/`enabled`,
///    `false`/`no`/`0`/`off`/`disabled`)
/// 3. signed then unsigned 64-bit integer
/// 4. finite float
/// 5. the string unchanged
///
/// `"1"` and `"0"` therefore become booleans, never integers.
#[must_use]
pub fn coerce_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }

    let lower = raw.to_ascii_lowercase();
    if TRUE_WORDS.contains(&lower.as_str()) {
        return Value::Bool(true);
    }
    if FALSE_WORDS.contains(&lower.as_str()) {
        return Value::Bool(false);
    }

    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(u) = raw.parse::<u64>() {
        return Value::from(u);
    }
    if let Ok(f) = raw.parse::<f64>()
        && let Some(n) = Number::from_f64(f)
    {
        return Value::Number(n);
    }

    Value::String(raw.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
