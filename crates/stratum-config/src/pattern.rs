//! Glob patterns over dotted key paths.
//!
//! `*` matches within one segment, `**` spans any number of segments:
//! `database.*` matches `database.host` but not `database.pool.size`;
//! `database.**` matches both.

use globset::{GlobBuilder, GlobMatcher};

use crate::error::{ConfigError, ConfigResult};
use crate::map::{Mapping, leaf_paths};

const WILDCARD_CHARS: &[char] = &['*', '?', '[', '{'];

/// A compiled key pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    raw: String,
    matcher: Option<GlobMatcher>,
}

impl KeyPattern {
    /// Compile a pattern. Plain dotted paths are kept as exact keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if the glob does not compile.
    pub fn new(pattern: &str) -> ConfigResult<Self> {
        if !pattern.contains(WILDCARD_CHARS) {
            return Ok(Self {
                raw: pattern.to_owned(),
                matcher: None,
            });
        }

        // Segments are '/'-separated inside globset.
        let glob = GlobBuilder::new(&pattern.replace('.', "/"))
            .literal_separator(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_owned(),
                message: e.kind().to_string(),
            })?;

        Ok(Self {
            raw: pattern.to_owned(),
            matcher: Some(glob.compile_matcher()),
        })
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `true` if the pattern contains glob syntax.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.matcher.is_some()
    }

    /// Test a dotted path against the pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.is_match(path.replace('.', "/")),
            None => self.raw == path,
        }
    }

    /// Leaf paths of `map` that match, in document order.
    ///
    /// A plain key is returned as-is whether or not it exists, so callers can
    /// report it missing. A wildcard only yields paths that are present.
    #[must_use]
    pub fn expand(&self, map: &Mapping) -> Vec<String> {
        if !self.is_wildcard() {
            return vec![self.raw.clone()];
        }
        leaf_paths(map)
            .into_iter()
            .filter(|path| self.matches(path))
            .collect()
    }
}

impl PartialEq for KeyPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl std::fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
