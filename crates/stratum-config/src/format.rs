//! YAML, JSON and TOML readers and writers.
//!
//! Every format parses into the same [`serde_json::Value`] tree, so the rest
//! of the crate never sees format-specific types.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::map::Mapping;

/// A supported configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// YAML (`.yaml`, `.yml`).
    Yaml,
    /// JSON (`.json`).
    Json,
    /// TOML (`.toml`).
    Toml,
}

impl Format {
    /// Every format, in detection order.
    pub const ALL: [Self; 3] = [Self::Yaml, Self::Json, Self::Toml];

    /// Lower-case format name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }

    /// File extensions recognized for this format, without the dot.
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Yaml => &["yaml", "yml"],
            Self::Json => &["json"],
            Self::Toml => &["toml"],
        }
    }

    /// Format for a file extension (case-insensitive, no leading dot).
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&extension.as_str()))
    }

    /// Format implied by a path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] if the extension is missing
    /// or not recognized.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(extension).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.display().to_string(),
            extension: extension.to_owned(),
        })
    }

    /// Parse `text` into a value tree. `origin` labels error messages.
    ///
    /// An empty or null document parses as an empty mapping. Other
    /// top-level shapes are returned as-is for the caller to reject.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] if the text is malformed.
    pub fn parse(self, text: &str, origin: &str) -> ConfigResult<Value> {
        if text.trim().is_empty() {
            return Ok(Value::Object(Mapping::new()));
        }

        let parsed = match self {
            Self::Yaml => serde_yaml::from_str::<Value>(text).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str::<Value>(text).map_err(|e| e.to_string()),
            Self::Toml => text
                .parse::<toml::Table>()
                .map(|table| toml_to_json(toml::Value::Table(table)))
                .map_err(|e| e.message().to_owned()),
        };

        match parsed {
            Ok(Value::Null) => Ok(Value::Object(Mapping::new())),
            Ok(value) => Ok(value),
            Err(message) => Err(ConfigError::ParseError {
                path: origin.to_owned(),
                format: self.name().to_owned(),
                message,
            }),
        }
    }

    /// Render a mapping as text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializeError`] if the tree cannot be
    /// expressed in this format (TOML has no null, for example).
    pub fn serialize(self, map: &Mapping) -> ConfigResult<String> {
        let rendered = match self {
            Self::Yaml => serde_yaml::to_string(map).map_err(|e| e.to_string()),
            Self::Json => serde_json::to_string_pretty(map)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| e.to_string()),
            Self::Toml => toml::to_string_pretty(map).map_err(|e| e.to_string()),
        };
        rendered.map_err(|message| ConfigError::SerializeError {
            format: self.name().to_owned(),
            message,
        })
    }
}

/// TOML datetimes become strings; non-finite floats become null.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim().trim_start_matches('.')).ok_or_else(|| {
            ConfigError::UnsupportedFormat {
                path: "<format>".to_owned(),
                extension: s.to_owned(),
            }
        })
    }
}
