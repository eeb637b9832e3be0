//! Rendering a resolved configuration for display.
//!
//! The annotated view prints one `key=value` line per leaf with a comment
//! naming the layer, variable or `set()` call that supplied it.

use std::fmt::Write as _;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::format::Format;
use crate::map::{Mapping, deep_get, flatten, join_path};
use crate::resolve::FieldSources;

/// A snapshot of the effective configuration with its provenance.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Mapping,
    /// Dotted leaf path → where the value came from.
    pub field_sources: FieldSources,
    /// Config file paths that were loaded, in load order.
    pub loaded_files: Vec<String>,
    /// Canonical name of the active environment.
    pub environment: String,
}

/// Output format for `show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML.
    Yaml,
    /// TOML.
    Toml,
    /// Sorted `key=value` lines.
    Flat,
}

impl FromStr for ShowFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" | "env" | "properties" => Ok(Self::Flat),
            other => other.parse::<Format>().map(|f| match f {
                Format::Yaml => Self::Yaml,
                Format::Json => Self::Json,
                Format::Toml => Self::Toml,
            }),
        }
    }
}

impl ResolvedConfig {
    /// Render the whole configuration, or only the value at `section`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if `section` is not set, or
    /// [`ConfigError::SerializeError`] if the format cannot express the tree.
    pub fn show(&self, format: ShowFormat, section: Option<&str>) -> ConfigResult<String> {
        let (prefix, selected) = self.select(section)?;
        match format {
            ShowFormat::Json => serde_json::to_string_pretty(&selected)
                .map(|s| s + "\n")
                .map_err(|e| serialize_error(Format::Json, &e)),
            ShowFormat::Yaml => {
                serde_yaml::to_string(&selected).map_err(|e| serialize_error(Format::Yaml, &e))
            },
            ShowFormat::Toml => match selected {
                Value::Object(map) => Format::Toml.serialize(&map),
                scalar => {
                    // TOML documents are tables; wrap a bare value under its key.
                    let key = prefix.rsplit('.').next().unwrap_or("value");
                    let mut wrapper = Mapping::new();
                    wrapper.insert(key.to_owned(), scalar);
                    Format::Toml.serialize(&wrapper)
                },
            },
            ShowFormat::Flat => Ok(self.flat_lines(prefix, &selected, false)),
        }
    }

    /// Flat `key=value` lines, each annotated with its source, under a
    /// header listing the environment and loaded files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if `section` is not set.
    pub fn show_annotated(&self, section: Option<&str>) -> ConfigResult<String> {
        let (prefix, selected) = self.select(section)?;

        let mut output = String::new();
        output.push_str("# Resolved configuration\n");
        let _ = writeln!(output, "# Environment: {}", self.environment);
        if !self.loaded_files.is_empty() {
            output.push_str("#\n# Loaded files (in load order):\n");
            for (i, path) in self.loaded_files.iter().enumerate() {
                let _ = writeln!(output, "#   {}. {path}", i.saturating_add(1));
            }
        }
        output.push('\n');
        output.push_str(&self.flat_lines(prefix, &selected, true));
        Ok(output)
    }

    fn select<'a>(&'a self, section: Option<&'a str>) -> ConfigResult<(&'a str, Value)> {
        match section {
            None => Ok(("", Value::Object(self.config.clone()))),
            Some(key) => deep_get(&self.config, key)
                .map(|v| (key, v.clone()))
                .ok_or_else(|| ConfigError::MissingKey {
                    key: key.to_owned(),
                }),
        }
    }

    fn flat_lines(&self, prefix: &str, selected: &Value, annotate: bool) -> String {
        let mut pairs = match selected {
            Value::Object(map) if !map.is_empty() => flatten(map)
                .into_iter()
                .map(|(k, v)| (join_path(prefix, &k), v))
                .collect(),
            Value::Object(_) if prefix.is_empty() => Vec::new(),
            other => vec![(prefix.to_owned(), other.clone())],
        };
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut output = String::new();
        for (key, value) in pairs {
            let _ = write!(output, "{key}={}", render_scalar(&value));
            if annotate && let Some(source) = self.field_sources.get(&key) {
                let _ = write!(output, "  # [{source}]");
            }
            output.push('\n');
        }
        output
    }
}

/// Strings print raw; everything else prints as JSON.
#[must_use]
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn serialize_error(format: Format, err: &dyn std::fmt::Display) -> ConfigError {
    ConfigError::SerializeError {
        format: format.name().to_owned(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::resolve::ValueSource;

    fn sample() -> ResolvedConfig {
        let config = match json!({
            "server": {"port": 8080, "host": "0.0.0.0"},
            "name": "svc",
            "tags": ["a", "b"]
        }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let mut field_sources = FieldSources::new();
        field_sources.insert(
            "server.port".to_owned(),
            ValueSource::EnvVar {
                name: "CONFIG_SERVER_PORT".to_owned(),
            },
        );
        field_sources.insert(
            "name".to_owned(),
            ValueSource::Layer {
                source: "app.yaml".to_owned(),
                environment: None,
            },
        );
        ResolvedConfig {
            config,
            field_sources,
            loaded_files: vec!["app.yaml".to_owned()],
            environment: "production".to_owned(),
        }
    }

    #[test]
    fn test_show_flat_sorted() {
        let output = sample().show(ShowFormat::Flat, None).unwrap();
        assert_eq!(
            output,
            "name=svc\nserver.host=0.0.0.0\nserver.port=8080\ntags=[\"a\",\"b\"]\n"
        );
    }

    #[test]
    fn test_show_json_round_trips() {
        let output = sample().show(ShowFormat::Json, None).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["server"]["port"], json!(8080));
    }

    #[test]
    fn test_show_section() {
        let resolved = sample();
        let output = resolved.show(ShowFormat::Flat, Some("server")).unwrap();
        assert_eq!(output, "server.host=0.0.0.0\nserver.port=8080\n");

        let toml = resolved.show(ShowFormat::Toml, Some("server.port")).unwrap();
        assert_eq!(toml.trim(), "port = 8080");

        assert!(matches!(
            resolved.show(ShowFormat::Yaml, Some("missing")),
            Err(ConfigError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_show_annotated() {
        let output = sample().show_annotated(None).unwrap();
        assert!(output.contains("# Environment: production"));
        assert!(output.contains("#   1. app.yaml"));
        assert!(output.contains("server.port=8080  # [env CONFIG_SERVER_PORT]"));
        assert!(output.contains("name=svc  # [app.yaml]"));
        assert!(output.contains("server.host=0.0.0.0\n"));
    }

    #[test]
    fn test_show_format_parse() {
        assert_eq!("flat".parse::<ShowFormat>().unwrap(), ShowFormat::Flat);
        assert_eq!("YML".parse::<ShowFormat>().unwrap(), ShowFormat::Yaml);
        assert!("xml".parse::<ShowFormat>().is_err());
    }
}
