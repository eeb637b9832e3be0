//! Ordered store of loaded configuration layers.
//!
//! Each load splits its document into a base section and zero or more
//! environment sections. All sections from one load share a `load_order`.
//! Layers are never modified once stored; only [`LayerStore::reset`] removes
//! them.

use serde_json::Value;
use tracing::debug;

use crate::environment::Environments;
use crate::error::{ConfigError, ConfigResult};
use crate::map::Mapping;

/// Which part of a loaded document a layer holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// Top-level data that applies in every environment.
    Base,
    /// A block keyed by an environment name or alias, stored under the
    /// canonical environment name.
    Environment(String),
}

/// One section of one loaded source.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    source: String,
    load_order: u64,
    section: Section,
    data: Mapping,
}

impl Layer {
    /// Origin identifier (file path, `"dict"`, ...).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Position of the load that produced this layer.
    #[must_use]
    pub fn load_order(&self) -> u64 {
        self.load_order
    }

    /// Base or environment section.
    #[must_use]
    pub fn section(&self) -> &Section {
        &self.section
    }

    /// Canonical environment name for environment sections.
    #[must_use]
    pub fn environment(&self) -> Option<&str> {
        match &self.section {
            Section::Base => None,
            Section::Environment(name) => Some(name),
        }
    }

    /// `true` if the mapping came from an environment block.
    #[must_use]
    pub fn is_environment_section(&self) -> bool {
        matches!(self.section, Section::Environment(_))
    }

    /// The layer's data.
    #[must_use]
    pub fn data(&self) -> &Mapping {
        &self.data
    }
}

/// Loaded layers in load order.
#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    layers: Vec<Layer>,
    next_order: u64,
}

impl LayerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a parsed document into sections and append them.
    ///
    /// Any top-level key that `environments` recognizes (canonical name or
    /// alias) and holds a mapping becomes an environment section; everything
    /// else, including an environment-named key holding a scalar, is base
    /// data. Returns the `load_order` assigned to the new layers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FormatError`] if the document is not a mapping.
    /// Nothing is stored on error.
    pub fn add_layer(
        &mut self,
        parsed: Value,
        source: &str,
        environments: &Environments,
    ) -> ConfigResult<u64> {
        let document = match parsed {
            Value::Object(document) => document,
            other => {
                return Err(ConfigError::FormatError {
                    origin: source.to_owned(),
                    message: format!("top level must be a mapping, found {}", kind_of(&other)),
                });
            },
        };

        let mut base = Mapping::new();
        let mut sections: Vec<(String, Mapping)> = Vec::new();
        for (key, value) in document {
            match (environments.resolve(&key), value) {
                (Some(environment), Value::Object(block)) => {
                    sections.push((environment.to_owned(), block));
                },
                (Some(_), value) => {
                    // `local: false`, `ci: true` and the like are plain data.
                    debug!(
                        source,
                        key = %key,
                        kind = kind_of(&value),
                        "environment-named key is not a mapping, keeping as base data"
                    );
                    base.insert(key, value);
                },
                (None, value) => {
                    base.insert(key, value);
                },
            }
        }

        let load_order = self.next_order;
        self.next_order = self.next_order.saturating_add(1);

        debug!(
            source,
            load_order,
            environment_sections = sections.len(),
            "added configuration layer"
        );

        self.layers.push(Layer {
            source: source.to_owned(),
            load_order,
            section: Section::Base,
            data: base,
        });
        for (environment, data) in sections {
            self.layers.push(Layer {
                source: source.to_owned(),
                load_order,
                section: Section::Environment(environment),
                data,
            });
        }

        Ok(load_order)
    }

    /// Drop every layer. Load order numbering restarts at zero.
    pub fn reset(&mut self) {
        self.layers.clear();
        self.next_order = 0;
    }

    /// All layers in load order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Base sections in load order.
    pub fn base_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.section == Section::Base)
    }

    /// Sections for the given canonical environment, in load order.
    pub fn environment_layers<'a>(&'a self, environment: &'a str) -> impl Iterator<Item = &'a Layer> {
        self.layers
            .iter()
            .filter(move |l| l.environment() == Some(environment))
    }

    /// Number of stored layers (sections, not loads).
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// `true` if nothing has been loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Human-readable name of a value's type, for diagnostics.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
