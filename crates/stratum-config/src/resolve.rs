//! Folding layers into one effective mapping, with provenance.
//!
//! Precedence, lowest to highest:
//!
//! 1. Base sections, in load order (later loads win).
//! 2. Sections for the active environment, in load order. These outrank
//!    every base section regardless of when they were loaded.
//! 3. Environment-variable overrides.
//! 4. Direct `set()` overrides.
//!
//! Steps 3 and 4 are applied by the [`Config`](crate::Config) facade on top of
//! the [`Resolution`] returned by [`resolve`].

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::layer::{Layer, LayerStore};
use crate::map::{Mapping, join_path};

/// Where the effective value of a leaf came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// A loaded layer.
    Layer {
        /// Origin identifier of the load.
        source: String,
        /// Canonical environment for environment sections.
        environment: Option<String>,
    },
    /// An environment-variable override.
    EnvVar {
        /// Name of the variable that supplied the value.
        name: String,
    },
    /// A direct `set()` call.
    Override,
}

impl ValueSource {
    fn for_layer(layer: &Layer) -> Self {
        Self::Layer {
            source: layer.source().to_owned(),
            environment: layer.environment().map(ToOwned::to_owned),
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layer {
                source,
                environment: None,
            } => write!(f, "{source}"),
            Self::Layer {
                source,
                environment: Some(env),
            } => write!(f, "{source} ({env})"),
            Self::EnvVar { name } => write!(f, "env {name}"),
            Self::Override => write!(f, "set"),
        }
    }
}

/// Dotted leaf path → which source set its value.
pub type FieldSources = HashMap<String, ValueSource>;

/// A merged mapping plus per-leaf provenance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// The merged configuration.
    pub config: Mapping,
    /// Dotted leaf path → source of the winning value.
    pub sources: FieldSources,
}

impl Resolution {
    /// Fold another mapping on top, attributing each leaf it sets with
    /// `origin(path)`.
    pub fn overlay<F>(&mut self, overlay: &Mapping, origin: F)
    where
        F: Fn(&str) -> ValueSource,
    {
        merge_tracking(&mut self.config, overlay, "", &origin, &mut self.sources);
    }
}

/// Merge every layer in `store` that applies to `environment`.
///
/// The result is rebuilt from scratch on every call; `store` is only read.
#[must_use]
pub fn resolve(store: &LayerStore, environment: &str) -> Resolution {
    let mut resolution = Resolution::default();
    for layer in store.base_layers() {
        let origin = ValueSource::for_layer(layer);
        resolution.overlay(layer.data(), |_| origin.clone());
    }
    for layer in store.environment_layers(environment) {
        let origin = ValueSource::for_layer(layer);
        resolution.overlay(layer.data(), |_| origin.clone());
    }
    resolution
}

/// Deep-merge `overlay` into `base`, recording which source set each leaf.
/// When a value replaces a whole sub-tree, the stale entries beneath it are
/// dropped from `sources`.
fn merge_tracking<F>(
    base: &mut Mapping,
    overlay: &Mapping,
    prefix: &str,
    origin: &F,
    sources: &mut FieldSources,
) where
    F: Fn(&str) -> ValueSource,
{
    for (key, overlay_val) in overlay {
        let path = join_path(prefix, key);

        if let (Some(Value::Object(base_map)), Value::Object(overlay_map)) =
            (base.get_mut(key), overlay_val)
        {
            merge_tracking(base_map, overlay_map, &path, origin, sources);
            continue;
        }

        forget_subtree(sources, &path);
        record_all_leaves(overlay_val, &path, origin, sources);
        base.insert(key.clone(), overlay_val.clone());
    }
}

/// Walk a value tree and record all leaf paths with their source.
fn record_all_leaves<F>(val: &Value, path: &str, origin: &F, sources: &mut FieldSources)
where
    F: Fn(&str) -> ValueSource,
{
    match val {
        Value::Object(table) if !table.is_empty() => {
            for (key, child) in table {
                record_all_leaves(child, &join_path(path, key), origin, sources);
            }
        },
        _ => {
            sources.insert(path.to_owned(), origin(path));
        },
    }
}

fn forget_subtree(sources: &mut FieldSources, path: &str) {
    let nested = format!("{path}.");
    sources.retain(|key, _| key != path && !key.starts_with(&nested));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::environment::Environments;

    fn store_with(docs: &[(&str, Value)]) -> LayerStore {
        let envs = Environments::builtin();
        let mut store = LayerStore::new();
        for (source, doc) in docs {
            store.add_layer(doc.clone(), source, &envs).unwrap();
        }
        store
    }

    #[test]
    fn test_later_base_layers_win() {
        let store = store_with(&[
            ("a.yaml", json!({"database": {"host": "a", "port": 5432}})),
            ("b.yaml", json!({"database": {"host": "b"}})),
        ]);
        let resolved = resolve(&store, "development");
        assert_eq!(
            Value::Object(resolved.config),
            json!({"database": {"host": "b", "port": 5432}})
        );
    }

    #[test]
    fn test_environment_section_outranks_later_base() {
        // The production block is loaded first, yet still beats the later base.
        let store = store_with(&[
            (
                "a.yaml",
                json!({"database": {"host": "a"}, "production": {"database": {"host": "c"}}}),
            ),
            ("b.yaml", json!({"database": {"host": "b"}})),
        ]);

        let prod = resolve(&store, "production");
        assert_eq!(prod.config["database"]["host"], json!("c"));

        let dev = resolve(&store, "development");
        assert_eq!(dev.config["database"]["host"], json!("b"));
    }

    #[test]
    fn test_environment_sections_excluded_from_output() {
        let store = store_with(&[(
            "a.yaml",
            json!({"name": "svc", "staging": {"name": "svc-stg"}}),
        )]);
        let resolved = resolve(&store, "production");
        assert_eq!(Value::Object(resolved.config), json!({"name": "svc"}));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let store = store_with(&[
            ("a", json!({"x": {"y": 1}, "prod": {"x": {"z": 2}}})),
            ("b", json!({"x": {"y": 3}})),
        ]);
        assert_eq!(resolve(&store, "production"), resolve(&store, "production"));
    }

    #[test]
    fn test_sources_track_winning_layer() {
        let store = store_with(&[
            ("a.yaml", json!({"db": {"host": "a", "port": 1}})),
            ("b.yaml", json!({"db": {"host": "b"}, "production": {"db": {"port": 2}}})),
        ]);
        let resolved = resolve(&store, "production");

        assert_eq!(
            resolved.sources.get("db.host"),
            Some(&ValueSource::Layer {
                source: "b.yaml".to_owned(),
                environment: None
            })
        );
        assert_eq!(
            resolved.sources.get("db.port"),
            Some(&ValueSource::Layer {
                source: "b.yaml".to_owned(),
                environment: Some("production".to_owned())
            })
        );
    }

    #[test]
    fn test_scalar_replacing_subtree_forgets_stale_sources() {
        let store = store_with(&[
            ("a", json!({"log": {"level": "info", "file": "x.log"}})),
            ("b", json!({"log": "stderr"})),
        ]);
        let resolved = resolve(&store, "development");
        assert!(!resolved.sources.contains_key("log.level"));
        assert!(!resolved.sources.contains_key("log.file"));
        assert_eq!(
            resolved.sources.get("log").map(ToString::to_string),
            Some("b".to_owned())
        );
    }

    #[test]
    fn test_value_source_display() {
        let layer = ValueSource::Layer {
            source: "app.toml".to_owned(),
            environment: Some("staging".to_owned()),
        };
        assert_eq!(layer.to_string(), "app.toml (staging)");
        assert_eq!(
            ValueSource::EnvVar {
                name: "CONFIG_DB_PORT".to_owned()
            }
            .to_string(),
            "env CONFIG_DB_PORT"
        );
        assert_eq!(ValueSource::Override.to_string(), "set");
    }
}
