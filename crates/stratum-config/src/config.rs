//! The [`Config`] facade.
//!
//! A `Config` owns its layers, environment registry, overrides and rules.
//! Every mutation recomputes the effective configuration wholesale, so
//! reads never mutate and are safe to share once loading is done.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::env::{EnvOverrides, OverrideLayer};
use crate::environment::Environments;
use crate::error::{ConfigError, ConfigResult};
use crate::format::Format;
use crate::layer::LayerStore;
use crate::loader;
use crate::map::{
    Mapping, deep_get, deep_remove, deep_set, flatten, leaf_paths, merge_into, split_path,
};
use crate::resolve::{FieldSources, Resolution, ValueSource, resolve};
use crate::show::{ResolvedConfig, ShowFormat};
use crate::validate::{Rule, ValidationError, validate};

/// Source label for mappings loaded through [`Config::load_dict`].
pub const DICT_SOURCE: &str = "dict";

/// Layered, environment-aware configuration.
#[derive(Debug, Clone)]
pub struct Config {
    environments: Environments,
    active: String,
    layers: LayerStore,
    env_layer: OverrideLayer,
    overrides: Mapping,
    rules: Vec<Rule>,
    loaded_files: Vec<PathBuf>,
    effective: Resolution,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// An empty configuration with the built-in environments, active on
    /// the default environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_environments(Environments::builtin())
    }

    /// An empty configuration using a custom environment registry.
    #[must_use]
    pub fn with_environments(environments: Environments) -> Self {
        let active = environments.default_environment().to_owned();
        Self {
            environments,
            active,
            layers: LayerStore::new(),
            env_layer: OverrideLayer::default(),
            overrides: Mapping::new(),
            rules: Vec::new(),
            loaded_files: Vec::new(),
            effective: Resolution::default(),
        }
    }

    // ── Environments ─────────────────────────────────────────────────

    /// The environment registry.
    #[must_use]
    pub fn environments(&self) -> &Environments {
        &self.environments
    }

    /// Register an environment or extend its aliases.
    ///
    /// Layers that are already loaded keep the sections they were split
    /// into; only later loads see the new names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvironmentConflict`] if a name is taken.
    pub fn register_environment(&mut self, name: &str, aliases: &[&str]) -> ConfigResult<()> {
        self.environments.register(name, aliases)
    }

    /// Canonical name of the active environment.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.active
    }

    /// `true` if `name` (or alias) refers to the active environment.
    #[must_use]
    pub fn is_environment(&self, name: &str) -> bool {
        self.environments.resolve(name) == Some(self.active.as_str())
    }

    /// Switch the active environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnvironment`] for an unregistered name.
    pub fn set_environment(&mut self, name: &str) -> ConfigResult<()> {
        let canonical = self.environments.canonical(name)?.to_owned();
        if canonical != self.active {
            debug!(from = %self.active, to = %canonical, "switching environment");
            self.active = canonical;
            self.refresh();
        }
        Ok(())
    }

    /// Select the environment named by `var_name` in `vars`, falling back to
    /// the registry default. Returns the chosen canonical name.
    pub fn detect_environment<S: BuildHasher>(
        &mut self,
        vars: &HashMap<String, String, S>,
        var_name: &str,
    ) -> &str {
        let detected = self.environments.detect(vars, var_name).to_owned();
        if detected != self.active {
            debug!(environment = %detected, var = var_name, "detected environment");
            self.active = detected;
            self.refresh();
        }
        &self.active
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Add an already-parsed document as a new layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FormatError`] if the document is not a mapping.
    pub fn load_value(&mut self, document: Value, source: &str) -> ConfigResult<()> {
        self.layers.add_layer(document, source, &self.environments)?;
        self.refresh();
        Ok(())
    }

    /// Add a mapping as a new layer labelled `"dict"`.
    ///
    /// # Errors
    ///
    /// None for a mapping; the `Result` mirrors the other loaders.
    pub fn load_dict(&mut self, mapping: Mapping) -> ConfigResult<()> {
        self.load_value(Value::Object(mapping), DICT_SOURCE)
    }

    /// Parse `text` and add it as a new layer labelled `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] or [`ConfigError::FormatError`].
    pub fn load_str(&mut self, text: &str, format: Format, source: &str) -> ConfigResult<()> {
        let document = format.parse(text, source)?;
        self.load_value(document, source)
    }

    /// Read a file and add it as a new layer.
    ///
    /// # Errors
    ///
    /// Returns any error from [`loader::read_file`], or
    /// [`ConfigError::FormatError`] for a non-mapping document.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let document = loader::read_file(path)?;
        self.layers
            .add_layer(document, &path.display().to_string(), &self.environments)?;
        self.loaded_files.push(path.to_path_buf());
        info!(path = %path.display(), "loaded config file");
        self.refresh();
        Ok(())
    }

    /// Load every supported file in `dir`, in path order, optionally only
    /// those whose file name matches the glob `pattern`. Returns how many
    /// files were loaded.
    ///
    /// Either every file loads or none does.
    ///
    /// # Errors
    ///
    /// Returns the first discovery, read, parse or structure error.
    pub fn load_directory(
        &mut self,
        dir: impl AsRef<Path>,
        recursive: bool,
        pattern: Option<&str>,
    ) -> ConfigResult<usize> {
        let dir = dir.as_ref();
        let files = loader::discover(dir, recursive, pattern)?;

        let mut staged = self.layers.clone();
        for path in &files {
            let document = loader::read_file(path)?;
            staged.add_layer(document, &path.display().to_string(), &self.environments)?;
        }

        self.layers = staged;
        self.loaded_files.extend(files.iter().cloned());
        info!(path = %dir.display(), files = files.len(), "loaded config directory");
        self.refresh();
        Ok(files.len())
    }

    /// Drop all layers and re-read every previously loaded file in its
    /// original order. Files that no longer exist are skipped. Layers that
    /// did not come from files are not restored. Overrides and rules are
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns the first read, parse or structure error; the current state
    /// is left untouched in that case.
    pub fn reload(&mut self) -> ConfigResult<()> {
        let mut staged = LayerStore::new();
        let mut reloaded = Vec::with_capacity(self.loaded_files.len());
        for path in &self.loaded_files {
            let Some(document) = loader::try_read_file(path)? else {
                continue;
            };
            staged.add_layer(document, &path.display().to_string(), &self.environments)?;
            reloaded.push(path.clone());
        }

        info!(
            files = reloaded.len(),
            missing = self.loaded_files.len().saturating_sub(reloaded.len()),
            "reloaded configuration"
        );
        self.layers = staged;
        self.loaded_files = reloaded;
        self.refresh();
        Ok(())
    }

    /// Drop all layers, overrides and loaded-file records. Rules and the
    /// active environment are kept.
    pub fn reset(&mut self) {
        self.layers.reset();
        self.env_layer = OverrideLayer::default();
        self.overrides.clear();
        self.loaded_files.clear();
        self.refresh();
    }

    // ── Overrides ────────────────────────────────────────────────────

    /// Replace the environment-variable layer with values taken from
    /// `vars`. Returns the number of variables applied.
    pub fn apply_env_overrides<S: BuildHasher>(
        &mut self,
        vars: &HashMap<String, String, S>,
        overrides: &EnvOverrides,
    ) -> usize {
        self.env_layer = overrides.build(vars);
        let applied = self.env_layer.applied();
        debug!(
            prefix = overrides.prefix(),
            applied,
            skipped = self.env_layer.skipped.len(),
            "applied env overrides"
        );
        self.refresh();
        applied
    }

    /// Remove the environment-variable layer.
    pub fn clear_env_overrides(&mut self) {
        self.env_layer = OverrideLayer::default();
        self.refresh();
    }

    /// Set a value that outranks every other layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPath`] for an empty path or segment, or
    /// [`ConfigError::ConflictError`] if a parent of `path` currently holds a
    /// non-mapping value.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> ConfigResult<()> {
        self.check_parents(path)?;
        deep_set(&mut self.overrides, path, value.into())?;
        self.refresh();
        Ok(())
    }

    /// Set every leaf of `updates` as a direct override. Nothing is applied
    /// if any leaf conflicts.
    ///
    /// # Errors
    ///
    /// As for [`set`](Self::set).
    pub fn update(&mut self, updates: &Mapping) -> ConfigResult<()> {
        let mut staged = self.clone();
        for (path, value) in flatten(updates) {
            staged.check_parents(&path)?;
            deep_set(&mut staged.overrides, &path, value)?;
            staged.refresh();
        }
        self.overrides = staged.overrides;
        self.effective = staged.effective;
        Ok(())
    }

    /// Remove a direct override, returning it. Values from loaded layers
    /// and environment variables are unaffected.
    pub fn unset(&mut self, path: &str) -> Option<Value> {
        let removed = deep_remove(&mut self.overrides, path)?;
        prune_empty_parents(&mut self.overrides, path);
        self.refresh();
        Some(removed)
    }

    fn check_parents(&self, path: &str) -> ConfigResult<()> {
        let segments = split_path(path)?;
        for depth in 1..segments.len() {
            let parent = segments[..depth].join(".");
            if let Some(existing) = deep_get(&self.effective.config, &parent)
                && !existing.is_object()
            {
                return Err(ConfigError::ConflictError {
                    path: path.to_owned(),
                    segment: parent,
                });
            }
        }
        Ok(())
    }

    // ── Access ───────────────────────────────────────────────────────

    /// The value at `path`, or `None` if it is absent. A present null is
    /// `Some(&Value::Null)`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        deep_get(&self.effective.config, path)
    }

    /// The value at `path`, or `default` if it is absent.
    #[must_use]
    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Value {
        self.get(path).cloned().unwrap_or_else(|| default.into())
    }

    /// Deserialize the value at `path` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if `path` is absent, or
    /// [`ConfigError::DeserializeError`] if the value has the wrong shape.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<T> {
        let value = self.get(path).ok_or_else(|| ConfigError::MissingKey {
            key: path.to_owned(),
        })?;
        serde_json::from_value(value.clone()).map_err(|e| ConfigError::DeserializeError {
            key: path.to_owned(),
            message: e.to_string(),
        })
    }

    /// `true` if [`get`](Self::get) would return a value.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// The effective configuration.
    #[must_use]
    pub fn as_mapping(&self) -> &Mapping {
        &self.effective.config
    }

    /// The effective configuration as an owned value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.effective.config.clone())
    }

    /// The loaded documents folded together without resolving environments.
    ///
    /// Base data merges in load order; each environment section is nested
    /// back under its canonical name (`prod:` comes back as `production:`).
    /// Env-var and direct overrides are not included.
    #[must_use]
    pub fn raw(&self) -> Mapping {
        let mut raw = Mapping::new();
        for layer in self.layers.layers() {
            match layer.environment() {
                None => merge_into(&mut raw, layer.data()),
                Some(environment) => {
                    let mut nested = Mapping::new();
                    nested.insert(environment.to_owned(), Value::Object(layer.data().clone()));
                    merge_into(&mut raw, &nested);
                },
            }
        }
        raw
    }

    /// Every leaf path, in document order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        leaf_paths(&self.effective.config)
    }

    /// Every `(leaf path, value)` pair, in document order.
    #[must_use]
    pub fn items(&self) -> Vec<(String, Value)> {
        flatten(&self.effective.config)
    }

    /// Number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effective.config.len()
    }

    /// `true` if the effective configuration has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effective.config.is_empty()
    }

    // ── Provenance ───────────────────────────────────────────────────

    /// Where the value at leaf `path` came from.
    #[must_use]
    pub fn source_of(&self, path: &str) -> Option<&ValueSource> {
        self.effective.sources.get(path)
    }

    /// Provenance of every leaf.
    #[must_use]
    pub fn field_sources(&self) -> &FieldSources {
        &self.effective.sources
    }

    /// Files loaded so far, in load order.
    #[must_use]
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    /// The stored layers.
    #[must_use]
    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// The current environment-variable layer.
    #[must_use]
    pub fn env_overrides(&self) -> &OverrideLayer {
        &self.env_layer
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Register a rule. Rules are evaluated in registration order.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Register a built-in rule by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownRule`] for an unrecognized name.
    pub fn add_builtin_rule(&mut self, key: &str, name: &str) -> ConfigResult<()> {
        self.rules.push(Rule::builtin(key, name)?);
        Ok(())
    }

    /// Registered rules.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Check the effective configuration against every rule.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationError> {
        validate(&self.effective.config, &self.rules)
    }

    /// Like [`validate`](Self::validate), but any failure is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] carrying every failure.
    pub fn validate_or_raise(&self) -> ConfigResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError { errors })
        }
    }

    // ── Output ───────────────────────────────────────────────────────

    /// Snapshot of the effective configuration with provenance.
    #[must_use]
    pub fn resolved(&self) -> ResolvedConfig {
        ResolvedConfig {
            config: self.effective.config.clone(),
            field_sources: self.effective.sources.clone(),
            loaded_files: self
                .loaded_files
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            environment: self.active.clone(),
        }
    }

    /// Render the effective configuration (or one section of it).
    ///
    /// # Errors
    ///
    /// See [`ResolvedConfig::show`].
    pub fn show(&self, format: ShowFormat, section: Option<&str>) -> ConfigResult<String> {
        self.resolved().show(format, section)
    }

    /// Render the loaded documents as returned by [`raw`](Self::raw).
    ///
    /// # Errors
    ///
    /// See [`ResolvedConfig::show`].
    pub fn show_raw(&self, format: ShowFormat, section: Option<&str>) -> ConfigResult<String> {
        let raw = ResolvedConfig {
            config: self.raw(),
            field_sources: FieldSources::new(),
            ..self.resolved()
        };
        raw.show(format, section)
    }

    /// Write the effective configuration to `path`. The format defaults to
    /// the one implied by the extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`],
    /// [`ConfigError::SerializeError`] or [`ConfigError::WriteError`].
    pub fn save_to_file(&self, path: impl AsRef<Path>, format: Option<Format>) -> ConfigResult<()> {
        write_mapping(path.as_ref(), format, &self.effective.config)
    }

    /// Write the loaded documents, environment sections included, to
    /// `path`. Env-var and direct overrides are not written.
    ///
    /// # Errors
    ///
    /// As for [`save_to_file`](Self::save_to_file).
    pub fn save_raw_to_file(&self, path: impl AsRef<Path>, format: Option<Format>) -> ConfigResult<()> {
        write_mapping(path.as_ref(), format, &self.raw())
    }

    /// Rebuild the effective configuration from layers, the env layer and
    /// direct overrides, in that order of precedence.
    fn refresh(&mut self) {
        let mut effective = resolve(&self.layers, &self.active);

        let env_layer = &self.env_layer;
        effective.overlay(&env_layer.values, |path| ValueSource::EnvVar {
            name: env_layer.origin_of(path).unwrap_or_default().to_owned(),
        });
        effective.overlay(&self.overrides, |_| ValueSource::Override);

        self.effective = effective;
    }
}

fn write_mapping(path: &Path, format: Option<Format>, map: &Mapping) -> ConfigResult<()> {
    let format = match format {
        Some(f) => f,
        None => Format::from_path(path)?,
    };
    let text = format.serialize(map)?;
    std::fs::write(path, text).map_err(|e| ConfigError::WriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    info!(path = %path.display(), %format, "saved config file");
    Ok(())
}

/// Drop mappings left empty by removing `path`, innermost first.
fn prune_empty_parents(map: &mut Mapping, path: &str) {
    let mut parent = path;
    while let Some(idx) = parent.rfind('.') {
        parent = &parent[..idx];
        let emptied = deep_get(map, parent)
            .and_then(Value::as_object)
            .is_some_and(Mapping::is_empty);
        if !emptied {
            break;
        }
        deep_remove(map, parent);
    }
}
