//! Named deployment environments and their aliases.
//!
//! The registry maps canonical names (`production`) to alias sets (`prod`,
//! `live`). Alias sets are disjoint across environments, and every lookup
//! resolves to a canonical name.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Environment used when nothing else selects one.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Conventional variable that selects the active environment.
pub const DEFAULT_ENV_VAR: &str = "APP_ENV";

/// Built-in environments and their aliases.
const BUILTIN_ENVIRONMENTS: &[(&str, &[&str])] = &[
    ("development", &["dev", "develop", "local"]),
    ("staging", &["stage", "preprod", "pre-production"]),
    ("production", &["prod", "live"]),
    ("testing", &["test", "ci"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct EnvironmentEntry {
    name: String,
    aliases: Vec<String>,
}

/// Registry of known environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environments {
    entries: Vec<EnvironmentEntry>,
    default: String,
}

impl Default for Environments {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lookups ignore case and surrounding whitespace.
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Environments {
    /// The built-in development/staging/production/testing registry.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = BUILTIN_ENVIRONMENTS
            .iter()
            .map(|(name, aliases)| EnvironmentEntry {
                name: (*name).to_owned(),
                aliases: aliases.iter().map(|a| (*a).to_owned()).collect(),
            })
            .collect();
        Self {
            entries,
            default: DEFAULT_ENVIRONMENT.to_owned(),
        }
    }

    /// A registry containing only `default`, with no aliases.
    #[must_use]
    pub fn with_default(default: &str) -> Self {
        let name = normalize(default);
        Self {
            entries: vec![EnvironmentEntry {
                name: name.clone(),
                aliases: Vec::new(),
            }],
            default: name,
        }
    }

    /// Register an environment, or add aliases to an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvironmentConflict`] if `name` or any alias is
    /// already claimed by a different environment. Nothing is registered in
    /// that case.
    pub fn register(&mut self, name: &str, aliases: &[&str]) -> ConfigResult<()> {
        let name = normalize(name);
        if name.is_empty() {
            return Err(ConfigError::UnknownEnvironment {
                name,
                known: self.names().collect::<Vec<_>>().join(", "),
            });
        }

        let claims = std::iter::once(name.clone()).chain(aliases.iter().map(|a| normalize(a)));
        for claim in claims {
            if let Some(owner) = self.resolve(&claim)
                && owner != name
            {
                return Err(ConfigError::EnvironmentConflict {
                    alias: claim,
                    existing: owner.to_owned(),
                });
            }
        }

        let new_aliases: Vec<String> = aliases
            .iter()
            .map(|a| normalize(a))
            .filter(|a| *a != name)
            .collect();

        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            for alias in new_aliases {
                if !entry.aliases.contains(&alias) {
                    entry.aliases.push(alias);
                }
            }
        } else {
            debug!(environment = %name, "registered environment");
            self.entries.push(EnvironmentEntry {
                name,
                aliases: new_aliases,
            });
        }
        Ok(())
    }

    /// Resolve a name or alias to its canonical environment name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let needle = normalize(name);
        self.entries
            .iter()
            .find(|e| e.name == needle || e.aliases.contains(&needle))
            .map(|e| e.name.as_str())
    }

    /// Like [`resolve`](Self::resolve), but unknown names are an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnvironment`] if `name` is not registered.
    pub fn canonical(&self, name: &str) -> ConfigResult<&str> {
        self.resolve(name)
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                name: name.to_owned(),
                known: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    /// The fallback environment.
    #[must_use]
    pub fn default_environment(&self) -> &str {
        &self.default
    }

    /// Change the fallback environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnvironment`] if `name` is not registered.
    pub fn set_default(&mut self, name: &str) -> ConfigResult<()> {
        self.default = self.canonical(name)?.to_owned();
        Ok(())
    }

    /// Canonical names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Aliases registered for a canonical environment name.
    #[must_use]
    pub fn aliases(&self, name: &str) -> Option<&[String]> {
        let needle = normalize(name);
        self.entries
            .iter()
            .find(|e| e.name == needle)
            .map(|e| e.aliases.as_slice())
    }

    /// Pick the environment named by `var_name` in `vars`.
    ///
    /// A missing or unrecognized value falls back to the default environment.
    #[must_use]
    pub fn detect<S: ::std::hash::BuildHasher>(
        &self,
        vars: &HashMap<String, String, S>,
        var_name: &str,
    ) -> &str {
        match vars.get(var_name) {
            Some(raw) => self.resolve(raw).unwrap_or_else(|| {
                debug!(
                    var = var_name,
                    value = %raw,
                    fallback = %self.default,
                    "unrecognized environment; using fallback"
                );
                self.default.as_str()
            }),
            None => self.default.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_canonical_names() {
        let envs = Environments::builtin();
        let names: Vec<&str> = envs.names().collect();
        assert_eq!(names, vec!["development", "staging", "production", "testing"]);
        assert_eq!(envs.default_environment(), "development");
    }

    #[test]
    fn test_resolve_aliases() {
        let envs = Environments::builtin();
        assert_eq!(envs.resolve("dev"), Some("development"));
        assert_eq!(envs.resolve("local"), Some("development"));
        assert_eq!(envs.resolve("pre-production"), Some("staging"));
        assert_eq!(envs.resolve("prod"), Some("production"));
        assert_eq!(envs.resolve("live"), Some("production"));
        assert_eq!(envs.resolve("ci"), Some("testing"));
        assert_eq!(envs.resolve("production"), Some("production"));
    }

    #[test]
    fn test_resolve_case_and_whitespace() {
        let envs = Environments::builtin();
        assert_eq!(envs.resolve("PROD"), Some("production"));
        assert_eq!(envs.resolve("  Staging\n"), Some("staging"));
    }

    #[test]
    fn test_canonical_unknown() {
        let envs = Environments::builtin();
        let err = envs.canonical("qa").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment { .. }));
        assert!(err.to_string().contains("production"));
    }

    #[test]
    fn test_register_custom_environment() {
        let mut envs = Environments::builtin();
        envs.register("qa", &["quality", "QA-1"]).unwrap();
        assert_eq!(envs.resolve("quality"), Some("qa"));
        assert_eq!(envs.resolve("qa-1"), Some("qa"));
    }

    #[test]
    fn test_register_extends_existing_aliases() {
        let mut envs = Environments::builtin();
        envs.register("production", &["prd"]).unwrap();
        assert_eq!(envs.resolve("prd"), Some("production"));
        assert_eq!(envs.resolve("prod"), Some("production"));
    }

    #[test]
    fn test_register_rejects_overlapping_alias() {
        let mut envs = Environments::builtin();
        let err = envs.register("qa", &["test"]).unwrap_err();
        match err {
            ConfigError::EnvironmentConflict { alias, existing } => {
                assert_eq!(alias, "test");
                assert_eq!(existing, "testing");
            },
            other => panic!("expected EnvironmentConflict, got {other:?}"),
        }
        // Nothing was registered.
        assert_eq!(envs.resolve("qa"), None);
    }

    #[test]
    fn test_register_rejects_alias_equal_to_other_canonical() {
        let mut envs = Environments::builtin();
        assert!(envs.register("qa", &["staging"]).is_err());
    }

    #[test]
    fn test_detect_from_vars() {
        let envs = Environments::builtin();
        let mut vars = HashMap::new();
        assert_eq!(envs.detect(&vars, DEFAULT_ENV_VAR), "development");

        vars.insert("APP_ENV".to_owned(), "prod".to_owned());
        assert_eq!(envs.detect(&vars, DEFAULT_ENV_VAR), "production");

        vars.insert("APP_ENV".to_owned(), "nonsense".to_owned());
        assert_eq!(envs.detect(&vars, DEFAULT_ENV_VAR), "development");
    }

    #[test]
    fn test_with_default_and_set_default() {
        let mut envs = Environments::with_default("Local");
        assert_eq!(envs.default_environment(), "local");
        envs.register("cloud", &[]).unwrap();
        envs.set_default("cloud").unwrap();
        assert_eq!(envs.default_environment(), "cloud");
        assert!(envs.set_default("missing").is_err());
    }
}
