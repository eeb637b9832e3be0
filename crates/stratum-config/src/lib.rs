#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered, environment-aware configuration.
//!
//! A [`Config`] collects YAML, JSON and TOML documents as ordered layers,
//! merges them for the active environment, applies environment-variable and
//! direct overrides, and validates the result against declarative rules.
//!
//! # Usage
//!
//! ```rust,no_run
//! use stratum_config::{Config, EnvOverrides, Rule, collect_env_vars};
//!
//! let mut config = Config::new();
//! config.load_file("config/base.yaml")?;
//! config.load_file("config/local.toml")?;
//! config.set_environment("production")?;
//! config.apply_env_overrides(&collect_env_vars(), &EnvOverrides::default());
//!
//! config.add_rule(Rule::required("database.host")?);
//! config.add_rule(Rule::port("database.port")?);
//! config.validate_or_raise()?;
//!
//! let port = config.get_or("database.port", 5432);
//! # Ok::<(), stratum_config::ConfigError>(())
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Direct overrides** (`Config::set`)
//! 2. **Environment variables** (`CONFIG_*` by default)
//! 3. **Environment sections** of the active environment, later loads first
//! 4. **Base data**, later loads first
//!
//! Mappings merge recursively; scalars and sequences are replaced whole.
//!
//! # Environment sections
//!
//! Any top-level key naming a registered environment or alias
//! (`production`, `prod`, `live`, ...) is split off into its own layer and
//! only applies while that environment is active.

/// The configuration facade.
pub mod config;
/// Environment-variable overrides and value coercion.
pub mod env;
/// Deployment environment registry.
pub mod environment;
/// Configuration error types.
pub mod error;
/// Format detection, parsing and serialization.
pub mod format;
/// Ordered store of loaded layers.
pub mod layer;
/// Configuration file reading and discovery.
pub mod loader;
/// Nested mapping helpers addressed by dotted paths.
pub mod map;
/// Glob patterns over dotted key paths.
pub mod pattern;
/// Layer merging with provenance tracking.
pub mod resolve;
/// Resolved configuration display.
pub mod show;
/// Declarative validation rules.
pub mod validate;

// Re-export primary types at the crate root.
pub use config::Config;
pub use env::{EnvOverrides, coerce_value, collect_env_vars};
pub use environment::{DEFAULT_ENV_VAR, DEFAULT_ENVIRONMENT, Environments};
pub use error::{ConfigError, ConfigResult};
pub use format::Format;
pub use map::Mapping;
pub use pattern::KeyPattern;
pub use resolve::ValueSource;
pub use show::{ResolvedConfig, ShowFormat};
pub use validate::{Rule, RuleKind, ValidationError, ValueType};
