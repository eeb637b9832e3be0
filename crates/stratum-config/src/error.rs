use std::io;

use thiserror::Error;

use crate::validate::ValidationError;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// Path to the config file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to write a configuration file.
    #[error("Failed to write config file at {path}: {source}")]
    WriteError {
        /// Destination path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Configuration text could not be parsed in its declared format.
    #[error("Failed to parse {format} config at {path}: {message}")]
    ParseError {
        /// Origin of the text (file path or caller-supplied label).
        path: String,
        /// Format the text was parsed as.
        format: String,
        /// Parser diagnostic.
        message: String,
    },

    /// Parsed input is structurally unusable (e.g. not a mapping at the top).
    #[error("Invalid configuration structure in {origin}: {message}")]
    FormatError {
        /// Origin of the offending input.
        origin: String,
        /// What was wrong with it.
        message: String,
    },

    /// No parser is registered for the file extension or format tag.
    #[error("Unsupported config format '{extension}' for {path}; expected yaml, yml, json or toml")]
    UnsupportedFormat {
        /// Path or label the format was derived from.
        path: String,
        /// The extension or tag that was not recognized.
        extension: String,
    },

    /// Config file exceeds the size limit.
    #[error("Config file {path} is {size} bytes, exceeding the {limit} byte limit")]
    FileTooLarge {
        /// Path to the oversized file.
        path: String,
        /// Actual size in bytes.
        size: u64,
        /// Maximum accepted size in bytes.
        limit: u64,
    },

    /// A tree could not be written out in the requested format.
    #[error("Failed to serialize config as {format}: {message}")]
    SerializeError {
        /// Target format.
        format: String,
        /// Serializer diagnostic.
        message: String,
    },

    /// A dotted-path write tried to descend through a non-mapping value.
    #[error("Cannot set '{path}': '{segment}' is not a mapping")]
    ConflictError {
        /// Full dotted path being written.
        path: String,
        /// The intermediate path that holds a non-mapping value.
        segment: String,
    },

    /// A requested key is not present in the configuration.
    #[error("Key '{key}' is not set")]
    MissingKey {
        /// Dotted path that was looked up.
        key: String,
    },

    /// A dotted path is empty or contains an empty segment.
    #[error("Invalid key path '{path}'")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// Environment name or alias is not registered.
    #[error("Unknown environment '{name}'; known environments: {known}")]
    UnknownEnvironment {
        /// The name that failed to resolve.
        name: String,
        /// Comma-separated canonical names that are registered.
        known: String,
    },

    /// An alias is already claimed by another environment.
    #[error("Environment alias '{alias}' is already registered for '{existing}'")]
    EnvironmentConflict {
        /// The contested alias.
        alias: String,
        /// Canonical environment that already owns it.
        existing: String,
    },

    /// A key pattern is not a valid glob.
    #[error("Invalid key pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Glob compiler diagnostic.
        message: String,
    },

    /// A value could not be converted into the requested Rust type.
    #[error("Value at '{key}' has the wrong shape: {message}")]
    DeserializeError {
        /// Dotted path of the value.
        key: String,
        /// Deserializer diagnostic.
        message: String,
    },

    /// A built-in rule name was not recognized.
    #[error("Unknown validation rule '{name}'; available rules: {available}")]
    UnknownRule {
        /// The rule name that was requested.
        name: String,
        /// Comma-separated list of built-in rule names.
        available: String,
    },

    /// A rule could not be constructed (bad regex, inverted bounds, ...).
    #[error("Invalid validation rule for '{key}': {message}")]
    InvalidRule {
        /// Key path or pattern the rule was meant for.
        key: String,
        /// Why the rule is invalid.
        message: String,
    },

    /// Aggregate of every failure found by a validation run.
    #[error("Configuration validation failed: {}", summarize(.errors))]
    ValidationError {
        /// Individual failures, in rule registration order.
        errors: Vec<ValidationError>,
    },
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
