use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::pattern::KeyPattern;

const URL_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9+.-]*://[^/\s?#]+\S*$";
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

/// Names accepted by [`Rule::builtin`].
pub const BUILTIN_RULES: &[&str] = &[
    "required", "non_empty", "url", "email", "port", "string", "integer", "float", "number",
    "bool", "sequence", "mapping",
];

/// Runtime type a `type` rule checks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// A string.
    String,
    /// Whole numbers only.
    Integer,
    /// A number with a fractional part or exponent (`1.5`, `2.0`, `1e3`).
    Float,
    /// Any number, integer or float.
    Number,
    /// `true` or `false`.
    Bool,
    /// A sequence of any values.
    Sequence,
    /// A nested mapping.
    Mapping,
}

impl ValueType {
    /// Whether `value` has this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_f64(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Sequence => value.is_array(),
            Self::Mapping => value.is_object(),
        }
    }

    /// Lower-case name, as accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(Self::String),
            "integer" | "int" => Ok(Self::Integer),
            "float" | "double" => Ok(Self::Float),
            "number" | "numeric" => Ok(Self::Number),
            "bool" | "boolean" => Ok(Self::Bool),
            "sequence" | "list" | "array" => Ok(Self::Sequence),
            "mapping" | "dict" | "map" | "object" => Ok(Self::Mapping),
            _ => Err(ConfigError::UnknownRule {
                name: s.to_owned(),
                available: "string, integer, float, number, bool, sequence, mapping".to_owned(),
            }),
        }
    }
}

/// Predicate for [`RuleKind::Custom`].
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// What a rule checks.
#[derive(Clone)]
pub enum RuleKind {
    /// The key must be present. Null counts as present.
    Required,
    /// Strings must contain non-whitespace; sequences and mappings must have
    /// at least one element.
    NonEmpty,
    /// The value must have the given runtime type.
    Type(ValueType),
    /// A number within the bounds. Missing bounds are unbounded.
    Range {
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
        /// Whether the bounds themselves are allowed.
        inclusive: bool,
    },
    /// A string whose character count is within the bounds.
    Length {
        /// Fewest characters allowed.
        min: Option<usize>,
        /// Most characters allowed.
        max: Option<usize>,
    },
    /// The value must equal one of these.
    Choices(Vec<Value>),
    /// A string that matches the regex at its start.
    Pattern {
        /// Compiled, start-anchored expression.
        regex: Regex,
        /// What the expression accepts, for messages.
        description: String,
    },
    /// A caller-supplied check.
    Custom {
        /// Returns `true` for acceptable values.
        predicate: Predicate,
        /// Failure message.
        description: String,
    },
}

impl RuleKind {
    /// Short kind label.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::NonEmpty => "non_empty",
            Self::Type(_) => "type",
            Self::Range { .. } => "range",
            Self::Length { .. } => "length",
            Self::Choices(_) => "choices",
            Self::Pattern { .. } => "pattern",
            Self::Custom { .. } => "custom",
        }
    }

    /// `None` if `value` passes, else the default failure message.
    pub(crate) fn check(&self, value: &Value) -> Option<String> {
        match self {
            Self::Required => None,
            Self::NonEmpty => {
                let empty = match value {
                    Value::Null => true,
                    Value::String(s) => s.trim().is_empty(),
                    Value::Array(a) => a.is_empty(),
                    Value::Object(m) => m.is_empty(),
                    Value::Bool(_) | Value::Number(_) => false,
                };
                empty.then(|| "is required and cannot be empty".to_owned())
            },
            Self::Type(expected) => (!expected.matches(value))
                .then(|| format!("must be of type {expected}")),
            Self::Range {
                min,
                max,
                inclusive,
            } => check_range(value, *min, *max, *inclusive),
            Self::Length { min, max } => check_length(value, *min, *max),
            Self::Choices(choices) => (!choices.contains(value)).then(|| {
                let listed: Vec<String> = choices.iter().map(ToString::to_string).collect();
                format!("must be one of: {}", listed.join(", "))
            }),
            Self::Pattern { regex, description } => match value.as_str() {
                Some(s) if regex.is_match(s) => None,
                Some(_) => Some(format!("must match {description}")),
                None => Some("must be a string".to_owned()),
            },
            Self::Custom {
                predicate,
                description,
            } => (!predicate(value)).then(|| description.clone()),
        }
    }
}

fn check_range(value: &Value, min: Option<f64>, max: Option<f64>, inclusive: bool) -> Option<String> {
    let Some(n) = value.as_f64() else {
        return Some("must be a number".to_owned());
    };
    let above_min = min.is_none_or(|lo| if inclusive { n >= lo } else { n > lo });
    let below_max = max.is_none_or(|hi| if inclusive { n <= hi } else { n < hi });
    if above_min && below_max {
        return None;
    }
    Some(describe_range(min, max, inclusive))
}

fn describe_range(min: Option<f64>, max: Option<f64>, inclusive: bool) -> String {
    match (min, max, inclusive) {
        (Some(lo), Some(hi), true) => format!("must be between {lo} and {hi}"),
        (Some(lo), Some(hi), false) => format!("must be strictly between {lo} and {hi}"),
        (Some(lo), None, true) => format!("must be at least {lo}"),
        (Some(lo), None, false) => format!("must be greater than {lo}"),
        (None, Some(hi), true) => format!("must be at most {hi}"),
        (None, Some(hi), false) => format!("must be less than {hi}"),
        (None, None, _) => "must be a number".to_owned(),
    }
}

fn check_length(value: &Value, min: Option<usize>, max: Option<usize>) -> Option<String> {
    let Some(s) = value.as_str() else {
        return Some("must be a string".to_owned());
    };
    let len = s.chars().count();
    if let Some(lo) = min
        && len < lo
    {
        return Some(format!("must be at least {lo} characters long"));
    }
    if let Some(hi) = max
        && len > hi
    {
        return Some(format!("must be at most {hi} characters long"));
    }
    None
}

impl fmt::Debug for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("Required"),
            Self::NonEmpty => f.write_str("NonEmpty"),
            Self::Type(t) => f.debug_tuple("Type").field(t).finish(),
            Self::Range {
                min,
                max,
                inclusive,
            } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .field("inclusive", inclusive)
                .finish(),
            Self::Length { min, max } => f
                .debug_struct("Length")
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::Choices(c) => f.debug_tuple("Choices").field(c).finish(),
            Self::Pattern { regex, description } => f
                .debug_struct("Pattern")
                .field("regex", &regex.as_str())
                .field("description", description)
                .finish(),
            Self::Custom { description, .. } => f
                .debug_struct("Custom")
                .field("description", description)
                .finish_non_exhaustive(),
        }
    }
}

/// A validation rule bound to a key or key pattern.
#[derive(Debug, Clone)]
pub struct Rule {
    key: KeyPattern,
    kind: RuleKind,
    name: &'static str,
    message: Option<String>,
}

impl Rule {
    /// Bind `kind` to a key path or glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if `key` is not a valid glob.
    pub fn new(key: &str, kind: RuleKind) -> ConfigResult<Self> {
        let name = kind.name();
        Ok(Self {
            key: KeyPattern::new(key)?,
            kind,
            name,
            message: None,
        })
    }

    /// The key must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for an invalid glob.
    pub fn required(key: &str) -> ConfigResult<Self> {
        Self::new(key, RuleKind::Required)
    }

    /// The value must not be empty or blank.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for an invalid glob.
    pub fn non_empty(key: &str) -> ConfigResult<Self> {
        Self::new(key, RuleKind::NonEmpty)
    }

    /// The value must have runtime type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for an invalid glob.
    pub fn of_type(key: &str, ty: ValueType) -> ConfigResult<Self> {
        Self::new(key, RuleKind::Type(ty))
    }

    /// Inclusive numeric range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRule`] if a bound is not finite or
    /// `min > max`.
    pub fn range(key: &str, min: f64, max: f64) -> ConfigResult<Self> {
        Self::bounded(key, Some(min), Some(max), true)
    }

    /// Exclusive numeric range.
    ///
    /// # Errors
    ///
    /// As for [`range`](Self::range).
    pub fn range_exclusive(key: &str, min: f64, max: f64) -> ConfigResult<Self> {
        Self::bounded(key, Some(min), Some(max), false)
    }

    /// Inclusive lower bound only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRule`] if `min` is not finite.
    pub fn at_least(key: &str, min: f64) -> ConfigResult<Self> {
        Self::bounded(key, Some(min), None, true)
    }

    /// Inclusive upper bound only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRule`] if `max` is not finite.
    pub fn at_most(key: &str, max: f64) -> ConfigResult<Self> {
        Self::bounded(key, None, Some(max), true)
    }

    fn bounded(key: &str, min: Option<f64>, max: Option<f64>, inclusive: bool) -> ConfigResult<Self> {
        if min.into_iter().chain(max).any(|b| !b.is_finite()) {
            return Err(invalid(key, "range bounds must be finite"));
        }
        if let (Some(lo), Some(hi)) = (min, max)
            && lo > hi
        {
            return Err(invalid(key, &format!("minimum {lo} exceeds maximum {hi}")));
        }
        Self::new(
            key,
            RuleKind::Range {
                min,
                max,
                inclusive,
            },
        )
    }

    /// String length in characters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRule`] if both bounds are missing or
    /// `min > max`.
    pub fn length(key: &str, min: Option<usize>, max: Option<usize>) -> ConfigResult<Self> {
        match (min, max) {
            (None, None) => return Err(invalid(key, "length rule needs a minimum or maximum")),
            (Some(lo), Some(hi)) if lo > hi => {
                return Err(invalid(key, &format!("minimum {lo} exceeds maximum {hi}")));
            },
            _ => {},
        }
        Self::new(key, RuleKind::Length { min, max })
    }

    /// The value must be one of `choices`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRule`] if `choices` is empty.
    pub fn choices<I, V>(key: &str, choices: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let choices: Vec<Value> = choices.into_iter().map(Into::into).collect();
        if choices.is_empty() {
            return Err(invalid(key, "choices must not be empty"));
        }
        Self::new(key, RuleKind::Choices(choices))
    }

    /// The string value must match `regex` from its first character.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRule`] if the regex does not compile.
    pub fn pattern(key: &str, regex: &str) -> ConfigResult<Self> {
        Self::pattern_described(key, regex, &format!("pattern {regex}"))
    }

    fn pattern_described(key: &str, regex: &str, description: &str) -> ConfigResult<Self> {
        let compiled = Regex::new(&format!("^(?:{regex})"))
            .map_err(|e| invalid(key, &e.to_string()))?;
        Self::new(
            key,
            RuleKind::Pattern {
                regex: compiled,
                description: description.to_owned(),
            },
        )
    }

    /// A URL with a scheme and a host.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for an invalid glob.
    pub fn url(key: &str) -> ConfigResult<Self> {
        Ok(Self::pattern_described(key, URL_PATTERN, "a URL")?
            .named("url")
            .with_message("must be a valid URL with scheme and netloc"))
    }

    /// An email address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for an invalid glob.
    pub fn email(key: &str) -> ConfigResult<Self> {
        Ok(Self::pattern_described(key, EMAIL_PATTERN, "an email address")?
            .named("email")
            .with_message("must be a valid email address"))
    }

    /// A TCP/UDP port, 1 to 65535.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for an invalid glob.
    pub fn port(key: &str) -> ConfigResult<Self> {
        Ok(Self::range(key, 1.0, 65535.0)?
            .named("port")
            .with_message("must be a valid port number (1-65535)"))
    }

    /// A caller-supplied predicate; `description` is the failure message.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for an invalid glob.
    pub fn custom<F>(key: &str, description: &str, predicate: F) -> ConfigResult<Self>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::new(
            key,
            RuleKind::Custom {
                predicate: Arc::new(predicate),
                description: description.to_owned(),
            },
        )
    }

    /// Look up a built-in rule by name (see [`BUILTIN_RULES`]).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownRule`] for an unrecognized name.
    pub fn builtin(key: &str, name: &str) -> ConfigResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "required" => Self::required(key),
            "non_empty" | "not_empty" => Self::non_empty(key),
            "url" => Self::url(key),
            "email" => Self::email(key),
            "port" => Self::port(key),
            other => match other.parse::<ValueType>() {
                Ok(ty) => Self::of_type(key, ty),
                Err(_) => Err(ConfigError::UnknownRule {
                    name: name.to_owned(),
                    available: BUILTIN_RULES.join(", "),
                }),
            },
        }
    }

    /// Replace the default failure message.
    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_owned());
        self
    }

    fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Key path or pattern the rule applies to.
    #[must_use]
    pub fn key(&self) -> &KeyPattern {
        &self.key
    }

    /// What the rule checks.
    #[must_use]
    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Label used in reports (`required`, `port`, `range`, ...).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Custom failure message, if one was set.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidRule {
        key: key.to_owned(),
        message: message.to_owned(),
    }
}
