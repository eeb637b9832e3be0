//! Declarative validation of a resolved configuration.
//!
//! Rules are evaluated in registration order and every failure is collected;
//! a run never stops at the first error. Rules other than `required` only
//! look at keys that are present, and wildcard keys only expand to leaves
//! that exist, so a wildcard with no matches yields no errors.

mod rule;

use std::fmt;

use serde::Serialize;
use serde_json::Value;

pub use rule::{BUILTIN_RULES, Predicate, Rule, RuleKind, ValueType};

use crate::map::{Mapping, deep_get};

/// One failed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Dotted path that failed.
    pub key: String,
    /// Label of the rule that failed (`required`, `range`, `port`, ...).
    pub rule: &'static str,
    /// Human-readable explanation.
    pub message: String,
    /// The offending value; `None` when the key is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)?;
        if let Some(value) = &self.value {
            write!(f, " (value: {value})")?;
        }
        Ok(())
    }
}

/// Check `config` against `rules`.
#[must_use]
pub fn validate(config: &Mapping, rules: &[Rule]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for rule in rules {
        for key in rule.key().expand(config) {
            if let Some(error) = evaluate(rule, &key, deep_get(config, &key)) {
                errors.push(error);
            }
        }
    }
    errors
}

fn evaluate(rule: &Rule, key: &str, value: Option<&Value>) -> Option<ValidationError> {
    let failure = match (rule.kind(), value) {
        (RuleKind::Required, None) => "Required key is missing".to_owned(),
        (_, None) => return None,
        (kind, Some(v)) => kind.check(v)?,
    };

    Some(ValidationError {
        key: key.to_owned(),
        rule: rule.name(),
        message: rule.message().map_or(failure, ToOwned::to_owned),
        value: value.cloned(),
    })
}

#[cfg(test)]
mod tests;
