use serde_json::json;

use super::*;
use crate::error::ConfigError;

fn mapping(value: Value) -> Mapping {
    match value {
        Value::Object(map) => map,
        other => panic!("expected mapping, got {other}"),
    }
}

#[test]
fn test_required_and_port_each_report_once() {
    let config = mapping(json!({"database": {"port": 70000}}));
    let rules = vec![
        Rule::required("database.host").unwrap(),
        Rule::port("database.port").unwrap(),
    ];

    let errors = validate(&config, &rules);
    assert_eq!(errors.len(), 2);

    assert_eq!(errors[0].key, "database.host");
    assert_eq!(errors[0].rule, "required");
    assert_eq!(errors[0].value, None);

    assert_eq!(errors[1].key, "database.port");
    assert_eq!(errors[1].rule, "port");
    assert_eq!(errors[1].message, "must be a valid port number (1-65535)");
    assert_eq!(errors[1].value, Some(json!(70000)));
}

#[test]
fn test_null_counts_as_present() {
    let config = mapping(json!({"a": null}));
    assert!(validate(&config, &[Rule::required("a").unwrap()]).is_empty());

    let errors = validate(&config, &[Rule::non_empty("a").unwrap()]);
    assert_eq!(errors.len(), 1);
}

#[test]
fn test_absent_key_skipped_by_non_required_rules() {
    let config = Mapping::new();
    let rules = vec![
        Rule::port("server.port").unwrap(),
        Rule::of_type("server.host", ValueType::String).unwrap(),
        Rule::email("admin").unwrap(),
    ];
    assert!(validate(&config, &rules).is_empty());
}

#[test]
fn test_type_rules() {
    let config = mapping(json!({"s": "x", "i": 3, "f": 1.5, "b": true, "l": [1]}));
    let ok = [
        ("s", ValueType::String),
        ("i", ValueType::Integer),
        ("i", ValueType::Number),
        ("f", ValueType::Float),
        ("f", ValueType::Number),
        ("b", ValueType::Bool),
        ("l", ValueType::Sequence),
    ];
    for (key, ty) in ok {
        let rules = [Rule::of_type(key, ty).unwrap()];
        assert!(validate(&config, &rules).is_empty(), "{key} should be {ty}");
    }

    let errors = validate(&config, &[Rule::of_type("f", ValueType::Integer).unwrap()]);
    assert_eq!(errors[0].message, "must be of type integer");

    // Integers are not floats; `number` accepts both.
    let errors = validate(&config, &[Rule::of_type("i", ValueType::Float).unwrap()]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "must be of type float");
    assert_eq!("number".parse::<ValueType>().unwrap(), ValueType::Number);
    assert_eq!(Rule::builtin("i", "float").unwrap().name(), "type");

    // A numeric-looking string is still a string.
    let config = mapping(json!({"port": "8080"}));
    assert_eq!(
        validate(&config, &[Rule::of_type("port", ValueType::Integer).unwrap()]).len(),
        1
    );
}

#[test]
fn test_range_bounds() {
    let config = mapping(json!({"lo": 1, "hi": 10, "mid": 5.5, "text": "5"}));

    let inclusive = [Rule::range("lo", 1.0, 10.0).unwrap(), Rule::range("hi", 1.0, 10.0).unwrap()];
    assert!(validate(&config, &inclusive).is_empty());

    let exclusive = [
        Rule::range_exclusive("lo", 1.0, 10.0).unwrap(),
        Rule::range_exclusive("mid", 1.0, 10.0).unwrap(),
    ];
    let errors = validate(&config, &exclusive);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key, "lo");
    assert_eq!(errors[0].message, "must be strictly between 1 and 10");

    let errors = validate(&config, &[Rule::at_least("mid", 6.0).unwrap()]);
    assert_eq!(errors[0].message, "must be at least 6");

    let errors = validate(&config, &[Rule::range("text", 0.0, 9.0).unwrap()]);
    assert_eq!(errors[0].message, "must be a number");
}

#[test]
fn test_invalid_range_rules() {
    assert!(matches!(
        Rule::range("x", 5.0, 1.0),
        Err(ConfigError::InvalidRule { .. })
    ));
    assert!(Rule::at_most("x", f64::NAN).is_err());
}

#[test]
fn test_length_rule() {
    let config = mapping(json!({"name": "héllo", "n": 5}));
    assert!(validate(&config, &[Rule::length("name", Some(5), Some(5)).unwrap()]).is_empty());

    let errors = validate(&config, &[Rule::length("name", None, Some(3)).unwrap()]);
    assert_eq!(errors[0].message, "must be at most 3 characters long");

    let errors = validate(&config, &[Rule::length("n", Some(1), None).unwrap()]);
    assert_eq!(errors[0].message, "must be a string");

    assert!(Rule::length("name", None, None).is_err());
}

#[test]
fn test_choices_rule() {
    let config = mapping(json!({"level": "trace"}));
    let rule = Rule::choices("level", ["debug", "info", "warn"]).unwrap();
    let errors = validate(&config, &[rule]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, r#"must be one of: "debug", "info", "warn""#);

    assert!(Rule::choices("level", Vec::<Value>::new()).is_err());
}

#[test]
fn test_pattern_rule_anchors_at_start() {
    let config = mapping(json!({"id": "abc-123", "other": "x-abc"}));
    let rules = [
        Rule::pattern("id", "[a-z]+").unwrap(),
        Rule::pattern("other", "[a-z]+-").unwrap(),
        Rule::pattern("other", "abc").unwrap(),
    ];
    let errors = validate(&config, &rules);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "must match pattern abc");

    assert!(matches!(
        Rule::pattern("id", "("),
        Err(ConfigError::InvalidRule { .. })
    ));
}

#[test]
fn test_url_and_email() {
    let config = mapping(json!({
        "good_url": "https://example.com/path?q=1",
        "bad_url": "example.com",
        "good_mail": "ops@example.org",
        "bad_mail": "ops@localhost"
    }));
    let rules = [
        Rule::url("good_url").unwrap(),
        Rule::url("bad_url").unwrap(),
        Rule::email("good_mail").unwrap(),
        Rule::email("bad_mail").unwrap(),
    ];
    let errors = validate(&config, &rules);
    let failed: Vec<(&str, &str)> = errors.iter().map(|e| (e.key.as_str(), e.rule)).collect();
    assert_eq!(failed, vec![("bad_url", "url"), ("bad_mail", "email")]);
}

#[test]
fn test_custom_rule_and_message_override() {
    let config = mapping(json!({"workers": 3}));
    let even = Rule::custom("workers", "must be even", |v| {
        v.as_u64().is_some_and(|n| n.is_multiple_of(2))
    })
    .unwrap();
    let errors = validate(&config, &[even]);
    assert_eq!(errors[0].message, "must be even");
    assert_eq!(errors[0].rule, "custom");

    let rule = Rule::at_least("workers", 4.0).unwrap().with_message("too few workers");
    let errors = validate(&config, &[rule]);
    assert_eq!(errors[0].to_string(), "workers: too few workers (value: 3)");
}

#[test]
fn test_wildcard_rules_expand_over_present_leaves() {
    let config = mapping(json!({
        "services": {"api": {"port": 8080}, "admin": {"port": 0}}
    }));
    let errors = validate(&config, &[Rule::port("services.*.port").unwrap()]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key, "services.admin.port");

    // Nothing under the prefix: no errors.
    assert!(validate(&config, &[Rule::required("missing.*").unwrap()]).is_empty());
}

#[test]
fn test_builtin_lookup() {
    assert_eq!(Rule::builtin("a", "PORT").unwrap().name(), "port");
    assert_eq!(Rule::builtin("a", "int").unwrap().name(), "type");
    assert!(matches!(
        Rule::builtin("a", "telepathy"),
        Err(ConfigError::UnknownRule { .. })
    ));
}

#[test]
fn test_aggregate_error_lists_every_failure() {
    let errors = vec![
        ValidationError {
            key: "database.host".to_owned(),
            rule: "required",
            message: "Required key is missing".to_owned(),
            value: None,
        },
        ValidationError {
            key: "database.port".to_owned(),
            rule: "port",
            message: "must be a valid port number (1-65535)".to_owned(),
            value: Some(json!(70000)),
        },
    ];
    let text = ConfigError::ValidationError { errors }.to_string();
    assert!(text.contains("database.host: Required key is missing"));
    assert!(text.contains("database.port: must be a valid port number (1-65535) (value: 70000)"));
}
