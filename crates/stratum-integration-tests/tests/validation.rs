//! Integration tests for rule evaluation over loaded files.

mod common;

use common::{ConfigDir, env};
use serde_json::json;
use stratum_config::{Config, ConfigError, EnvOverrides, Rule, ValueType};

#[test]
fn test_missing_host_and_bad_port_give_two_errors() {
    let dir = ConfigDir::new();
    let path = dir.write("app.yaml", "database:\n  port: 70000\n");

    let mut config = Config::new();
    config.load_file(&path).unwrap();
    config.add_rule(Rule::required("database.host").unwrap());
    config.add_rule(Rule::port("database.port").unwrap());

    let errors = config.validate();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].key, "database.host");
    assert_eq!(errors[0].rule, "required");
    assert_eq!(errors[1].key, "database.port");
    assert_eq!(errors[1].value, Some(json!(70000)));

    match config.validate_or_raise() {
        Err(ConfigError::ValidationError { errors }) => assert_eq!(errors.len(), 2),
        other => panic!("expected aggregate validation error, got {other:?}"),
    }
    let message = config.validate_or_raise().unwrap_err().to_string();
    assert!(message.contains("database.host"));
    assert!(message.contains("database.port"));
}

#[test]
fn test_env_override_can_fix_validation() {
    let dir = ConfigDir::new();
    let path = dir.write("app.toml", "[server]\nport = 0\n");

    let mut config = Config::new();
    config.load_file(&path).unwrap();
    config.add_builtin_rule("server.port", "port").unwrap();
    assert_eq!(config.validate().len(), 1);

    config.apply_env_overrides(
        &env(&[("CONFIG_SERVER_PORT", "8443")]),
        &EnvOverrides::default(),
    );
    assert!(config.validate().is_empty());
}

#[test]
fn test_wildcard_rules_over_services() {
    let dir = ConfigDir::new();
    let path = dir.write(
        "services.yaml",
        "services:\n  api:\n    port: 8080\n    url: https://api.example.com\n  worker:\n    port: 99999\n    url: not-a-url\n",
    );

    let mut config = Config::new();
    config.load_file(&path).unwrap();
    config.add_rule(Rule::port("services.*.port").unwrap());
    config.add_rule(Rule::url("services.*.url").unwrap());
    config.add_rule(Rule::of_type("services.*.missing", ValueType::String).unwrap());

    let errors = config.validate();
    let keys: Vec<&str> = errors.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["services.worker.port", "services.worker.url"]);
}

#[test]
fn test_rules_survive_reset() {
    let mut config = Config::new();
    config.add_rule(Rule::required("name").unwrap());
    config.set("name", "svc").unwrap();
    assert!(config.validate().is_empty());

    config.reset();
    assert_eq!(config.rules().len(), 1);
    assert_eq!(config.validate().len(), 1);
}
