//! `stratum validate`: load, apply rules, report.

use std::process::ExitCode;

use anyhow::Result;
use stratum_config::Config;

use super::{SourceArgs, load_config};
use crate::theme::Theme;

/// Validate the merged configuration against `key:rule` specs.
///
/// Malformed rule specs are reported and skipped rather than aborting the
/// run. Returns exit code 1 when any rule fails.
pub(crate) fn run_validate(sources: &SourceArgs, rules: &[String], stats: bool) -> Result<ExitCode> {
    for path in &sources.files {
        println!("{}", Theme::info(&format!("Loading: {}", path.display())));
    }
    let mut config = load_config(&sources.files, &sources.overrides)?;
    println!("{}", Theme::info(&format!("Environment: {}", config.environment())));

    for spec in rules {
        if let Err(message) = add_rule_spec(&mut config, spec) {
            println!("{}", Theme::warning(&message));
        }
    }

    let errors = config.validate();
    if errors.is_empty() {
        println!("\n{}", Theme::success("Configuration is valid"));
        if stats {
            print_stats(&config);
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "\n{}",
        Theme::error(&format!("Validation failed with {} error(s):", errors.len()))
    );
    for (i, error) in errors.iter().enumerate() {
        println!("{}", Theme::numbered(i, &error.to_string()));
    }
    Ok(ExitCode::FAILURE)
}

/// Parse `key:rule` and register the named built-in rule.
pub(crate) fn add_rule_spec(config: &mut Config, spec: &str) -> Result<(), String> {
    let Some((key, name)) = spec.split_once(':') else {
        return Err(format!("Invalid rule specification: {spec} (expected key:rule)"));
    };
    config
        .add_builtin_rule(key.trim(), name.trim())
        .map_err(|e| format!("Error adding rule {spec}: {e}"))
}

fn print_stats(config: &Config) {
    println!("\n{}", Theme::header("Configuration statistics"));
    println!("  Files loaded: {}", config.loaded_files().len());
    println!("  Total keys:   {}", config.keys().len());
    println!("  Environment:  {}", config.environment());
    if !config.loaded_files().is_empty() {
        println!("  Loaded files:");
        for path in config.loaded_files() {
            println!("    - {}", Theme::dimmed(&path.display().to_string()));
        }
    }
}
