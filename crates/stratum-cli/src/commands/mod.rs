//! Subcommand implementations and the loading steps they share.

pub(crate) mod convert;
pub(crate) mod keys;
pub(crate) mod show;
pub(crate) mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use stratum_config::env::DEFAULT_PREFIX;
use stratum_config::{Config, DEFAULT_ENV_VAR, EnvOverrides, collect_env_vars};
use tracing::debug;

/// Environment selection and env-var overrides, shared by every command.
#[derive(Debug, Clone, Args)]
pub(crate) struct OverrideArgs {
    /// Active environment (defaults to `$APP_ENV`, then development)
    #[arg(short = 'e', long = "env", value_name = "NAME")]
    pub(crate) environment: Option<String>,

    /// Prefix of environment variables applied as overrides
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_PREFIX)]
    pub(crate) env_prefix: String,

    /// Do not apply environment-variable overrides
    #[arg(long, conflicts_with = "env_prefix")]
    pub(crate) no_env_overrides: bool,
}

/// One or more configuration files plus override options.
#[derive(Debug, Clone, Args)]
pub(crate) struct SourceArgs {
    /// Configuration files, lowest precedence first
    #[arg(required = true, value_name = "FILE")]
    pub(crate) files: Vec<PathBuf>,

    #[command(flatten)]
    pub(crate) overrides: OverrideArgs,
}

/// Load `files` in order, then select the environment and apply overrides.
pub(crate) fn load_config(files: &[PathBuf], overrides: &OverrideArgs) -> Result<Config> {
    let mut config = Config::new();
    for path in files {
        load_one(&mut config, path)?;
    }
    apply_overrides(&mut config, overrides)?;
    Ok(config)
}

fn load_one(config: &mut Config, path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    config
        .load_file(path)
        .with_context(|| format!("failed to load {}", path.display()))
}

fn apply_overrides(config: &mut Config, overrides: &OverrideArgs) -> Result<()> {
    let vars = collect_env_vars();

    match &overrides.environment {
        Some(name) => config
            .set_environment(name)
            .with_context(|| format!("cannot select environment '{name}'"))?,
        None => {
            let detected = config.detect_environment(&vars, DEFAULT_ENV_VAR);
            debug!(environment = detected, "using detected environment");
        },
    }

    if !overrides.no_env_overrides {
        let prefix = &overrides.env_prefix;
        let applied = config.apply_env_overrides(&vars, &EnvOverrides::new(prefix));
        debug!(prefix = %prefix, applied, "applied env overrides");
    }
    Ok(())
}
