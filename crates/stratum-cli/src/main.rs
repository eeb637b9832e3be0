//! Stratum CLI - validate, inspect and convert layered configuration.
//!
//! Every command loads the given files in order, selects an environment
//! (`--env`, else `$APP_ENV`, else development) and applies `CONFIG_*`
//! environment-variable overrides (`--env-prefix`, `--no-env-overrides`)
//! before doing its work.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use stratum_config::{Format, ShowFormat};
use stratum_telemetry::{LogConfig, LogFormat, setup_logging};

mod commands;
mod theme;

use commands::show::View;
use commands::{OverrideArgs, SourceArgs, convert, keys, show, validate};
use theme::Theme;

/// Stratum - layered configuration tool
#[derive(Parser)]
#[command(name = "stratum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration files against rules
    Validate {
        #[command(flatten)]
        sources: SourceArgs,

        /// Rule as key:rule (e.g. database.port:port); repeatable
        #[arg(short, long = "rule", value_name = "KEY:RULE")]
        rules: Vec<String>,

        /// Print statistics when validation succeeds
        #[arg(long)]
        stats: bool,
    },

    /// Print the effective configuration
    Show {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format: json, yaml, toml or flat
        #[arg(short, long, default_value = "json")]
        format: ShowFormat,

        /// Only show the value at this dotted key
        #[arg(short, long)]
        key: Option<String>,

        /// Print flat lines annotated with the layer that set each value
        #[arg(long = "sources", conflicts_with = "format")]
        with_sources: bool,

        /// Show the loaded documents unresolved, environment sections included
        #[arg(long, conflicts_with = "with_sources")]
        raw: bool,
    },

    /// Convert a configuration file to another format
    Convert {
        /// Input file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Output format (defaults to the output file extension)
        #[arg(short, long)]
        format: Option<Format>,

        /// Write the loaded documents unresolved, environment sections included
        #[arg(long)]
        raw: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// List configuration keys
    Keys {
        #[command(flatten)]
        sources: SourceArgs,

        /// Only list keys matching this glob (`*` one segment, `**` any depth)
        #[arg(short, long)]
        pattern: Option<String>,

        /// Print values next to keys
        #[arg(long)]
        values: bool,

        /// List keys of the loaded documents, environment sections included
        #[arg(long)]
        raw: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::for_verbosity(cli.verbose)
        .with_format(LogFormat::Compact)
        .without_timestamps();
    if let Ok(directives) = std::env::var("RUST_LOG") {
        log_config = log_config.with_directives_from(&directives);
    }
    if let Err(e) = setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            ExitCode::FAILURE
        },
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Validate {
            sources,
            rules,
            stats,
        } => validate::run_validate(&sources, &rules, stats),
        Commands::Show {
            sources,
            format,
            key,
            with_sources,
            raw,
        } => {
            let view = match (raw, with_sources) {
                (true, _) => View::Raw(format),
                (false, true) => View::Sources,
                (false, false) => View::Resolved(format),
            };
            show::run_show(&sources, view, key.as_deref())?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Convert {
            input,
            output,
            format,
            raw,
            overrides,
        } => {
            convert::run_convert(&input, &output, format, raw, &overrides)?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Keys {
            sources,
            pattern,
            values,
            raw,
        } => {
            keys::run_keys(&sources, pattern.as_deref(), values, raw)?;
            Ok(ExitCode::SUCCESS)
        },
    }
}
