//! `stratum convert`: rewrite a configuration file in another format.

use std::path::Path;

use anyhow::{Context, Result};
use stratum_config::Format;

use super::{OverrideArgs, load_config};
use crate::theme::Theme;

/// Load `input` and write it to `output`: resolved for the active
/// environment, or with `raw` as loaded, environment sections included.
///
/// Without `format`, the output format follows the output extension.
pub(crate) fn run_convert(
    input: &Path,
    output: &Path,
    format: Option<Format>,
    raw: bool,
    overrides: &OverrideArgs,
) -> Result<()> {
    println!("{}", Theme::info(&format!("Loading: {}", input.display())));
    let config = load_config(&[input.to_path_buf()], overrides)?;

    let format = match format {
        Some(f) => f,
        None => Format::from_path(output)?,
    };
    println!(
        "{}",
        Theme::info(&format!("Saving to: {} (format: {format})", output.display()))
    );
    let saved = if raw {
        config.save_raw_to_file(output, Some(format))
    } else {
        config.save_to_file(output, Some(format))
    };
    saved.with_context(|| format!("failed to write {}", output.display()))?;

    println!("{}", Theme::success("Conversion completed"));
    Ok(())
}
