//! `stratum show`: print the effective configuration.

use anyhow::Result;
use stratum_config::ShowFormat;

use super::{SourceArgs, load_config};

/// Which view of the configuration `show` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    /// Resolved values in the requested format.
    Resolved(ShowFormat),
    /// Loaded documents with environment sections, unresolved.
    Raw(ShowFormat),
    /// Resolved flat lines annotated with their source.
    Sources,
}

/// Print the configuration, optionally only the section at `key`.
pub(crate) fn run_show(sources: &SourceArgs, view: View, key: Option<&str>) -> Result<()> {
    let config = load_config(&sources.files, &sources.overrides)?;
    let rendered = match view {
        View::Resolved(format) => config.show(format, key)?,
        View::Raw(format) => config.show_raw(format, key)?,
        View::Sources => config.resolved().show_annotated(key)?,
    };
    print!("{rendered}");
    Ok(())
}
