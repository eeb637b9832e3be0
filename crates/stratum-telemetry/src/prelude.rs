//! Common imports for binaries that set up logging.
//!
//! ```rust,no_run
//! use stratum_telemetry::prelude::*;
//! ```

pub use crate::{LogConfig, LogFormat, LogTarget, TelemetryError, TelemetryResult, setup_logging};
