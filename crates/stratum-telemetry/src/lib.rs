//! Stratum Telemetry - logging setup for binaries built on `stratum-config`.
//!
//! The configuration library only emits `tracing` events. Binaries call
//! [`setup_logging`] once at startup to decide where those events go.
//!
//! # Example
//!
//! ```rust,no_run
//! use stratum_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), stratum_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("stratum_config=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_logging};
