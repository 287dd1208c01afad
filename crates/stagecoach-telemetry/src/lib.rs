//! Logging setup and log conventions for Stagecoach.
//!
//! - [`init_logging`] installs a `tracing-subscriber` registry with JSON or
//!   pretty output and an [`EnvFilter`](tracing_subscriber::EnvFilter)
//! - [`fields`] names the structured fields pipeline events carry
//! - `log_*` macros emit the pipeline's request, failure and hook events
//!
//! # Example
//!
//! ```rust,ignore
//! use stagecoach_config::ConfigLoader;
//! use stagecoach_telemetry::{init_logging, LogConfig};
//!
//! let config = ConfigLoader::new().with_env_prefix("STAGECOACH").load()?;
//! init_logging(&LogConfig::from(&config.logging))?;
//! ```

#![doc(html_root_url = "https://docs.rs/stagecoach-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

#[doc(hidden)]
pub use tracing;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
