//! Typed configuration for Stagecoach.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict parsing (fails on unknown fields)
//! - Layered loading (defaults → file → env)
//!
//! # Sections
//!
//! - [`LoggingConfig`] - log level, format and decoration
//! - [`RequestIdConfig`] - request id header and trust of incoming ids
//! - [`CorsConfig`] - CORS preflight policy
//! - [`ErrorsConfig`] - how failures are rendered to clients
//!
//! # Example
//!
//! ```no_run
//! use stagecoach_config::ConfigLoader;
//!
//! # fn main() -> Result<(), stagecoach_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("stagecoach.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("STAGECOACH")
//!     .load()?;
//!
//! println!("request ids travel in {}", config.request_id.header);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [request_id]
//! header = "x-request-id"
//! trust_incoming = false
//!
//! [cors]
//! enabled = true
//! allowed_origins = ["https://app.example.com"]
//! allow_credentials = true
//! max_age_secs = 3600
//!
//! [errors]
//! expose_internal_errors = false
//! ```

#![doc(html_root_url = "https://docs.rs/stagecoach-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{StagecoachConfig, StagecoachConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{CorsConfig, ErrorsConfig, LogFormat, LoggingConfig, RequestIdConfig};
