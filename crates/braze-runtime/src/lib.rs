//! Braze Runtime - orchestration layer for the braze messaging middleware.
//!
//! This crate provides:
//! - Configuration loading (`braze.toml` + `BRAZE_*` environment variables)
//! - Logging configuration
//! - Runtime orchestration ([`BrazeRuntime`])
//!
//! ```ignore
//! use braze_runtime::BrazeRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BrazeRuntime::new();
//!
//!     let kernel = runtime.kernel().clone();
//!     kernel.register_integration(my_integration);
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{BrazeConfig, ConfigLoader, HttpConfig, LogFormat, LogLevel, LogOutput,
    LoggingConfig, load_config};
pub use error::{ConfigError, ConfigResult, RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{BrazeRuntime, RuntimeBuilder};
