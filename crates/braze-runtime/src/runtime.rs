//! Runtime orchestration.
//!
//! [`BrazeRuntime`] wires configuration, logging, the kernel and the
//! webhook transport together, then waits for shutdown.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use braze_runtime::BrazeRuntime;
//!
//! // Simplest way - auto-loads braze.toml from the current directory
//! let runtime = BrazeRuntime::new();
//!
//! // Custom configuration path
//! let runtime = BrazeRuntime::builder()
//!     .config_file("config/braze.toml")
//!     .build()?;
//!
//! runtime.kernel().register_integration(my_integration);
//! runtime.run().await?;
//! ```

use std::sync::Arc;

use tokio::signal;
use tracing::info;

use braze_core::Kernel;
use braze_transport::WebhookServer;

use crate::config::{BrazeConfig, ConfigLoader};
use crate::error::RuntimeResult;
use crate::logging;

/// The braze runtime: a configured kernel plus process-level plumbing.
pub struct BrazeRuntime {
    config: BrazeConfig,
    kernel: Kernel,
}

impl BrazeRuntime {
    /// Creates a runtime with automatic configuration loading.
    ///
    /// Searches for `braze.toml` in the current directory and falls back to
    /// defaults if loading fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new().load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config ({e}), using defaults");
            BrazeConfig::default()
        });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration.
    ///
    /// Initializes logging and builds a kernel; the webhook transport is
    /// attached when `http.enabled` is set.
    pub fn from_config(config: &BrazeConfig) -> Self {
        logging::init_from_config(&config.logging);

        let mut kernel = Kernel::builder();
        if config.http.enabled {
            kernel = kernel.http_transport(Arc::new(WebhookServer::new(config.http.addr())));
        }

        info!(
            log_level = %config.logging.level.as_str(),
            http_enabled = config.http.enabled,
            "runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            kernel: kernel.build(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &BrazeConfig {
        &self.config
    }

    /// Returns the kernel; clone it to register and listen.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Runs until a shutdown signal is received.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("braze runtime is now running. Press Ctrl+C to stop.");
        wait_for_shutdown().await;
        info!("runtime stopped");
        Ok(())
    }

    /// Runs until the given future resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: std::future::Future<Output = ()>,
    {
        shutdown.await;
        info!("runtime stopped");
        Ok(())
    }
}

impl Default for BrazeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to register SIGTERM handler");
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`BrazeRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.loader = self.loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: BrazeConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> RuntimeResult<BrazeRuntime> {
        let config = self.loader.load()?;
        Ok(BrazeRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
