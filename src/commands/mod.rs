//! CLI command implementations for arscan.
//!
//! Each submodule implements a specific command:
//!
//! - [`verify`] - Check that every file of a drive is retrievable
//! - [`entity`] - Show a drive, folder or file with history and versions
//! - [`query`] - List raw transactions matching owner, id and tag filters

pub mod entity;
pub mod query;
pub mod verify;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use arscan::config::Config;
use arscan::gateway::{HttpGateway, PayloadFetcher};
use arscan::ledger::PaginatedFetcher;

/// Loaded configuration plus the gateway client shared by every command.
pub struct Session {
    pub config: Config,
    gateway: Arc<HttpGateway>,
}

impl Session {
    /// Load and validate configuration, then connect to the gateway.
    ///
    /// `gateway` from the command line wins over both the environment and
    /// the config file.
    pub fn open(config_path: Option<&Path>, gateway: Option<&str>) -> Result<Self> {
        let mut config = Config::load(config_path)?;
        if let Some(url) = gateway {
            config.gateway.url = url.to_string();
        }

        let validation = config.validate()?;
        if validation.has_warnings() {
            for warning in &validation.warnings {
                warn!("{warning}");
            }
        }

        let gateway = HttpGateway::new(&config.gateway.url, config.timeout())
            .with_context(|| format!("Failed to create gateway client for {}", config.gateway.url))?;
        info!(gateway = %gateway.base_url(), "Using gateway");

        Ok(Self {
            config,
            gateway: Arc::new(gateway),
        })
    }

    /// Fetcher configured with the session's page size and retry policy.
    pub fn fetcher(&self) -> PaginatedFetcher {
        PaginatedFetcher::new(self.gateway.clone())
            .with_page_size(self.config.query.page_size)
            .with_retry(self.config.retry_policy())
    }

    pub fn payloads(&self) -> Arc<dyn PayloadFetcher> {
        self.gateway.clone()
    }
}

/// Print rendered output, making sure it ends with a newline.
pub fn emit(output: &str) {
    if output.ends_with('\n') {
        print!("{output}");
    } else {
        println!("{output}");
    }
}
