use std::sync::Arc;

use anyhow::Context;
use log::info;

use crate::{config::Config, upstream::client::HttpBackend};

/// Process-wide state, built once at startup and passed by reference.
pub struct AppContext {
    pub config: Config,
    pub upstream: Arc<HttpBackend>,
}

impl AppContext {
    pub fn init(config: Config) -> anyhow::Result<Self> {
        let upstream =
            HttpBackend::new(&config.backend).with_context(|| "Failed to set up backend client")?;
        info!("using backend at {}", upstream.base_url());

        Ok(Self {
            config,
            upstream: Arc::new(upstream),
        })
    }

    /// The artist to upload as: the given one, else the configured default.
    pub fn artist_address(&self, given: Option<&str>) -> anyhow::Result<String> {
        given
            .map(str::to_string)
            .or_else(|| self.config.upload.default_artist_address.clone())
            .with_context(|| "No artist address given and none configured")
    }

    /// Releases the process-wide state after a one-shot command.
    ///
    /// `serve` never gets here: `rouille::start_server` blocks until the
    /// process is killed, so the gateway exits without this log line.
    pub fn shutdown(self) {
        info!(
            "shutting down, {} upstream client reference(s) left",
            Arc::strong_count(&self.upstream)
        );
    }
}
