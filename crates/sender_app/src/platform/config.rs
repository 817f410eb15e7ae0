use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use sender_core::DEFAULT_COUNTRY_CODE;
use sender_engine::DeliverySettings;
use serde::{Deserialize, Serialize};

use super::cli::Cli;
use super::logging::LogDestination;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub default_country_code: String,
    pub max_upload_bytes: usize,
    pub log: LogDestination,
    pub delays: DelayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
            log: LogDestination::default(),
            delays: DelayConfig::default(),
        }
    }
}

/// Delay overrides in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    pub open: f64,
    pub send: f64,
    pub image: f64,
    pub pre_attach: f64,
    pub typing: f64,
    pub pause_poll: f64,
    pub countdown: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        let settings = DeliverySettings::default();
        Self {
            open: settings.open_delay.as_secs_f64(),
            send: settings.send_delay.as_secs_f64(),
            image: settings.image_delay.as_secs_f64(),
            pre_attach: settings.pre_attach_delay.as_secs_f64(),
            typing: settings.typing_delay.as_secs_f64(),
            pause_poll: settings.pause_poll.as_secs_f64(),
            countdown: settings.start_countdown.as_secs(),
        }
    }
}

impl DelayConfig {
    pub fn to_settings(&self) -> DeliverySettings {
        DeliverySettings {
            open_delay: seconds(self.open),
            send_delay: seconds(self.send),
            image_delay: seconds(self.image),
            pre_attach_delay: seconds(self.pre_attach),
            typing_delay: seconds(self.typing),
            // A zero poll would spin while paused.
            pause_poll: seconds(self.pause_poll).max(Duration::from_millis(10)),
            start_countdown: Duration::from_secs(self.countdown),
        }
    }
}

/// Negative or non-finite values collapse to zero.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl AppConfig {
    /// Loads the config file if given, then applies CLI overrides.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(dir) = &cli.upload_dir {
            self.upload_dir = dir.clone();
        }
        if let Some(code) = &cli.country_code {
            self.default_country_code = code.clone();
        }
        if let Some(log) = cli.log {
            self.log = log;
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
