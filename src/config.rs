use crate::prelude::*;

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::time::Duration;

/// Shortest poll interval and client timeout the device tolerates.
pub const MIN_INTERVAL: Duration = Duration::from_secs(3);

/// Meters are numbered 1..=255 in snapshot keys (`m{n}_`).
pub const MAX_METERS: usize = u8::MAX as usize;

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub name: String,
    pub host: String,

    #[serde(default = "Config::default_port")]
    pub port: u16,

    #[serde(default = "Config::default_inverter_unit_id")]
    pub inverter_unit_id: u8,

    /// Modbus unit ids of the smart meters, in the order they are numbered
    /// (`m1_`, `m2_`, ...).
    #[serde(default = "Config::default_meter_unit_ids")]
    pub meter_unit_ids: Vec<u8>,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_scan_interval")]
    pub scan_interval: Duration,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,

    /// Refuse every write command; polling continues.
    #[serde(default)]
    pub read_only: bool,
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        info!("Reading configuration from {}", file);
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("config.rs:error reading {}: {}", file, err))?;

        let config = Self::from_yaml(&content)?;

        info!("Configuration loaded successfully:");
        info!("  Name: {}", config.name);
        info!("  Host: {}:{}", config.host, config.port);
        info!("  Inverter unit id: {}", config.inverter_unit_id);
        info!("  Meter unit ids: {:?}", config.meter_unit_ids);
        info!("  Scan interval: {}s", config.scan_interval().as_secs());
        info!("  Read Only: {}", config.read_only);

        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;

        if config.name.trim().is_empty() {
            bail!("config.rs:name must not be empty");
        }
        if config.host.trim().is_empty() {
            bail!("config.rs:host must not be empty");
        }
        if config.meter_unit_ids.len() > MAX_METERS {
            bail!(
                "config.rs:at most {} meter_unit_ids supported, got {}",
                MAX_METERS,
                config.meter_unit_ids.len()
            );
        }

        Ok(config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn inverter_unit_id(&self) -> u8 {
        self.inverter_unit_id
    }

    pub fn meter_unit_ids(&self) -> &[u8] {
        &self.meter_unit_ids
    }

    pub fn scan_interval(&self) -> Duration {
        self.scan_interval.max(MIN_INTERVAL)
    }

    /// Transport timeout for the register client: one second under the scan
    /// interval so a hung read can't overlap the next tick.
    pub fn client_timeout(&self) -> Duration {
        self.scan_interval
            .saturating_sub(Duration::from_secs(1))
            .max(MIN_INTERVAL)
    }

    /// Everything a `RegisterClient` needs to reach the device.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            host: self.host.clone(),
            port: self.port,
            inverter_unit_id: self.inverter_unit_id,
            meter_unit_ids: self.meter_unit_ids.clone(),
            timeout: self.client_timeout(),
        }
    }

    pub fn loglevel(&self) -> &str {
        &self.loglevel
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn hub_id(&self) -> String {
        format!(
            "{}_{}",
            self.name.to_lowercase(),
            self.host.to_lowercase().replace('.', "")
        )
    }

    pub fn entity_prefix(&self) -> String {
        format!("fm_{}_", self.name.to_lowercase())
    }

    fn default_port() -> u16 {
        502
    }

    fn default_inverter_unit_id() -> u8 {
        1
    }

    fn default_meter_unit_ids() -> Vec<u8> {
        vec![200]
    }

    fn default_scan_interval() -> Duration {
        Duration::from_secs(10)
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
