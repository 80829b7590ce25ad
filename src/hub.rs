use crate::prelude::*;
use crate::control::{INVERTER_NUMBERS, STORAGE_NUMBERS};
use crate::coordinator::Coordinator;
use crate::version::{check_client_version, MIN_CLIENT_VERSION};

use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceRole {
    Inverter,
    Storage,
    /// 1-based meter number.
    Meter(u8),
}

impl DeviceRole {
    pub fn key_prefix(&self) -> String {
        match self {
            Self::Inverter => "i_".to_owned(),
            Self::Storage => "s_".to_owned(),
            Self::Meter(n) => format!("m{}_", n),
        }
    }

    fn suffix(&self) -> String {
        match self {
            Self::Inverter => "inverter".to_owned(),
            Self::Storage => "battery_storage".to_owned(),
            Self::Meter(n) => format!("meter{}", n),
        }
    }
}

/// Identity of one physical device behind the hub, for grouping entities.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub sw_version: Option<String>,
}

/// One device session: the connected client, its single busy flag, the
/// coordinator and the snapshot it maintains.
pub struct Hub<C> {
    config: Config,
    client: Arc<C>,
    guard: BusyGuard,
    coordinator: Coordinator<C>,
    channels: Channels,
}

impl<C> Clone for Hub<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            client: Arc::clone(&self.client),
            guard: self.guard.clone(),
            coordinator: self.coordinator.clone(),
            channels: self.channels.clone(),
        }
    }
}

impl<C: RegisterClient> Hub<C> {
    /// Builds the register client from `config` and hands it to `init`.
    pub async fn connect(config: Config, channels: Channels) -> HubResult<Self> {
        let client = C::from_settings(config.connection_settings())
            .map_err(|err| HubError::not_ready(HubError::connectivity("create client", err)))?;
        Self::init(config, Arc::new(client), channels).await
    }

    /// Checks the client library version, connects, discovers capabilities
    /// and runs the first refresh. Nothing is read from the device when the
    /// version check fails; the client is closed again on every other
    /// failure.
    pub async fn init(config: Config, client: Arc<C>, channels: Channels) -> HubResult<Self> {
        check_client_version(client.library_version().as_deref(), MIN_CLIENT_VERSION)?;

        info!(
            "connecting to {} at {}:{}",
            config.name(),
            config.host(),
            config.port()
        );
        let connected = match client.connect().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(anyhow!("device at {} could not be identified", config.host())),
            Err(err) => Err(err),
        };
        if let Err(err) = connected {
            client.close().await;
            return Err(HubError::not_ready(HubError::connectivity("connect", err)));
        }

        let guard = BusyGuard::new();
        let coordinator = Coordinator::new(&config, Arc::clone(&client), guard.clone(), channels.clone());
        let capabilities = coordinator.capabilities();
        info!(
            "capabilities: meter={} mppt={} storage={}",
            capabilities.meter_configured, capabilities.mppt_configured, capabilities.storage_configured
        );

        let hub = Self {
            config,
            client,
            guard,
            coordinator,
            channels,
        };

        match hub.coordinator.refresh().await {
            Ok(Outcome::Ran(_)) => {}
            Ok(Outcome::Skipped) => warn!("first refresh skipped, hub busy"),
            Err(err) => {
                hub.close().await;
                return Err(HubError::not_ready(err));
            }
        }

        Ok(hub)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn coordinator(&self) -> &Coordinator<C> {
        &self.coordinator
    }

    pub fn capabilities(&self) -> Capabilities {
        self.coordinator.capabilities()
    }

    pub fn hub_id(&self) -> String {
        self.config.hub_id()
    }

    pub fn unique_id(&self, key: &str) -> String {
        format!("{}_{}", self.hub_id(), key)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.coordinator.store().current()
    }

    pub fn last_update_success(&self) -> bool {
        self.coordinator.store().last_update_success()
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    // Presentation {{{

    /// Whether a control point or select is currently offered. Recomputed
    /// from the snapshot on every call.
    pub fn available(&self, key: &str) -> bool {
        let capabilities = self.capabilities();

        if let Some(point) = ControlPoint::from_key(key) {
            let supported = point
                .required_capability()
                .map_or(true, |c| capabilities.has(c));
            return supported && point.is_available(self.coordinator.store().extended_control_mode());
        }
        if let Some(select) = SelectPoint::from_key(key) {
            return select
                .required_capability()
                .map_or(true, |c| capabilities.has(c));
        }

        false
    }

    /// Presented value of a numeric control point, `None` until the device
    /// has reported it.
    pub fn number_value(&self, key: &str) -> Option<f64> {
        let point = ControlPoint::from_key(key)?;
        let snapshot = self.snapshot();
        let raw = snapshot.number(point.key())?;
        Some(point.presented_value(raw, &snapshot))
    }

    pub fn number_max(&self, key: &str) -> Option<f64> {
        let point = ControlPoint::from_key(key)?;
        Some(point.max_value(&self.snapshot()))
    }

    pub fn current_option(&self, key: &str) -> Option<String> {
        SelectPoint::from_key(key)?.current_option(&self.snapshot())
    }

    /// Number descriptors the device supports; storage points only when a
    /// battery was discovered.
    pub fn number_descriptors(&self) -> Vec<&'static NumberDescriptor> {
        let mut descriptors = Vec::new();
        if self.capabilities().storage_configured {
            descriptors.extend(STORAGE_NUMBERS.iter());
        }
        descriptors.extend(INVERTER_NUMBERS.iter());
        descriptors
    }

    pub fn select_points(&self) -> Vec<SelectPoint> {
        let capabilities = self.capabilities();
        SelectPoint::ALL
            .iter()
            .copied()
            .filter(|s| s.required_capability().map_or(true, |c| capabilities.has(c)))
            .collect()
    }

    pub fn device_info(&self, role: DeviceRole) -> DeviceInfo {
        let snapshot = self.snapshot();
        let prefix = role.key_prefix();
        let field = |name: &str| {
            snapshot
                .get(&format!("{}{}", prefix, name))
                .map(|v| v.to_string())
        };

        let manufacturer = field("manufacturer");
        let model = field("model");
        let name = match (&manufacturer, &model) {
            (Some(manufacturer), Some(model)) => format!("{} {}", manufacturer, model),
            _ => format!("{} {}", self.config.name(), role.suffix()),
        };

        DeviceInfo {
            identifier: format!("{}_{}", self.hub_id(), role.suffix()),
            name,
            manufacturer,
            model,
            serial: field("serial"),
            sw_version: field("sw_version"),
        }
    }

    pub fn devices(&self) -> Vec<DeviceInfo> {
        let capabilities = self.capabilities();
        let mut roles = vec![DeviceRole::Inverter];
        if capabilities.storage_configured {
            roles.push(DeviceRole::Storage);
        }
        if capabilities.meter_configured {
            let meters = self.coordinator.meter_unit_ids().len();
            roles.extend((1..=u8::MAX).take(meters).map(DeviceRole::Meter));
        }

        roles.into_iter().map(|role| self.device_info(role)).collect()
    }
    // }}}

    // Commands {{{
    pub async fn refresh(&self) -> HubResult<Outcome<Snapshot>> {
        self.coordinator.refresh().await
    }

    pub async fn set_mode(&self, code: u16) -> HubResult<Outcome<()>> {
        self.process_command(Command::SetMode(code)).await
    }

    pub async fn set_point(&self, key: &str, value: f64) -> HubResult<Outcome<()>> {
        self.process_command(Command::SetPoint(key.to_owned(), value))
            .await
    }

    pub async fn select_option(&self, key: &str, label: &str) -> HubResult<Outcome<()>> {
        self.process_command(Command::SelectOption(key.to_owned(), label.to_owned()))
            .await
    }

    pub async fn process_command(&self, command: Command) -> HubResult<Outcome<()>> {
        self.coordinator.process_command(command).await
    }
    // }}}

    /// Runs the command receiver until `stop()`.
    pub async fn start(&self) -> Result<()> {
        self.coordinator.start().await
    }

    pub fn stop(&self) {
        self.coordinator.stop();
    }

    /// Guarded reconnect. Anything but a confirmed connection is `false`;
    /// a busy hub reports the outcome of the last poll instead.
    pub async fn test_connection(&self) -> bool {
        match self.guard.run("test_connection", self.client.connect()).await {
            Ok(Outcome::Ran(connected)) => {
                if !connected {
                    warn!("connection test: device could not be identified");
                }
                connected
            }
            Ok(Outcome::Skipped) => self.last_update_success(),
            Err(_) => false,
        }
    }

    pub async fn close(&self) {
        info!("closing connection to {}", self.config.host());
        self.client.close().await;
    }
}
