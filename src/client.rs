use crate::prelude::*;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Values decoded from one register group, keyed by snapshot key.
pub type RegisterData = HashMap<String, Value>;

// RegisterGroup {{{
/// Register groups in the order a poll cycle reads them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterGroup {
    InverterData,
    InverterStatus,
    InverterModelSettings,
    InverterControls,
    /// `meter` is the 1-based position of `unit_id` in the configured meter
    /// list; the client prefixes the group's keys with `m{meter}_`.
    MeterData { unit_id: u8, meter: u8 },
    MpptData,
    ExportLimitData,
    StorageData,
}

impl RegisterGroup {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InverterData => "inverter_data",
            Self::InverterStatus => "inverter_status",
            Self::InverterModelSettings => "inverter_model_settings",
            Self::InverterControls => "inverter_controls",
            Self::MeterData { .. } => "meter_data",
            Self::MpptData => "mppt_data",
            Self::ExportLimitData => "export_limit_data",
            Self::StorageData => "storage_data",
        }
    }

    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Self::MeterData { .. } => Some(Capability::Meter),
            Self::MpptData => Some(Capability::Mppt),
            Self::StorageData => Some(Capability::Storage),
            _ => None,
        }
    }
}

impl std::fmt::Display for RegisterGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MeterData { unit_id, .. } => write!(f, "{}({})", self.name(), unit_id),
            _ => write!(f, "{}", self.name()),
        }
    }
} // }}}

// Capabilities {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Meter,
    Mppt,
    Storage,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Meter => "meter",
            Self::Mppt => "mppt",
            Self::Storage => "storage",
        }
    }
}

/// What device discovery found at connect time. Fixed for the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub meter_configured: bool,
    pub mppt_configured: bool,
    pub storage_configured: bool,
}

impl Capabilities {
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Meter => self.meter_configured,
            Capability::Mppt => self.mppt_configured,
            Capability::Storage => self.storage_configured,
        }
    }

    pub fn ensure(&self, capability: Option<Capability>, key: &str) -> HubResult<()> {
        match capability {
            Some(c) if !self.has(c) => Err(HubError::CapabilityMismatch {
                key: key.to_owned(),
                capability: c.name(),
            }),
            _ => Ok(()),
        }
    }
} // }}}

// Write {{{
/// One device write. Rate-like values are in watts, `MinimumReserve` in
/// percent; conversion to register units is the client's job.
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    ExtendedControlMode(ExtendedControlMode),
    MinimumReserve(f64),
    ChargeLimit(f64),
    DischargeLimit(f64),
    GridChargePower(f64),
    GridDischargePower(f64),
    /// Applies the export limit rate and enables limiting in one go.
    ExportLimitRate(f64),
    ExportLimitEnable(bool),
    ConnStatus(bool),
}

impl Write {
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Self::ExportLimitRate(_) | Self::ExportLimitEnable(_) | Self::ConnStatus(_) => None,
            _ => Some(Capability::Storage),
        }
    }
} // }}}

/// Where and how a register client talks to the device, taken from `Config`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub inverter_unit_id: u8,
    pub meter_unit_ids: Vec<u8>,
    /// Per-transaction timeout.
    pub timeout: Duration,
}

/// Typed access to the device's register groups. Implementations own their
/// transport and its timeouts; every method may suspend on I/O.
#[async_trait]
pub trait RegisterClient: Send + Sync {
    fn from_settings(settings: ConnectionSettings) -> Result<Self>
    where
        Self: Sized;

    /// Connects and runs device discovery. `Ok(false)` means the device
    /// answered but could not be identified.
    async fn connect(&self) -> Result<bool>;

    async fn close(&self);

    async fn read(&self, group: RegisterGroup) -> Result<RegisterData>;

    async fn write(&self, write: Write) -> Result<()>;

    /// Only meaningful after a successful `connect`.
    fn capabilities(&self) -> Capabilities;

    /// Version of the underlying Modbus library, if it can be determined.
    fn library_version(&self) -> Option<String>;
}
