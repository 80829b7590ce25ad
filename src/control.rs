use crate::prelude::*;
use crate::mode::{MODE_KEY, MODE_OPTIONS};

use crate::mode::ExtendedControlMode::*;

pub const MAX_CHARGE_RATE_KEY: &str = "max_charge_rate_w";
pub const MAX_DISCHARGE_RATE_KEY: &str = "max_discharge_rate_w";

pub const EXPORT_LIMIT_ENABLE_OPTIONS: &[(u16, &str)] = &[(0, "Disabled"), (1, "Enabled")];
pub const CONN_STATUS_OPTIONS: &[(u16, &str)] = &[(0, "Disconnected"), (1, "Connected")];

// ControlPoint {{{
/// Writable numeric setpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlPoint {
    MinimumReserve,
    ChargeLimit,
    DischargeLimit,
    GridChargePower,
    GridDischargePower,
    ExportLimitRate,
}

impl ControlPoint {
    pub const ALL: [Self; 6] = [
        Self::MinimumReserve,
        Self::ChargeLimit,
        Self::DischargeLimit,
        Self::GridChargePower,
        Self::GridDischargePower,
        Self::ExportLimitRate,
    ];

    pub fn key(&self) -> &'static str {
        self.descriptor().key
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.key() == key)
    }

    pub fn descriptor(&self) -> &'static NumberDescriptor {
        match self {
            Self::MinimumReserve => &STORAGE_NUMBERS[0],
            Self::ChargeLimit => &STORAGE_NUMBERS[1],
            Self::DischargeLimit => &STORAGE_NUMBERS[2],
            Self::GridChargePower => &STORAGE_NUMBERS[3],
            Self::GridDischargePower => &STORAGE_NUMBERS[4],
            Self::ExportLimitRate => &INVERTER_NUMBERS[0],
        }
    }

    /// Pure function of the latest observed mode. With no mode known only the
    /// always-on points are offered.
    pub fn is_available(&self, mode: Option<ExtendedControlMode>) -> bool {
        match self {
            Self::MinimumReserve | Self::ExportLimitRate => true,
            Self::ChargeLimit => matches!(mode, Some(Charge | ChargeDischarge | Calibrate)),
            Self::DischargeLimit => {
                matches!(mode, Some(Discharge | ChargeDischarge | BlockDischarge))
            }
            Self::GridChargePower => matches!(mode, Some(GridCharge)),
            Self::GridDischargePower => matches!(mode, Some(GridDischarge)),
        }
    }

    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Self::ExportLimitRate => None,
            _ => Some(Capability::Storage),
        }
    }

    pub fn write(&self, value: f64) -> Write {
        match self {
            Self::MinimumReserve => Write::MinimumReserve(value),
            Self::ChargeLimit => Write::ChargeLimit(value),
            Self::DischargeLimit => Write::DischargeLimit(value),
            Self::GridChargePower => Write::GridChargePower(value),
            Self::GridDischargePower => Write::GridDischargePower(value),
            Self::ExportLimitRate => Write::ExportLimitRate(value),
        }
    }

    /// Rate-like points are stored by the device as a percentage of this
    /// ceiling and presented in watts.
    pub fn ceiling_key(&self) -> Option<&'static str> {
        self.descriptor().max_key
    }

    pub fn is_rate(&self) -> bool {
        self.ceiling_key().is_some()
    }

    /// Upper bound for the presented value: the device-reported ceiling once
    /// known, the static default until then.
    pub fn max_value(&self, snapshot: &Snapshot) -> f64 {
        let descriptor = self.descriptor();
        descriptor
            .max_key
            .and_then(|key| snapshot.number(key))
            .filter(|ceiling| *ceiling > 0.0)
            .unwrap_or(descriptor.max)
    }

    pub fn presented_value(&self, raw: f64, snapshot: &Snapshot) -> f64 {
        if self.is_rate() {
            (raw / 100.0 * self.max_value(snapshot)).round()
        } else {
            raw
        }
    }

    /// Inverse of `presented_value`, used for the optimistic snapshot update.
    pub fn raw_value(&self, presented: f64, snapshot: &Snapshot) -> f64 {
        if self.is_rate() {
            presented / self.max_value(snapshot) * 100.0
        } else {
            presented
        }
    }
}

impl std::fmt::Display for ControlPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
} // }}}

// NumberDescriptor {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberMode {
    Box,
    Slider,
}

/// Static presentation metadata for a numeric control point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NumberDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub min: f64,
    /// Used whenever `max_key` is unset or not yet present in the snapshot.
    pub max: f64,
    /// Snapshot key holding a device-reported ceiling that overrides `max`.
    pub max_key: Option<&'static str>,
    pub step: f64,
    pub unit: &'static str,
    pub mode: NumberMode,
}

pub static STORAGE_NUMBERS: [NumberDescriptor; 5] = [
    NumberDescriptor {
        key: "minimum_reserve",
        name: "Minimum reserve",
        min: 5.0,
        max: 100.0,
        max_key: None,
        step: 1.0,
        unit: "%",
        mode: NumberMode::Box,
    },
    NumberDescriptor {
        key: "charge_limit",
        name: "Charge limit",
        min: 0.0,
        max: 10000.0,
        max_key: Some(MAX_CHARGE_RATE_KEY),
        step: 10.0,
        unit: "W",
        mode: NumberMode::Box,
    },
    NumberDescriptor {
        key: "discharge_limit",
        name: "Discharge limit",
        min: 0.0,
        max: 10000.0,
        max_key: Some(MAX_DISCHARGE_RATE_KEY),
        step: 10.0,
        unit: "W",
        mode: NumberMode::Box,
    },
    NumberDescriptor {
        key: "grid_charge_power",
        name: "Grid charge power",
        min: 0.0,
        max: 10000.0,
        max_key: Some(MAX_CHARGE_RATE_KEY),
        step: 10.0,
        unit: "W",
        mode: NumberMode::Box,
    },
    NumberDescriptor {
        key: "grid_discharge_power",
        name: "Grid discharge power",
        min: 0.0,
        max: 10000.0,
        max_key: Some(MAX_DISCHARGE_RATE_KEY),
        step: 10.0,
        unit: "W",
        mode: NumberMode::Box,
    },
];

pub static INVERTER_NUMBERS: [NumberDescriptor; 1] = [NumberDescriptor {
    key: "export_limit_rate",
    name: "Export limit rate",
    min: 0.0,
    max: 100000.0,
    max_key: None,
    step: 10.0,
    unit: "W",
    mode: NumberMode::Box,
}]; // }}}

// SelectPoint {{{
/// Writable enum setpoints, presented as labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SelectPoint {
    ExtControlMode,
    ExportLimitEnable,
    ConnStatus,
}

impl SelectPoint {
    pub const ALL: [Self; 3] = [Self::ExtControlMode, Self::ExportLimitEnable, Self::ConnStatus];

    pub fn key(&self) -> &'static str {
        match self {
            Self::ExtControlMode => MODE_KEY,
            Self::ExportLimitEnable => "export_limit_enable",
            Self::ConnStatus => "conn_status",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ExtControlMode => "Extended control mode",
            Self::ExportLimitEnable => "Export limit enable",
            Self::ConnStatus => "Connection",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.key() == key)
    }

    pub fn options(&self) -> &'static [(u16, &'static str)] {
        match self {
            Self::ExtControlMode => MODE_OPTIONS,
            Self::ExportLimitEnable => EXPORT_LIMIT_ENABLE_OPTIONS,
            Self::ConnStatus => CONN_STATUS_OPTIONS,
        }
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.options().iter().map(|(_, label)| *label).collect()
    }

    pub fn code_for(&self, label: &str) -> Option<u16> {
        self.options()
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(code, _)| *code)
    }

    pub fn label_for(&self, code: u16) -> Option<&'static str> {
        self.options()
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
    }

    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Self::ExtControlMode => Some(Capability::Storage),
            Self::ExportLimitEnable | Self::ConnStatus => None,
        }
    }

    pub fn write(&self, code: u16) -> HubResult<Write> {
        match self {
            Self::ExtControlMode => {
                ExtendedControlMode::from_code(code).map(Write::ExtendedControlMode)
            }
            Self::ExportLimitEnable => Ok(Write::ExportLimitEnable(code != 0)),
            Self::ConnStatus => Ok(Write::ConnStatus(code != 0)),
        }
    }

    /// Presented label for whatever the snapshot holds: a label already, or a
    /// raw code the client left untranslated.
    pub fn current_option(&self, snapshot: &Snapshot) -> Option<String> {
        match snapshot.get(self.key())? {
            Value::Text(label) => Some(label.clone()),
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
                self.label_for(*n as u16).map(str::to_owned)
            }
            Value::Number(_) => None,
        }
    }
}

impl std::fmt::Display for SelectPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
} // }}}
