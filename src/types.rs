use std::fmt;

use serde::{Deserialize, Serialize};

/// HAP `CurrentHeatingCoolingState`. Discriminants are the HAP wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CurrentHeatingCoolingState {
    Off = 0,
    Heat = 1,
    Cool = 2,
}

/// HAP `TargetHeatingCoolingState`. Ordered so `Off < Heat < Cool < Auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum TargetHeatingCoolingState {
    Off = 0,
    #[default]
    Heat = 1,
    Cool = 2,
    Auto = 3,
}

impl TargetHeatingCoolingState {
    pub const ALL: [TargetHeatingCoolingState; 4] = [
        TargetHeatingCoolingState::Off,
        TargetHeatingCoolingState::Heat,
        TargetHeatingCoolingState::Cool,
        TargetHeatingCoolingState::Auto,
    ];

    pub fn as_hap(&self) -> u8 {
        *self as u8
    }

    pub fn from_hap(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_hap() == value)
    }

    pub fn as_config_str(&self) -> &'static str {
        match self {
            TargetHeatingCoolingState::Off => "OFF",
            TargetHeatingCoolingState::Heat => "HEAT",
            TargetHeatingCoolingState::Cool => "COOL",
            TargetHeatingCoolingState::Auto => "AUTO",
        }
    }
}

impl CurrentHeatingCoolingState {
    pub fn as_hap(&self) -> u8 {
        *self as u8
    }
}

impl From<CurrentHeatingCoolingState> for TargetHeatingCoolingState {
    fn from(state: CurrentHeatingCoolingState) -> Self {
        match state {
            CurrentHeatingCoolingState::Off => TargetHeatingCoolingState::Off,
            CurrentHeatingCoolingState::Heat => TargetHeatingCoolingState::Heat,
            CurrentHeatingCoolingState::Cool => TargetHeatingCoolingState::Cool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TemperatureDisplayUnits {
    #[default]
    Celsius = 0,
    Fahrenheit = 1,
}

impl TemperatureDisplayUnits {
    pub fn from_hap(value: u8) -> Option<Self> {
        match value {
            0 => Some(TemperatureDisplayUnits::Celsius),
            1 => Some(TemperatureDisplayUnits::Fahrenheit),
            _ => None,
        }
    }
}

/// Where the heating/cooling state of a Domoticz device is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatingStateSource {
    /// Selector switch, levels 0/10/20/30.
    #[default]
    Level,
    /// On/Off switch; "On" means heating.
    Status,
}

/// What to report when a device level falls outside the known ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownStatePolicy {
    #[default]
    Strict,
    /// Report OFF and log a warning.
    FallbackOff,
}

/// One Domoticz device, as parsed from `result[0]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceReading {
    pub idx: u32,
    pub name: Option<String>,
    pub level: Option<i64>,
    pub status: Option<String>,
    pub temperature: Option<f64>,
    pub set_point: Option<f64>,
}

/// Reply to a command that Domoticz accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub status: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    CurrentHeatingCoolingState,
    TargetHeatingCoolingState,
    CurrentTemperature,
    TargetTemperature,
    TemperatureDisplayUnits,
}

impl Characteristic {
    pub const THERMOSTAT: [Characteristic; 5] = [
        Characteristic::CurrentHeatingCoolingState,
        Characteristic::TargetHeatingCoolingState,
        Characteristic::CurrentTemperature,
        Characteristic::TargetTemperature,
        Characteristic::TemperatureDisplayUnits,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Characteristic::CurrentHeatingCoolingState => "CurrentHeatingCoolingState",
            Characteristic::TargetHeatingCoolingState => "TargetHeatingCoolingState",
            Characteristic::CurrentTemperature => "CurrentTemperature",
            Characteristic::TargetTemperature => "TargetTemperature",
            Characteristic::TemperatureDisplayUnits => "TemperatureDisplayUnits",
        }
    }

    pub fn writable(&self) -> bool {
        !matches!(
            self,
            Characteristic::CurrentHeatingCoolingState | Characteristic::CurrentTemperature
        )
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value exchanged with the host for a characteristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CharacteristicValue {
    UInt8(u8),
    Float(f64),
}

impl CharacteristicValue {
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            CharacteristicValue::UInt8(v) => Some(*v),
            CharacteristicValue::Float(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            CharacteristicValue::UInt8(v) => f64::from(*v),
            CharacteristicValue::Float(v) => *v,
        }
    }
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacteristicValue::UInt8(v) => write!(f, "{v}"),
            CharacteristicValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<CurrentHeatingCoolingState> for CharacteristicValue {
    fn from(s: CurrentHeatingCoolingState) -> Self {
        CharacteristicValue::UInt8(s.as_hap())
    }
}

impl From<TargetHeatingCoolingState> for CharacteristicValue {
    fn from(s: TargetHeatingCoolingState) -> Self {
        CharacteristicValue::UInt8(s.as_hap())
    }
}

impl From<TemperatureDisplayUnits> for CharacteristicValue {
    fn from(u: TemperatureDisplayUnits) -> Self {
        CharacteristicValue::UInt8(u as u8)
    }
}

impl From<f64> for CharacteristicValue {
    fn from(v: f64) -> Self {
        CharacteristicValue::Float(v)
    }
}
